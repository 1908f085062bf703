use async_trait::async_trait;
use briefing_core::{Fact, FactKind, FactTable, FactValue};
use reqwest::{Client, RequestBuilder};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::{format_timestamp, parse_timestamp, FactStore, StoreError};

/// Supabase (PostgREST) backend.
#[derive(Clone)]
pub struct SupabaseFactStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseFactStore {
    pub fn new(url: &str, api_key: String) -> Result<Self, StoreError> {
        let base_url = url.trim_end_matches('/').to_string();
        if base_url.is_empty() || api_key.is_empty() {
            return Err(StoreError::Config("Supabase url and key are required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn table_url(&self, table: &FactTable) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(StoreError::Rejected {
            status: response.status().as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl FactStore for SupabaseFactStore {
    async fn insert(&self, fact: &Fact) -> Result<(), StoreError> {
        let table = fact.table();

        let mut row = Map::new();
        let value = match &fact.value {
            FactValue::Price(price) => Value::from(*price),
            FactValue::News(text) => Value::from(text.as_str()),
        };
        row.insert(table.value_column().to_string(), value);
        row.insert(
            "created_at".to_string(),
            Value::from(format_timestamp(fact.recorded_at)),
        );

        let response = self
            .authorized(self.client.post(self.table_url(&table)))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        Self::check(response).await?;

        Ok(())
    }

    async fn latest(&self, table: FactTable) -> Result<Option<Fact>, StoreError> {
        let select = format!("{},created_at", table.value_column());

        let response = self
            .authorized(self.client.get(self.table_url(&table)))
            .query(&[
                ("select", select.as_str()),
                ("order", "created_at.desc"),
                ("limit", "1"),
            ])
            .send()
            .await?;
        let rows: Vec<Map<String, Value>> = Self::check(response).await?.json().await?;

        rows.into_iter()
            .next()
            .map(|row| row_to_fact(&table, &row))
            .transpose()
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}

fn row_to_fact(table: &FactTable, row: &Map<String, Value>) -> Result<Fact, StoreError> {
    let invalid = |reason: String| StoreError::InvalidRow {
        table: table.name(),
        reason,
    };

    let raw = row
        .get(table.value_column())
        .ok_or_else(|| invalid(format!("missing {}", table.value_column())))?;

    let value = match table.kind {
        // numeric columns may come back as strings
        FactKind::Price => raw
            .as_f64()
            .or_else(|| raw.as_str().and_then(|s| s.parse().ok()))
            .map(FactValue::Price)
            .ok_or_else(|| invalid(format!("non-numeric price {}", raw)))?,
        FactKind::News => raw
            .as_str()
            .map(|s| FactValue::News(s.to_string()))
            .ok_or_else(|| invalid(format!("non-text news {}", raw)))?,
    };

    let recorded_at = row
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .ok_or_else(|| invalid("missing or bad created_at".to_string()))?;

    Ok(Fact::restore(table.asset, value, recorded_at))
}
