use async_trait::async_trait;
use briefing_core::PriceSource;
use reqwest::Client;
use serde_json::Value;

use crate::{http_client, trim_base_url, MarketDataError};

pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko `/simple/price` client.
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

impl Default for CoinGeckoClient {
    fn default() -> Self {
        Self::new(DEFAULT_COINGECKO_URL)
    }
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: trim_base_url(base_url),
        }
    }

    /// Get the current USD price for a CoinGecko asset id (e.g. "bitcoin").
    pub async fn get_price(&self, asset_id: &str) -> Result<f64, MarketDataError> {
        if asset_id.trim().is_empty() {
            return Err(MarketDataError::InvalidInput("asset id is empty".to_string()));
        }

        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", asset_id), ("vs_currencies", "usd")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketDataError::Status {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MarketDataError::InvalidResponse(e.to_string()))?;

        parse_price(&body, asset_id)
    }
}

/// Extract `body[asset_id]["usd"]`, which must be a positive finite number.
fn parse_price(body: &Value, asset_id: &str) -> Result<f64, MarketDataError> {
    let price = body
        .get(asset_id)
        .ok_or_else(|| MarketDataError::InvalidResponse(format!("{} missing from response", asset_id)))?
        .get("usd")
        .and_then(Value::as_f64)
        .ok_or_else(|| MarketDataError::InvalidResponse(format!("usd price missing for {}", asset_id)))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(MarketDataError::InvalidResponse(format!(
            "non-positive price {} for {}",
            price, asset_id
        )));
    }

    Ok(price)
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch_price(&self, asset_id: &str) -> Option<f64> {
        match self.get_price(asset_id).await {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::error!("Error fetching {} price: {}", asset_id, e);
                None
            }
        }
    }
}
