use async_trait::async_trait;
use briefing_core::{Fact, FactKind, FactTable, FactValue};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::{format_timestamp, parse_timestamp, FactStore, StoreError};

/// Local SQLite backend. One table per (asset, kind), created on connect.
#[derive(Clone)]
pub struct SqliteFactStore {
    pool: SqlitePool,
}

impl SqliteFactStore {
    /// Connect to (or create) the database and make sure every fact table exists.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database lives and dies with its single connection.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        for table in FactTable::all() {
            let value_type = match table.kind {
                FactKind::Price => "REAL",
                FactKind::News => "TEXT",
            };
            let name = table.name();

            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {name} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    {column} {value_type} NOT NULL,
                    created_at TEXT NOT NULL
                )",
                column = table.value_column(),
            ))
            .execute(&self.pool)
            .await?;

            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{name}_created ON {name}(created_at)"
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl FactStore for SqliteFactStore {
    async fn insert(&self, fact: &Fact) -> Result<(), StoreError> {
        let table = fact.table();
        let sql = format!(
            "INSERT INTO {} ({}, created_at) VALUES (?, ?)",
            table.name(),
            table.value_column()
        );

        let query = sqlx::query(&sql);
        let query = match &fact.value {
            FactValue::Price(price) => query.bind(*price),
            FactValue::News(text) => query.bind(text.as_str()),
        };

        query
            .bind(format_timestamp(fact.recorded_at))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn latest(&self, table: FactTable) -> Result<Option<Fact>, StoreError> {
        // Equal timestamps fall back to insertion order.
        let sql = format!(
            "SELECT {}, created_at FROM {} ORDER BY created_at DESC, id DESC LIMIT 1",
            table.value_column(),
            table.name()
        );

        let row = match table.kind {
            FactKind::Price => sqlx::query_as::<_, (f64, String)>(&sql)
                .fetch_optional(&self.pool)
                .await?
                .map(|(price, ts)| (FactValue::Price(price), ts)),
            FactKind::News => sqlx::query_as::<_, (String, String)>(&sql)
                .fetch_optional(&self.pool)
                .await?
                .map(|(text, ts)| (FactValue::News(text), ts)),
        };

        row.map(|(value, ts)| -> Result<Fact, StoreError> {
            let recorded_at = parse_timestamp(&ts).ok_or_else(|| StoreError::InvalidRow {
                table: table.name(),
                reason: format!("bad created_at {:?}", ts),
            })?;
            Ok(Fact::restore(table.asset, value, recorded_at))
        })
        .transpose()
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
