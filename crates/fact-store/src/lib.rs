//! Append-only storage of price and news facts.
//!
//! Every (asset, kind) pair lives in its own table (`btc_prices`, `eth_news`, ...)
//! with a value column and a `created_at` timestamp. Two backends implement
//! [`FactStore`]: Supabase over its REST interface and a local SQLite file.
//! [`FactLedger`] wraps a backend with the write/read policies the pipeline uses.

mod ledger;
mod sqlite;
mod supabase;

pub use ledger::FactLedger;
pub use sqlite::SqliteFactStore;
pub use supabase::SupabaseFactStore;

use async_trait::async_trait;
use briefing_core::{Fact, FactTable};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Storage backend for facts.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Append one fact to its table.
    async fn insert(&self, fact: &Fact) -> Result<(), StoreError>;

    /// Most recent fact in `table` by `created_at`, or `None` if the table is empty.
    async fn latest(&self, table: FactTable) -> Result<Option<Fact>, StoreError>;

    fn backend_name(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Store rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid row in {table}: {reason}")]
    InvalidRow { table: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Timestamps are written in a fixed-width UTC form so that text ordering
/// matches chronological ordering.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 with any offset, or a naive ISO-8601 string taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
