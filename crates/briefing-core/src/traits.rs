use async_trait::async_trait;
use crate::NewsOutcome;

/// Source of spot prices in USD.
///
/// Implementations never fail past their boundary: a miss is `None` and the
/// cause is logged by the implementation.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, asset_id: &str) -> Option<f64>;
}

/// Source of the latest relevant headline for a keyword.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_latest_news(&self, query: &str) -> NewsOutcome;
}
