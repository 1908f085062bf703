mod news;
mod quotes;
mod relevance;

pub use news::{NewsApiClient, DEFAULT_NEWS_API_URL, DEFAULT_PAGE_SIZE};
pub use quotes::{CoinGeckoClient, DEFAULT_COINGECKO_URL};
pub use relevance::RelevanceFilter;

use reqwest::Client;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("crypto-briefing/", env!("CARGO_PKG_VERSION"));

/// Errors from the market data providers.
#[derive(Debug, thiserror::Error)]
pub enum MarketDataError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn http_client() -> Client {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}
