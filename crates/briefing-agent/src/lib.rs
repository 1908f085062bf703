//! Orchestration for the crypto briefing: three independent flows, each run
//! as its own scheduled process.
//!
//! - `ingest-prices` stores the current USD spot price per asset.
//! - `ingest-news` stores the latest relevant headline per asset.
//! - `send-digest` reads the latest facts, summarizes them and emails the digest.

pub mod config;
pub mod pipeline;
pub mod telemetry;

pub use config::{AgentConfig, DigestConfig, EnvReader, NewsConfig, PriceConfig, StoreBackend, StoreConfig};
pub use pipeline::{ingest_news, ingest_prices, send_digest, DigestOutcome, IngestReport};
