pub mod chat;
pub mod error;

pub use chat::{ChatClient, ChatConfig, DEFAULT_MODEL, DEFAULT_OPENAI_URL};
pub use error::{SummaryError, SummaryResult};

use async_trait::async_trait;
use briefing_core::Asset;
use std::sync::Arc;

/// Text returned in place of an analysis when generation fails.
pub const FALLBACK_SUMMARY: &str = "Summary generation failed.";

/// Backend-agnostic text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> SummaryResult<String>;

    fn name(&self) -> &str;
}

/// Prompt embedding the latest price and headline for one asset.
pub fn build_prompt(asset: Asset, price: f64, news: &str) -> String {
    format!(
        "Provide a concise 100-word analysis based on the following {} price and news:\n\
         Price: ${}\n\
         News: {}",
        asset.name(),
        price,
        news
    )
}

/// Produces a short analysis per asset; never fails.
#[derive(Clone)]
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn summarize(&self, asset: Asset, price: f64, news: &str) -> String {
        let prompt = build_prompt(asset, price, news);
        match self.generator.generate(&prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(
                    "Error generating {} summary via {}: {}",
                    asset,
                    self.generator.name(),
                    e
                );
                FALLBACK_SUMMARY.to_string()
            }
        }
    }
}
