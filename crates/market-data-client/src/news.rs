use async_trait::async_trait;
use briefing_core::{ArticleCandidate, NewsOutcome, NewsSource};
use reqwest::Client;
use serde::Deserialize;

use crate::{http_client, trim_base_url, MarketDataError, RelevanceFilter};

pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2";
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// NewsAPI `/everything` client with title-scoped search and relevance filtering.
#[derive(Clone)]
pub struct NewsApiClient {
    api_key: String,
    client: Client,
    base_url: String,
    page_size: u32,
    filter: RelevanceFilter,
}

impl NewsApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: http_client(),
            base_url: DEFAULT_NEWS_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            filter: RelevanceFilter::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(base_url);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_filter(mut self, filter: RelevanceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Most recent English articles whose title contains `query`.
    pub async fn search_titles(&self, query: &str) -> Result<Vec<ArticleCandidate>, MarketDataError> {
        let url = format!("{}/everything", self.base_url);
        let page_size = self.page_size.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("qInTitle", query),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // NewsAPI explains failures in a JSON body; fall back to the raw text.
            let message = serde_json::from_str::<EverythingResponse>(&text)
                .ok()
                .and_then(|body| body.message)
                .unwrap_or(text);
            return Err(MarketDataError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: EverythingResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::InvalidResponse(e.to_string()))?;

        if body.status.as_deref() == Some("error") {
            return Err(MarketDataError::InvalidResponse(
                body.message.unwrap_or_else(|| "provider reported an error".to_string()),
            ));
        }

        Ok(body.articles.unwrap_or_default())
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn fetch_latest_news(&self, query: &str) -> NewsOutcome {
        match self.search_titles(query).await {
            Ok(articles) => self.filter.evaluate(&articles, query),
            Err(e) => {
                tracing::error!("News request failed for {}: {}", query, e);
                NewsOutcome::Failed(format!("Error fetching news for {}: {}", query, e))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    articles: Option<Vec<ArticleCandidate>>,
    #[serde(default)]
    message: Option<String>,
}
