use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::BriefingError;

/// Tracked crypto asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Btc,
    Eth,
}

impl Asset {
    /// Every supported asset, in digest order.
    pub const ALL: [Asset; 2] = [Asset::Btc, Asset::Eth];

    /// Ticker symbol, e.g. "BTC"
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
        }
    }

    /// Human-readable name, e.g. "Bitcoin"
    pub fn name(&self) -> &'static str {
        match self {
            Asset::Btc => "Bitcoin",
            Asset::Eth => "Ethereum",
        }
    }

    /// CoinGecko asset id
    pub fn provider_id(&self) -> &'static str {
        match self {
            Asset::Btc => "bitcoin",
            Asset::Eth => "ethereum",
        }
    }

    /// Keyword used for title-scoped news search
    pub fn news_query(&self) -> &'static str {
        self.name()
    }

    pub fn table_prefix(&self) -> &'static str {
        match self {
            Asset::Btc => "btc",
            Asset::Eth => "eth",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Asset {
    type Err = BriefingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BTC" | "BITCOIN" => Ok(Asset::Btc),
            "ETH" | "ETHEREUM" => Ok(Asset::Eth),
            _ => Err(BriefingError::UnknownAsset(s.to_string())),
        }
    }
}

/// Kind of persisted fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FactKind {
    Price,
    News,
}

impl FactKind {
    pub const ALL: [FactKind; 2] = [FactKind::Price, FactKind::News];

    /// Column holding the fact value. Doubles as the table suffix.
    pub fn value_column(&self) -> &'static str {
        match self {
            FactKind::Price => "prices",
            FactKind::News => "news",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FactKind::Price => "price",
            FactKind::News => "news",
        }
    }
}

/// Logical table for one (asset, kind) pair, e.g. `btc_prices`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactTable {
    pub asset: Asset,
    pub kind: FactKind,
}

impl FactTable {
    pub fn new(asset: Asset, kind: FactKind) -> Self {
        Self { asset, kind }
    }

    pub fn name(&self) -> String {
        format!("{}_{}", self.asset.table_prefix(), self.kind.value_column())
    }

    pub fn value_column(&self) -> &'static str {
        self.kind.value_column()
    }

    /// All tables, asset-major.
    pub fn all() -> Vec<FactTable> {
        Asset::ALL
            .iter()
            .flat_map(|asset| FactKind::ALL.iter().map(move |kind| FactTable::new(*asset, *kind)))
            .collect()
    }
}

impl fmt::Display for FactTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.asset.table_prefix(), self.kind.value_column())
    }
}

/// Value carried by a fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FactValue {
    /// Spot price in USD, always positive
    Price(f64),
    /// "{title}: {description}" of a headline that passed the relevance filter
    News(String),
}

impl FactValue {
    pub fn kind(&self) -> FactKind {
        match self {
            FactValue::Price(_) => FactKind::Price,
            FactValue::News(_) => FactKind::News,
        }
    }

    pub fn as_price(&self) -> Option<f64> {
        match self {
            FactValue::Price(p) => Some(*p),
            FactValue::News(_) => None,
        }
    }

    pub fn as_news(&self) -> Option<&str> {
        match self {
            FactValue::News(text) => Some(text),
            FactValue::Price(_) => None,
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Price(p) => write!(f, "{}", p),
            FactValue::News(text) => f.write_str(text),
        }
    }
}

/// Immutable, timestamped price or news record for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub asset: Asset,
    pub value: FactValue,
    pub recorded_at: DateTime<Utc>,
}

impl Fact {
    /// Price fact stamped now. Rejects non-positive and non-finite values.
    pub fn price(asset: Asset, usd: f64) -> Result<Self, BriefingError> {
        if !usd.is_finite() || usd <= 0.0 {
            return Err(BriefingError::InvalidPrice(usd));
        }
        Ok(Self {
            asset,
            value: FactValue::Price(usd),
            recorded_at: Utc::now(),
        })
    }

    /// News fact stamped now from a headline accepted by the relevance filter.
    pub fn news(asset: Asset, headline: &Headline) -> Self {
        Self {
            asset,
            value: FactValue::News(headline.to_string()),
            recorded_at: Utc::now(),
        }
    }

    /// Rebuild a fact read back from a store.
    pub fn restore(asset: Asset, value: FactValue, recorded_at: DateTime<Utc>) -> Self {
        Self {
            asset,
            value,
            recorded_at,
        }
    }

    pub fn kind(&self) -> FactKind {
        self.value.kind()
    }

    pub fn table(&self) -> FactTable {
        FactTable::new(self.asset, self.kind())
    }
}

/// News search result as returned by the provider. Any field may be null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleCandidate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ArticleCandidate {
    pub fn new(title: &str, description: &str, content: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            content: Some(content.to_string()),
        }
    }

    pub fn headline(&self) -> Headline {
        Headline {
            title: self.title.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
        }
    }
}

/// Title and description of an accepted article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub description: String,
}

impl fmt::Display for Headline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Result of a latest-news lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum NewsOutcome {
    /// First candidate that passed the relevance filter
    Relevant(Headline),
    /// Candidates were returned but none passed the filter
    NoRelevantArticle,
    /// The provider returned zero candidates
    NoArticles,
    /// The request failed; carries a human-readable message
    Failed(String),
}

impl NewsOutcome {
    pub fn headline(&self) -> Option<&Headline> {
        match self {
            NewsOutcome::Relevant(h) => Some(h),
            _ => None,
        }
    }
}

impl fmt::Display for NewsOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewsOutcome::Relevant(h) => write!(f, "{}", h),
            NewsOutcome::NoRelevantArticle => f.write_str("No sufficiently relevant articles found."),
            NewsOutcome::NoArticles => f.write_str("No articles found."),
            NewsOutcome::Failed(msg) => f.write_str(msg),
        }
    }
}
