use anyhow::{bail, Context, Result};
use briefing_core::{Asset, RetryPolicy};
use fact_store::{FactLedger, FactStore, SqliteFactStore, SupabaseFactStore};
use market_data_client::{
    CoinGeckoClient, NewsApiClient, RelevanceFilter, DEFAULT_COINGECKO_URL, DEFAULT_NEWS_API_URL,
    DEFAULT_PAGE_SIZE,
};
use notification_service::{NotificationConfig, NotificationService, SmtpTls};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use summarizer::{ChatClient, ChatConfig, Summarizer, DEFAULT_MODEL, DEFAULT_OPENAI_URL};

/// Reads configuration values and remembers every required one that is missing,
/// so a misconfigured run reports all of them at once.
pub struct EnvReader<'a> {
    lookup: Box<dyn Fn(&str) -> Option<String> + 'a>,
    missing: Vec<&'static str>,
}

impl EnvReader<'static> {
    /// Process environment (call `dotenvy::dotenv()` first to pick up `.env`).
    pub fn system() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl<'a> EnvReader<'a> {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        Self {
            lookup: Box::new(lookup),
            missing: Vec::new(),
        }
    }

    /// Blank values count as unset.
    pub fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    pub fn parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
            None => Ok(default),
        }
    }

    /// Returns an empty string when missing; `finish` turns the gaps into an error.
    pub fn required(&mut self, key: &'static str) -> String {
        match self.optional(key) {
            Some(value) => value,
            None => {
                if !self.missing.contains(&key) {
                    self.missing.push(key);
                }
                String::new()
            }
        }
    }

    pub fn finish(&self) -> Result<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            bail!(
                "Missing required environment variables: {}",
                self.missing.join(", ")
            )
        }
    }
}

/// Where facts are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Sqlite { url: String },
    Supabase { url: String, key: String },
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub read_attempts: u32,
    pub read_delay: Duration,
}

impl StoreConfig {
    /// `DATABASE_URL=sqlite:...` selects the local backend; otherwise Supabase
    /// credentials are required.
    fn read(env: &mut EnvReader<'_>) -> Result<Self> {
        let backend = match env.optional("DATABASE_URL") {
            Some(url) if url.starts_with("sqlite:") => StoreBackend::Sqlite { url },
            _ => StoreBackend::Supabase {
                url: env.required("SUPABASE_URL"),
                key: env.required("SUPABASE_KEY"),
            },
        };

        Ok(Self {
            backend,
            read_attempts: env.parsed("STORE_READ_ATTEMPTS", 3)?,
            read_delay: Duration::from_secs(env.parsed("STORE_READ_DELAY_SECS", 5)?),
        })
    }

    pub fn read_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.read_attempts, self.read_delay)
    }

    pub async fn connect(&self) -> Result<FactLedger> {
        let store: Arc<dyn FactStore> = match &self.backend {
            StoreBackend::Sqlite { url } => Arc::new(
                SqliteFactStore::new(url)
                    .await
                    .with_context(|| format!("Failed to open SQLite store at {}", url))?,
            ),
            StoreBackend::Supabase { url, key } => Arc::new(
                SupabaseFactStore::new(url, key.clone()).context("Invalid Supabase settings")?,
            ),
        };
        tracing::info!("Fact store: {}", store.backend_name());

        Ok(FactLedger::new(store).with_read_policy(self.read_policy()))
    }
}

/// Settings specific to one entry flow.
pub trait FlowConfig: Sized {
    fn read(env: &mut EnvReader<'_>) -> Result<Self>;
}

#[derive(Debug, Clone)]
pub struct PriceConfig {
    pub coingecko_base_url: String,
}

impl FlowConfig for PriceConfig {
    fn read(env: &mut EnvReader<'_>) -> Result<Self> {
        Ok(Self {
            coingecko_base_url: env.or("COINGECKO_BASE_URL", DEFAULT_COINGECKO_URL),
        })
    }
}

impl PriceConfig {
    pub fn client(&self) -> CoinGeckoClient {
        CoinGeckoClient::new(self.coingecko_base_url.clone())
    }
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_key: String,
    pub base_url: String,
    pub page_size: u32,
    pub min_mentions: usize,
}

impl FlowConfig for NewsConfig {
    fn read(env: &mut EnvReader<'_>) -> Result<Self> {
        Ok(Self {
            api_key: env.required("NEWS_API_KEY"),
            base_url: env.or("NEWS_API_BASE_URL", DEFAULT_NEWS_API_URL),
            page_size: env.parsed("NEWS_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            min_mentions: env.parsed("NEWS_MIN_MENTIONS", RelevanceFilter::default().min_mentions)?,
        })
    }
}

impl NewsConfig {
    pub fn client(&self) -> NewsApiClient {
        NewsApiClient::new(self.api_key.clone())
            .with_base_url(self.base_url.clone())
            .with_page_size(self.page_size)
            .with_filter(RelevanceFilter::new(self.min_mentions))
    }
}

#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub chat: ChatConfig,
    pub notification: NotificationConfig,
}

impl FlowConfig for DigestConfig {
    fn read(env: &mut EnvReader<'_>) -> Result<Self> {
        let mut chat = ChatConfig::new(env.required("OPENAI_API_KEY"));
        chat.base_url = env.or("OPENAI_BASE_URL", DEFAULT_OPENAI_URL);
        chat.model = env.or("OPENAI_MODEL", DEFAULT_MODEL);

        env.required("SMTP_USERNAME");
        env.required("SMTP_PASSWORD");
        env.required("NOTIFICATION_EMAIL_TO");
        env.parsed::<u16>("SMTP_PORT", 587)?;
        env.parsed("SMTP_TLS", SmtpTls::default())?;
        let notification = NotificationConfig::from_lookup(|key| env.optional(key));

        Ok(Self { chat, notification })
    }
}

impl DigestConfig {
    pub fn summarizer(&self) -> Summarizer {
        Summarizer::new(Arc::new(ChatClient::new(self.chat.clone())))
    }

    pub fn notifier(&self) -> NotificationService {
        NotificationService::new(&self.notification)
    }
}

/// Everything one orchestrator run needs.
#[derive(Debug, Clone)]
pub struct AgentConfig<F> {
    pub assets: Vec<Asset>,
    pub store: StoreConfig,
    pub flow: F,
}

impl<F: FlowConfig> AgentConfig<F> {
    pub fn from_env() -> Result<Self> {
        Self::load(EnvReader::system())
    }

    pub fn load(mut env: EnvReader<'_>) -> Result<Self> {
        let assets = parse_assets(&env.or("BRIEFING_ASSETS", "BTC,ETH"))?;
        let store = StoreConfig::read(&mut env)?;
        let flow = F::read(&mut env)?;
        env.finish()?;

        Ok(Self {
            assets,
            store,
            flow,
        })
    }
}

/// Comma-separated symbols or names; duplicates collapse, order is kept.
pub fn parse_assets(raw: &str) -> Result<Vec<Asset>> {
    let mut assets = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let asset: Asset = part.parse().context("BRIEFING_ASSETS")?;
        if !assets.contains(&asset) {
            assets.push(asset);
        }
    }

    if assets.is_empty() {
        bail!("BRIEFING_ASSETS selects no assets");
    }
    Ok(assets)
}
