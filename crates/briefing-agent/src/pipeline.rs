use briefing_core::{Asset, Fact, FactKind, NewsOutcome, NewsSource, PriceSource, RetryError};
use chrono::{DateTime, Utc};
use fact_store::{FactLedger, StoreError};
use std::fmt;
use notification_service::{AssetSummary, Digest, NotificationService};
use summarizer::Summarizer;
use tracing::{error, info, warn};

/// What an ingestion run did, per asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub stored: Vec<Asset>,
    pub skipped: Vec<Asset>,
}

impl IngestReport {
    fn record(&mut self, asset: Asset, stored: bool) {
        if stored {
            self.stored.push(asset);
        } else {
            self.skipped.push(asset);
        }
    }

    fn log(&self, what: &str) {
        info!(
            "{} ingestion finished: {} stored, {} skipped",
            what,
            self.stored.len(),
            self.skipped.len()
        );
    }
}

/// Fetch and store the current USD price of each asset. A miss for one asset
/// never stops the others.
pub async fn ingest_prices(
    source: &dyn PriceSource,
    ledger: &FactLedger,
    assets: &[Asset],
) -> IngestReport {
    let mut report = IngestReport::default();

    for &asset in assets {
        let stored = match source.fetch_price(asset.provider_id()).await {
            Some(usd) => match Fact::price(asset, usd) {
                Ok(fact) => ledger.append(&fact).await,
                Err(e) => {
                    error!("Rejected {} price: {}", asset, e);
                    false
                }
            },
            None => {
                warn!("No price available for {}; nothing stored", asset);
                false
            }
        };
        report.record(asset, stored);
    }

    report.log("Price");
    report
}

/// Fetch the latest relevant headline per asset. Only headlines that passed
/// the relevance filter are stored.
pub async fn ingest_news(
    source: &dyn NewsSource,
    ledger: &FactLedger,
    assets: &[Asset],
) -> IngestReport {
    let mut report = IngestReport::default();

    for &asset in assets {
        let stored = match source.fetch_latest_news(asset.news_query()).await {
            NewsOutcome::Relevant(headline) => ledger.append(&Fact::news(asset, &headline)).await,
            outcome => {
                warn!("No {} news stored: {}", asset, outcome);
                false
            }
        };
        report.record(asset, stored);
    }

    report.log("News");
    report
}

#[derive(Debug, Clone, PartialEq)]
pub enum DigestOutcome {
    /// Every channel accepted the digest.
    Sent(Digest),
    /// The digest was composed but delivery failed.
    DeliveryFailed(Digest),
    /// A latest fact was missing; nothing was summarized or sent.
    Incomplete { asset: Asset, missing: FactKind },
}

impl fmt::Display for DigestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestOutcome::Sent(digest) => write!(f, "digest \"{}\" sent", digest.subject),
            DigestOutcome::DeliveryFailed(digest) => {
                write!(f, "digest \"{}\" was not delivered", digest.subject)
            }
            DigestOutcome::Incomplete { asset, missing } => write!(
                f,
                "digest not sent: latest {} for {} is missing",
                missing.label(),
                asset
            ),
        }
    }
}

struct LatestFacts {
    asset: Asset,
    price: f64,
    news: String,
}

/// Read the latest price and news of every asset, summarize each, and send
/// one digest.
///
/// A store read that keeps failing is returned as an error. An empty table is
/// not an error: the run stops with [`DigestOutcome::Incomplete`].
pub async fn send_digest(
    ledger: &FactLedger,
    summarizer: &Summarizer,
    notifier: &NotificationService,
    assets: &[Asset],
    now: DateTime<Utc>,
) -> Result<DigestOutcome, RetryError<StoreError>> {
    let mut inputs = Vec::with_capacity(assets.len());
    let mut missing = None;

    for &asset in assets {
        let price = ledger
            .latest(asset, FactKind::Price)
            .await?
            .and_then(|fact| fact.value.as_price());
        let news = ledger
            .latest(asset, FactKind::News)
            .await?
            .and_then(|fact| fact.value.as_news().map(str::to_string));

        match (price, news) {
            (Some(price), Some(news)) => inputs.push(LatestFacts { asset, price, news }),
            (None, _) => {
                missing.get_or_insert((asset, FactKind::Price));
            }
            (_, None) => {
                missing.get_or_insert((asset, FactKind::News));
            }
        }
    }

    if let Some((asset, kind)) = missing {
        let outcome = DigestOutcome::Incomplete {
            asset,
            missing: kind,
        };
        error!("{}", outcome);
        return Ok(outcome);
    }

    let mut summaries = Vec::with_capacity(inputs.len());
    for facts in &inputs {
        let summary = summarizer
            .summarize(facts.asset, facts.price, &facts.news)
            .await;
        summaries.push(AssetSummary::new(facts.asset, summary));
    }

    let digest = Digest::new(&summaries, now);
    if notifier.deliver(&digest).await {
        let outcome = DigestOutcome::Sent(digest);
        info!("{}", outcome);
        Ok(outcome)
    } else {
        let outcome = DigestOutcome::DeliveryFailed(digest);
        error!("{}", outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use briefing_core::Headline;
    use chrono::TimeZone;
    use fact_store::SqliteFactStore;
    use notification_service::{NotificationChannel, NotificationError};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use summarizer::{SummaryError, SummaryResult, TextGenerator, FALLBACK_SUMMARY};

    async fn memory_ledger() -> FactLedger {
        let store = SqliteFactStore::new("sqlite::memory:").await.unwrap();
        FactLedger::new(Arc::new(store))
    }

    fn headline(title: &str) -> Headline {
        Headline {
            title: title.to_string(),
            description: "details".to_string(),
        }
    }

    struct FixedPrices(HashMap<&'static str, f64>);

    #[async_trait]
    impl PriceSource for FixedPrices {
        async fn fetch_price(&self, asset_id: &str) -> Option<f64> {
            self.0.get(asset_id).copied()
        }
    }

    struct FixedNews(HashMap<&'static str, NewsOutcome>);

    #[async_trait]
    impl NewsSource for FixedNews {
        async fn fetch_latest_news(&self, query: &str) -> NewsOutcome {
            self.0.get(query).cloned().unwrap_or(NewsOutcome::NoArticles)
        }
    }

    /// Fails for prompts that mention `fail_on`.
    struct Generator {
        fail_on: Option<&'static str>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl TextGenerator for Generator {
        async fn generate(&self, prompt: &str) -> SummaryResult<String> {
            *self.calls.lock().unwrap() += 1;
            match self.fail_on {
                Some(name) if prompt.contains(name) => {
                    Err(SummaryError::ServiceUnavailable("Status: 503".into()))
                }
                _ => Ok(format!("summary #{}", self.calls.lock().unwrap())),
            }
        }

        fn name(&self) -> &str {
            "test"
        }
    }

    struct Outbox {
        accept: bool,
        sent: Arc<Mutex<Vec<Digest>>>,
    }

    #[async_trait]
    impl NotificationChannel for Outbox {
        async fn send(&self, digest: &Digest) -> Result<(), NotificationError> {
            self.sent.lock().unwrap().push(digest.clone());
            if self.accept {
                Ok(())
            } else {
                Err(NotificationError::Smtp("connection refused".into()))
            }
        }

        fn name(&self) -> &str {
            "outbox"
        }
    }

    fn outbox(accept: bool) -> (NotificationService, Arc<Mutex<Vec<Digest>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = NotificationService::with_channels(vec![Box::new(Outbox {
            accept,
            sent: sent.clone(),
        })]);
        (service, sent)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_prices_skips_misses() {
        let ledger = memory_ledger().await;
        let source = FixedPrices(HashMap::from([("bitcoin", 61234.5)]));

        let report = ingest_prices(&source, &ledger, &Asset::ALL).await;

        assert_eq!(report.stored, vec![Asset::Btc]);
        assert_eq!(report.skipped, vec![Asset::Eth]);
        let btc = ledger.latest(Asset::Btc, FactKind::Price).await.unwrap().unwrap();
        assert_eq!(btc.value.as_price(), Some(61234.5));
        assert!(ledger.latest(Asset::Eth, FactKind::Price).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ingest_prices_rejects_non_positive() {
        let ledger = memory_ledger().await;
        let source = FixedPrices(HashMap::from([("bitcoin", 0.0), ("ethereum", f64::NAN)]));

        let report = ingest_prices(&source, &ledger, &Asset::ALL).await;
        assert!(report.stored.is_empty());
        assert_eq!(report.skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_news_stores_only_relevant() {
        let ledger = memory_ledger().await;
        let source = FixedNews(HashMap::from([
            ("Bitcoin", NewsOutcome::Relevant(headline("Bitcoin rallies"))),
            ("Ethereum", NewsOutcome::NoRelevantArticle),
        ]));

        let report = ingest_news(&source, &ledger, &Asset::ALL).await;

        assert_eq!(report.stored, vec![Asset::Btc]);
        let btc = ledger.latest(Asset::Btc, FactKind::News).await.unwrap().unwrap();
        assert_eq!(btc.value.as_news(), Some("Bitcoin rallies: details"));
        assert!(ledger.latest(Asset::Eth, FactKind::News).await.unwrap().is_none());
    }

    async fn seed(ledger: &FactLedger, skip_eth_news: bool) {
        assert!(ledger.append(&Fact::price(Asset::Btc, 61234.5).unwrap()).await);
        assert!(ledger.append(&Fact::news(Asset::Btc, &headline("Bitcoin rallies"))).await);
        assert!(ledger.append(&Fact::price(Asset::Eth, 2456.78).unwrap()).await);
        if !skip_eth_news {
            assert!(ledger.append(&Fact::news(Asset::Eth, &headline("Ethereum upgrade"))).await);
        }
    }

    #[tokio::test]
    async fn test_digest_aborts_when_news_missing() {
        let ledger = memory_ledger().await;
        seed(&ledger, true).await;
        let generator = Arc::new(Generator {
            fail_on: None,
            calls: Mutex::new(0),
        });
        let (notifier, sent) = outbox(true);

        let outcome = send_digest(
            &ledger,
            &Summarizer::new(generator.clone()),
            &notifier,
            &Asset::ALL,
            now(),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            DigestOutcome::Incomplete {
                asset: Asset::Eth,
                missing: FactKind::News
            }
        );
        assert_eq!(
            outcome.to_string(),
            "digest not sent: latest news for ETH is missing"
        );
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(*generator.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_digest_uses_fallback_for_failed_summary() {
        let ledger = memory_ledger().await;
        seed(&ledger, false).await;
        let generator = Arc::new(Generator {
            fail_on: Some("Ethereum price and news"),
            calls: Mutex::new(0),
        });
        let (notifier, sent) = outbox(true);

        let outcome = send_digest(
            &ledger,
            &Summarizer::new(generator.clone()),
            &notifier,
            &Asset::ALL,
            now(),
        )
        .await
        .unwrap();

        let DigestOutcome::Sent(digest) = outcome else {
            panic!("expected a sent digest, got {:?}", outcome);
        };
        assert_eq!(digest.subject, "Crypto Update - 2026-10-16");
        assert_eq!(
            digest.body,
            format!(
                "**Bitcoin (BTC) Summary:**\nsummary #1\n\n**Ethereum (ETH) Summary:**\n{}",
                FALLBACK_SUMMARY
            )
        );
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported() {
        let ledger = memory_ledger().await;
        seed(&ledger, false).await;
        let generator = Arc::new(Generator {
            fail_on: None,
            calls: Mutex::new(0),
        });
        let (notifier, sent) = outbox(false);

        let outcome = send_digest(
            &ledger,
            &Summarizer::new(generator),
            &notifier,
            &[Asset::Btc],
            now(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, DigestOutcome::DeliveryFailed(_)));
        assert_eq!(sent.lock().unwrap().len(), 1);
    }
}
