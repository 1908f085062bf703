use std::sync::Arc;

use briefing_core::{Asset, Fact, FactKind, FactTable, RetryError, RetryPolicy, Sleeper, TokioSleeper};

use crate::{FactStore, StoreError};

/// Write/read policies on top of a [`FactStore`].
///
/// Writes are fire-and-forget: one attempt, outcome logged, never retried.
/// Latest reads are retried under `read_policy` because the digest run that
/// depends on them has no later chance to recover.
#[derive(Clone)]
pub struct FactLedger {
    store: Arc<dyn FactStore>,
    read_policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl FactLedger {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self {
            store,
            read_policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_read_policy(mut self, policy: RetryPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Append a fact. Returns whether the store accepted it.
    pub async fn append(&self, fact: &Fact) -> bool {
        let table = fact.table();
        match self.store.insert(fact).await {
            Ok(()) => {
                tracing::info!("Inserted {} into {}: {}", fact.kind().label(), table, fact.value);
                true
            }
            Err(e) => {
                tracing::error!("Failed to insert into {}: {}", table, e);
                false
            }
        }
    }

    /// Most recent fact for (asset, kind).
    ///
    /// `Ok(None)` means the table is empty and is returned without retrying.
    /// Store errors are retried; the last one is returned once attempts run out.
    pub async fn latest(
        &self,
        asset: Asset,
        kind: FactKind,
    ) -> Result<Option<Fact>, RetryError<StoreError>> {
        let table = FactTable::new(asset, kind);

        let result = self
            .read_policy
            .run(self.sleeper.as_ref(), |attempt| {
                tracing::debug!("Reading latest from {} (attempt {})", table, attempt);
                self.store.latest(table)
            })
            .await;

        match &result {
            Ok(Some(fact)) => tracing::debug!("Latest in {}: {} at {}", table, fact.value, fact.recorded_at),
            Ok(None) => tracing::warn!("No data found in table {}", table),
            Err(e) => tracing::error!("Reading latest from {} failed: {}", table, e),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use briefing_core::FactValue;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails the first `failures` calls of either operation, then behaves.
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
        rows: Mutex<Vec<Fact>>,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                rows: Mutex::new(Vec::new()),
            }
        }

        fn trip(&self) -> Result<(), StoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(StoreError::Config(format!("transient failure #{}", n + 1)))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl FactStore for FlakyStore {
        async fn insert(&self, fact: &Fact) -> Result<(), StoreError> {
            self.trip()?;
            self.rows.lock().unwrap().push(fact.clone());
            Ok(())
        }

        async fn latest(&self, table: FactTable) -> Result<Option<Fact>, StoreError> {
            self.trip()?;
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.table() == table)
                .max_by_key(|f| f.recorded_at)
                .cloned())
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn ledger(store: Arc<FlakyStore>, sleeper: Arc<RecordingSleeper>) -> FactLedger {
        FactLedger::new(store).with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_latest_recovers_on_third_attempt() {
        let store = Arc::new(FlakyStore::new(2));
        store
            .rows
            .lock()
            .unwrap()
            .push(Fact::price(Asset::Btc, 61234.5).unwrap());
        let sleeper = Arc::new(RecordingSleeper::default());

        let fact = ledger(store.clone(), sleeper.clone())
            .latest(Asset::Btc, FactKind::Price)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fact.value, FactValue::Price(61234.5));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
    }

    #[tokio::test]
    async fn test_latest_gives_up_after_three_attempts() {
        let store = Arc::new(FlakyStore::new(u32::MAX));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = ledger(store.clone(), sleeper.clone())
            .latest(Asset::Eth, FactKind::News)
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert!(err.last.to_string().contains("transient failure #3"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.slept.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_table_is_not_retried() {
        let store = Arc::new(FlakyStore::new(0));
        let sleeper = Arc::new(RecordingSleeper::default());

        let latest = ledger(store.clone(), sleeper.clone())
            .latest(Asset::Eth, FactKind::Price)
            .await
            .unwrap();

        assert!(latest.is_none());
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_is_single_shot() {
        let store = Arc::new(FlakyStore::new(1));
        let sleeper = Arc::new(RecordingSleeper::default());
        let ledger = ledger(store.clone(), sleeper.clone());
        let fact = Fact::price(Asset::Eth, 2500.0).unwrap();

        assert!(!ledger.append(&fact).await);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert!(store.rows.lock().unwrap().is_empty());

        assert!(ledger.append(&fact).await);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_read_policy() {
        let store = Arc::new(FlakyStore::new(u32::MAX));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = ledger(store.clone(), sleeper.clone())
            .with_read_policy(RetryPolicy::no_retry())
            .latest(Asset::Btc, FactKind::News)
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }
}
