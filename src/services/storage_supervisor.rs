use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{phrase_store::PhraseStore, storage::StorageError},
    services::dictionary::Provenance,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const MAX_HEALTH_RETRIES: u32 = 3;

/// Connect the phrase store and keep the shared state in degraded mode while it is unavailable.
///
/// Every successful connection merges the stored phrases into the dictionary
/// as cached remote entries before the store is installed.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn PhraseStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "phrase store connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        match store.load_all().await {
            Ok(phrases) => {
                let added = state
                    .dictionary()
                    .extend(phrases, Provenance::CachedRemote);
                info!(added, total = state.dictionary().len(), "merged stored phrases");
            }
            Err(err) => {
                warn!(error = %err, "failed to load stored phrases");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        }

        state.install_phrase_store(store.clone()).await;
        info!("phrase store connected; leaving degraded mode");
        delay = INITIAL_DELAY;

        watch_health(&state, store.as_ref()).await;

        state.clear_phrase_store().await;
        warn!("phrase store unhealthy; entering degraded mode");
        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Poll the installed store at its own interval until it fails every retry.
async fn watch_health(state: &SharedState, store: &dyn PhraseStore) {
    loop {
        sleep(store.health_interval()).await;
        if store.health_check().await.is_ok() {
            continue;
        }

        let mut retry_delay = INITIAL_DELAY;
        let mut recovered = false;
        for attempt in 0..MAX_HEALTH_RETRIES {
            match store.health_check().await {
                Ok(()) => {
                    info!(attempt, "phrase store health recovered");
                    recovered = true;
                    break;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "phrase store health check failed");
                    sleep(retry_delay).await;
                    retry_delay = (retry_delay * 2).min(MAX_DELAY);
                }
            }
        }

        if !recovered {
            let degraded = state.is_degraded().await;
            warn!(degraded, "exhausted phrase store health retries");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeSet,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::GameConfig,
        dao::storage::StorageResult,
        services::dictionary::tests::StaticLookup,
        state::AppState,
    };

    struct SeededStore(BTreeSet<String>);

    /// Store whose probes fail once `failing` is set, polled every minute.
    struct FlakyStore {
        probes: Arc<AtomicUsize>,
        failing: Arc<AtomicBool>,
    }

    impl PhraseStore for FlakyStore {
        fn load_all(&self) -> BoxFuture<'static, StorageResult<BTreeSet<String>>> {
            Box::pin(async { Ok(BTreeSet::new()) })
        }

        fn append_one(&self, _phrase: String) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            let failing = self.failing.load(Ordering::SeqCst);
            Box::pin(async move {
                if failing {
                    Err(StorageError::unavailable(
                        "down".into(),
                        std::io::Error::other("down"),
                    ))
                } else {
                    Ok(())
                }
            })
        }

        fn health_interval(&self) -> Duration {
            Duration::from_secs(60)
        }
    }

    impl PhraseStore for SeededStore {
        fn load_all(&self) -> BoxFuture<'static, StorageResult<BTreeSet<String>>> {
            let phrases = self.0.clone();
            Box::pin(async move { Ok(phrases) })
        }

        fn append_one(&self, _phrase: String) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn installs_store_after_failed_attempts_and_merges_phrases() {
        let (state, _queue) = AppState::new(
            GameConfig::default(),
            Arc::new(StaticLookup::accepting(&[])),
            vec!["con mèo".to_string()],
        );
        assert!(state.is_degraded().await);

        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let supervisor = tokio::spawn(run(state.clone(), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StorageError::unavailable(
                        "offline".into(),
                        std::io::Error::other("offline"),
                    ))
                } else {
                    let stored: BTreeSet<String> =
                        ["mèo mướp".to_string(), "con mèo".to_string()].into();
                    Ok(Arc::new(SeededStore(stored)) as Arc<dyn PhraseStore>)
                }
            }
        }));

        let mut degraded = state.degraded_watcher();
        degraded.wait_for(|value| !*value).await.unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(state.dictionary().has("mèo mướp"));
        assert_eq!(
            state.dictionary().provenance("mèo mướp"),
            Some(Provenance::CachedRemote)
        );
        assert_eq!(state.dictionary().provenance("con mèo"), Some(Provenance::Local));
        supervisor.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn polls_at_store_interval_and_degrades_after_retries() {
        let (state, _queue) = AppState::new(
            GameConfig::default(),
            Arc::new(StaticLookup::accepting(&[])),
            Vec::new(),
        );
        let probes = Arc::new(AtomicUsize::new(0));
        let failing = Arc::new(AtomicBool::new(false));
        let store = Arc::new(FlakyStore {
            probes: probes.clone(),
            failing: failing.clone(),
        });
        let supervisor = tokio::spawn(run(state.clone(), move || {
            let store = store.clone();
            async move { Ok::<_, StorageError>(store as Arc<dyn PhraseStore>) }
        }));

        let mut degraded = state.degraded_watcher();
        degraded.wait_for(|value| !*value).await.unwrap();

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(probes.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(probes.load(Ordering::SeqCst), 1);

        failing.store(true, Ordering::SeqCst);
        degraded.wait_for(|value| *value).await.unwrap();
        assert_eq!(probes.load(Ordering::SeqCst), 2 + MAX_HEALTH_RETRIES as usize);
        supervisor.abort();
    }
}
