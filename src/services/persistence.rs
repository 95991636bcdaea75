//! Drains newly confirmed phrases into the installed phrase store.

use tracing::{debug, info, warn};

use crate::state::{PersistQueue, SharedState};

/// Append every queued phrase to the current store, best-effort.
///
/// Phrases arriving while no store is installed stay in memory only; the
/// store's append is idempotent so a phrase queued twice is harmless.
pub async fn run(state: SharedState, mut queue: PersistQueue) {
    while let Some(phrase) = queue.recv().await {
        let Some(store) = state.phrase_store().await else {
            debug!(%phrase, "no phrase store installed (degraded mode); not persisted");
            continue;
        };

        match store.append_one(phrase.clone()).await {
            Ok(()) => debug!(%phrase, "phrase persisted"),
            Err(err) => warn!(%phrase, error = %err, "failed to persist phrase"),
        }
    }
    info!("persist queue closed; persistence worker exiting");
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeSet,
        sync::{Arc, Mutex},
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::GameConfig,
        dao::{
            phrase_store::PhraseStore,
            storage::{StorageError, StorageResult},
        },
        services::dictionary::tests::StaticLookup,
        state::AppState,
    };

    #[derive(Default)]
    struct RecordingStore {
        appended: Mutex<Vec<String>>,
        failing: bool,
    }

    impl PhraseStore for Arc<RecordingStore> {
        fn load_all(&self) -> BoxFuture<'static, StorageResult<BTreeSet<String>>> {
            Box::pin(async { Ok(BTreeSet::new()) })
        }

        fn append_one(&self, phrase: String) -> BoxFuture<'static, StorageResult<()>> {
            let store = self.clone();
            Box::pin(async move {
                if store.failing {
                    return Err(StorageError::unavailable(
                        "read-only".into(),
                        std::io::Error::other("read-only"),
                    ));
                }
                store.appended.lock().unwrap().push(phrase);
                Ok(())
            })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn state() -> (SharedState, PersistQueue) {
        AppState::new(
            GameConfig::default(),
            Arc::new(StaticLookup::accepting(&[])),
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn queued_phrases_reach_installed_store() {
        let (state, _unused) = state();
        let store = Arc::new(RecordingStore::default());
        state.install_phrase_store(Arc::new(store.clone())).await;

        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tx.send("mèo mướp".to_string()).await.unwrap();
        tx.send("bánh mì".to_string()).await.unwrap();
        drop(tx);
        run(state, rx).await;

        assert_eq!(
            *store.appended.lock().unwrap(),
            vec!["mèo mướp".to_string(), "bánh mì".to_string()]
        );
    }

    #[tokio::test]
    async fn degraded_mode_and_failures_do_not_stop_the_worker() {
        let (state, _unused) = state();
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tx.send("mèo mướp".to_string()).await.unwrap();
        drop(tx);
        run(state.clone(), rx).await;

        let failing = Arc::new(RecordingStore {
            failing: true,
            ..Default::default()
        });
        state.install_phrase_store(Arc::new(failing.clone())).await;
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tx.send("bánh mì".to_string()).await.unwrap();
        drop(tx);
        run(state, rx).await;
        assert!(failing.appended.lock().unwrap().is_empty());
    }
}
