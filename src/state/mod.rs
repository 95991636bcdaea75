/// Lobby and match model.
pub mod game;
/// Outbound notification sink.
pub mod notify;
/// Session to room mapping.
pub mod registry;
/// Match lifecycle state machine.
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, watch};

use crate::{
    config::GameConfig,
    dao::{lookup::RemoteLookup, phrase_store::PhraseStore},
    error::ServiceError,
    services::{
        dictionary::{DictionaryCache, Provenance},
        room::RoomContext,
        validation::{ValidationPipeline, ValidationRules},
    },
};

pub use self::notify::{NotificationHub, Notifier};
pub use self::registry::{RegistryError, RoomRegistry};
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId};

/// Reference counted handle to [`AppState`].
pub type SharedState = Arc<AppState>;

/// Capacity of the queue between the dictionary and the persistence worker.
pub const PERSIST_QUEUE_CAPACITY: usize = 256;
const NOTIFICATION_CAPACITY: usize = 256;

/// Receiving end of the best-effort persist queue, drained by the persistence worker.
pub type PersistQueue = mpsc::Receiver<String>;

/// Central application state: rooms, the shared dictionary and the phrase store.
pub struct AppState {
    config: Arc<GameConfig>,
    registry: RoomRegistry,
    dictionary: Arc<DictionaryCache>,
    notifications: Arc<NotificationHub>,
    phrase_store: RwLock<Option<Arc<dyn PhraseStore>>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// `seed` is the static dictionary loaded at startup. The application starts
    /// in degraded mode until a phrase store is installed.
    pub fn new(
        config: GameConfig,
        lookup: Arc<dyn RemoteLookup>,
        seed: impl IntoIterator<Item = String>,
    ) -> (SharedState, PersistQueue) {
        let (persist_tx, persist_rx) = mpsc::channel(PERSIST_QUEUE_CAPACITY);
        let config = Arc::new(config);

        let dictionary = DictionaryCache::new(lookup, config.lookup_timeout)
            .with_persist_queue(persist_tx);
        dictionary.extend(seed, Provenance::Local);
        let dictionary = Arc::new(dictionary);

        let notifications = Arc::new(NotificationHub::new(NOTIFICATION_CAPACITY));
        let pipeline = Arc::new(ValidationPipeline::new(
            ValidationRules::from(config.as_ref()),
            dictionary.clone(),
        ));
        let notifier: Arc<dyn Notifier> = notifications.clone();
        let ctx = Arc::new(RoomContext::new(config.clone(), pipeline, notifier));

        let (degraded_tx, _rx) = watch::channel(true);
        let state = Arc::new(Self {
            config,
            registry: RoomRegistry::new(ctx),
            dictionary,
            notifications,
            phrase_store: RwLock::new(None),
            degraded: degraded_tx,
        });
        (state, persist_rx)
    }

    /// Runtime game configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Session key to room actor map.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Shared dictionary of confirmed phrases.
    pub fn dictionary(&self) -> &Arc<DictionaryCache> {
        &self.dictionary
    }

    /// Broadcast hub every room publishes its notifications on.
    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    /// Obtain a handle to the current phrase store, if one is installed.
    pub async fn phrase_store(&self) -> Option<Arc<dyn PhraseStore>> {
        let guard = self.phrase_store.read().await;
        guard.as_ref().cloned()
    }

    /// Phrase store or [`ServiceError::Degraded`].
    pub async fn require_phrase_store(&self) -> Result<Arc<dyn PhraseStore>, ServiceError> {
        self.phrase_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new phrase store implementation and leave degraded mode.
    pub async fn install_phrase_store(&self, store: Arc<dyn PhraseStore>) {
        {
            let mut guard = self.phrase_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current phrase store and enter degraded mode.
    pub async fn clear_phrase_store(&self) {
        {
            let mut guard = self.phrase_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.phrase_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
