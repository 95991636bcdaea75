//! Shared, append-only dictionary of phrases known to be meaningful.

use std::{sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use serde::Serialize;
use tokio::{
    sync::{
        OnceCell,
        mpsc::{self, error::TrySendError},
    },
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{dao::lookup::RemoteLookup, services::validation::normalize};

/// Where a dictionary entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Loaded from the static dictionary at startup.
    Local,
    /// Confirmed by the remote lookup (now or in a previous run).
    CachedRemote,
}

/// In-memory phrase set backed by a remote oracle and a best-effort persist queue.
///
/// Entries are never removed. Concurrent verifications of the same phrase share
/// one remote lookup, and a phrase is queued for persistence only by the call
/// that actually inserted it.
pub struct DictionaryCache {
    entries: DashMap<String, Provenance>,
    inflight: DashMap<String, Arc<OnceCell<bool>>>,
    lookup: Arc<dyn RemoteLookup>,
    lookup_timeout: Duration,
    persist: Option<mpsc::Sender<String>>,
}

impl DictionaryCache {
    /// Build an empty cache that consults `lookup` on misses.
    pub fn new(lookup: Arc<dyn RemoteLookup>, lookup_timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            lookup,
            lookup_timeout,
            persist: None,
        }
    }

    /// Forward newly confirmed remote phrases to `queue` for persistence.
    pub fn with_persist_queue(mut self, queue: mpsc::Sender<String>) -> Self {
        self.persist = Some(queue);
        self
    }

    /// Insert a phrase; returns `false` when it was already present.
    pub fn insert(&self, phrase: &str, provenance: Provenance) -> bool {
        let key = normalize(phrase);
        if key.is_empty() {
            return false;
        }
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(provenance);
                true
            }
        }
    }

    /// Insert many phrases, returning how many were new.
    pub fn extend<I, S>(&self, phrases: I, provenance: Provenance) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        phrases
            .into_iter()
            .filter(|phrase| self.insert(phrase.as_ref(), provenance))
            .count()
    }

    /// Synchronous membership test on the normalized phrase.
    pub fn has(&self, phrase: &str) -> bool {
        self.entries.contains_key(&normalize(phrase))
    }

    /// Where a known phrase came from.
    pub fn provenance(&self, phrase: &str) -> Option<Provenance> {
        self.entries.get(&normalize(phrase)).map(|entry| *entry.value())
    }

    /// Number of known phrases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no phrase is known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect every known phrase accepted by `predicate`.
    pub fn phrases_matching(&self, predicate: impl Fn(&str) -> bool) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| predicate(entry.key()))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Resolve whether a phrase is meaningful, consulting the remote oracle on a miss.
    pub async fn verify(&self, phrase: &str) -> bool {
        let key = normalize(phrase);
        if key.is_empty() {
            return false;
        }
        if self.entries.contains_key(&key) {
            return true;
        }

        let cell = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();
        let verdict = *cell.get_or_init(|| self.remote_verify(&key)).await;
        self.inflight
            .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell));
        verdict
    }

    async fn remote_verify(&self, key: &str) -> bool {
        match timeout(self.lookup_timeout, self.lookup.lookup(key)).await {
            Ok(Ok(true)) => {
                if self.insert(key, Provenance::CachedRemote) {
                    info!(phrase = %key, "remote lookup confirmed new phrase");
                    self.schedule_persist(key.to_string());
                }
                true
            }
            Ok(Ok(false)) => {
                debug!(phrase = %key, "remote lookup rejected phrase");
                false
            }
            Ok(Err(err)) => {
                warn!(phrase = %key, error = %err, "remote lookup failed; treating as not meaningful");
                false
            }
            Err(_) => {
                warn!(
                    phrase = %key,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "remote lookup timed out; treating as not meaningful"
                );
                false
            }
        }
    }

    fn schedule_persist(&self, phrase: String) {
        let Some(queue) = self.persist.as_ref() else {
            return;
        };
        match queue.try_send(phrase) {
            Ok(()) => {}
            Err(TrySendError::Full(phrase)) => {
                warn!(%phrase, "persist queue full; phrase stays in memory only");
            }
            Err(TrySendError::Closed(phrase)) => {
                debug!(%phrase, "persist queue closed; skipping");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::dao::lookup::{LookupError, LookupResult};

    /// Lookup answering from a fixed set after an optional delay.
    pub(crate) struct StaticLookup {
        accepted: HashSet<String>,
        calls: Arc<AtomicUsize>,
        delay: Duration,
        failing: bool,
    }

    impl StaticLookup {
        pub(crate) fn accepting(phrases: &[&str]) -> Self {
            Self {
                accepted: phrases.iter().map(|p| p.to_string()).collect(),
                calls: Arc::new(AtomicUsize::new(0)),
                delay: Duration::ZERO,
                failing: false,
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn failing() -> Self {
            let mut lookup = Self::accepting(&[]);
            lookup.failing = true;
            lookup
        }

        pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
            self.calls.clone()
        }
    }

    impl RemoteLookup for StaticLookup {
        fn lookup(&self, phrase: &str) -> BoxFuture<'static, LookupResult<bool>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let verdict = self.accepted.contains(phrase);
            let delay = self.delay;
            let failing = self.failing;
            Box::pin(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if failing {
                    Err(LookupError::Timeout)
                } else {
                    Ok(verdict)
                }
            })
        }
    }

    pub(crate) fn dictionary_with(
        known: &[&str],
        lookup: StaticLookup,
        lookup_timeout: Duration,
    ) -> Arc<DictionaryCache> {
        let cache = DictionaryCache::new(Arc::new(lookup), lookup_timeout);
        cache.extend(known.iter(), Provenance::Local);
        Arc::new(cache)
    }

    #[test]
    fn insert_is_idempotent_and_normalized() {
        let cache = DictionaryCache::new(
            Arc::new(StaticLookup::accepting(&[])),
            Duration::from_secs(1),
        );
        assert!(cache.insert("Con  Mèo", Provenance::Local));
        assert!(!cache.insert("con mèo", Provenance::CachedRemote));
        assert_eq!(cache.len(), 1);
        assert!(cache.has(" CON MÈO "));
        assert_eq!(cache.provenance("con mèo"), Some(Provenance::Local));
    }

    #[tokio::test]
    async fn hit_skips_remote_lookup() {
        let lookup = StaticLookup::accepting(&[]);
        let calls = lookup.calls();
        let cache = dictionary_with(&["con mèo"], lookup, Duration::from_secs(1));
        assert!(cache.verify("con mèo").await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_affirmation_is_cached_and_persisted_once() {
        let (tx, mut rx) = mpsc::channel(8);
        let cache = DictionaryCache::new(
            Arc::new(StaticLookup::accepting(&["mèo mướp"])),
            Duration::from_secs(1),
        )
        .with_persist_queue(tx);

        assert!(cache.verify("mèo mướp").await);
        assert!(cache.has("mèo mướp"));
        assert_eq!(cache.provenance("mèo mướp"), Some(Provenance::CachedRemote));
        assert!(cache.verify("mèo mướp").await);

        assert_eq!(rx.try_recv().unwrap(), "mèo mướp");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_verifications_share_one_lookup() {
        let lookup = StaticLookup::accepting(&["mèo mướp"]).with_delay(Duration::from_millis(200));
        let calls = lookup.calls();
        let (tx, mut rx) = mpsc::channel(8);
        let cache = Arc::new(
            DictionaryCache::new(Arc::new(lookup), Duration::from_secs(1)).with_persist_queue(tx),
        );

        let (a, b) = tokio::join!(cache.verify("mèo mướp"), cache.verify("Mèo Mướp"));
        assert!(a && b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_recv().unwrap(), "mèo mướp");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookup_times_out_as_not_meaningful() {
        let lookup = StaticLookup::accepting(&["mèo mướp"]).with_delay(Duration::from_secs(10));
        let cache = dictionary_with(&[], lookup, Duration::from_secs(2));
        assert!(!cache.verify("mèo mướp").await);
        assert!(!cache.has("mèo mướp"));
    }

    #[tokio::test]
    async fn negative_answers_are_requeried_later() {
        let lookup = StaticLookup::accepting(&[]);
        let calls = lookup.calls();
        let cache = dictionary_with(&[], lookup, Duration::from_secs(1));
        assert!(!cache.verify("mèo khủng").await);
        assert!(!cache.verify("mèo khủng").await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lookup_errors_are_not_meaningful() {
        let cache = dictionary_with(&[], StaticLookup::failing(), Duration::from_secs(1));
        assert!(!cache.verify("con mèo").await);
    }

    #[test]
    fn phrases_matching_filters_entries() {
        let cache = dictionary_with(
            &["con mèo", "mèo mướp", "mèo con"],
            StaticLookup::accepting(&[]),
            Duration::from_secs(1),
        );
        let mut found = cache.phrases_matching(|p| p.starts_with("mèo "));
        found.sort();
        assert_eq!(found, vec!["mèo con".to_string(), "mèo mướp".to_string()]);
    }
}
