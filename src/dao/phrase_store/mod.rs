pub mod file;
/// GitHub gist backend.
#[cfg(feature = "gist-store")]
pub mod gist;

use std::{collections::BTreeSet, time::Duration};

use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistent backing store of confirmed phrases.
///
/// Writes are append-only and must be idempotent: appending a phrase that is
/// already stored succeeds without changing anything.
pub trait PhraseStore: Send + Sync {
    /// Every phrase currently stored.
    fn load_all(&self) -> BoxFuture<'static, StorageResult<BTreeSet<String>>>;
    /// Add one phrase; a no-op when it is already stored.
    fn append_one(&self, phrase: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap reachability probe used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Delay between two health probes of this store.
    fn health_interval(&self) -> Duration {
        DEFAULT_HEALTH_INTERVAL
    }
}

/// Health poll delay for stores that do not override [`PhraseStore::health_interval`].
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(5);
