//! Phrase store persisting a sorted JSON array on the local filesystem.

use std::{collections::BTreeSet, io::ErrorKind, path::PathBuf, sync::Arc};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::{fs, sync::Mutex};

use crate::dao::{
    phrase_store::PhraseStore,
    storage::{StorageError, StorageResult},
};

/// Environment variable pointing at the phrase file.
pub const PHRASE_STORE_PATH_ENV: &str = "PHRASE_STORE_PATH";
/// Phrase file used when [`PHRASE_STORE_PATH_ENV`] is unset.
pub const DEFAULT_PHRASE_STORE_PATH: &str = "data/phrases.json";

/// Failures that can occur while reading or writing the phrase file.
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// Reading the file failed.
    #[error("failed to read phrase file `{path}`")]
    Read {
        /// Path of the phrase file.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Writing the file failed.
    #[error("failed to write phrase file `{path}`")]
    Write {
        /// Path of the phrase file.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a JSON array of strings.
    #[error("phrase file `{path}` is not a JSON array of strings")]
    Decode {
        /// Path of the phrase file.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl From<FileStoreError> for StorageError {
    fn from(err: FileStoreError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

/// Phrase store backed by a local JSON array file.
#[derive(Clone)]
pub struct FilePhraseStore {
    path: Arc<PathBuf>,
    // Serializes read-modify-write cycles so concurrent appends never lose entries.
    write_lock: Arc<Mutex<()>>,
}

impl FilePhraseStore {
    /// Store phrases in the file at `path`; it is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    async fn read_set(&self) -> Result<BTreeSet<String>, FileStoreError> {
        let contents = match fs::read_to_string(self.path.as_ref()).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(source) => {
                return Err(FileStoreError::Read {
                    path: self.display_path(),
                    source,
                });
            }
        };

        if contents.trim().is_empty() {
            return Ok(BTreeSet::new());
        }

        let phrases: Vec<String> =
            serde_json::from_str(&contents).map_err(|source| FileStoreError::Decode {
                path: self.display_path(),
                source,
            })?;
        Ok(phrases.into_iter().map(|p| p.to_lowercase()).collect())
    }

    async fn write_set(&self, phrases: &BTreeSet<String>) -> Result<(), FileStoreError> {
        let write_err = |source| FileStoreError::Write {
            path: self.display_path(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let payload = serde_json::to_string_pretty(phrases).map_err(|source| {
            FileStoreError::Decode {
                path: self.display_path(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload).await.map_err(write_err)?;
        fs::rename(&tmp, self.path.as_ref())
            .await
            .map_err(write_err)
    }
}

impl PhraseStore for FilePhraseStore {
    fn load_all(&self) -> BoxFuture<'static, StorageResult<BTreeSet<String>>> {
        let store = self.clone();
        Box::pin(async move { store.read_set().await.map_err(Into::into) })
    }

    fn append_one(&self, phrase: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let _guard = store.write_lock.lock().await;
            let mut phrases = store.read_set().await?;
            if !phrases.insert(phrase) {
                return Ok(());
            }
            store.write_set(&phrases).await.map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.read_set().await.map(|_| ()).map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("wordchain-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let store = FilePhraseStore::new(temp_path("phrases.json"));
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_is_idempotent() {
        let path = temp_path("phrases.json");
        let store = FilePhraseStore::new(path.clone());

        store.append_one("con mèo".into()).await.unwrap();
        store.append_one("con mèo".into()).await.unwrap();
        store.append_one("mèo mướp".into()).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains("con mèo"));

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["con mèo".to_string(), "mèo mướp".to_string()]);
    }

    #[tokio::test]
    async fn concurrent_appends_keep_every_phrase() {
        let store = FilePhraseStore::new(temp_path("phrases.json"));
        let writes = (0..8).map(|i| store.append_one(format!("phrase number{i}")));
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }
        assert_eq!(store.load_all().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn corrupt_file_reports_unavailable() {
        let path = temp_path("phrases.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{}").unwrap();
        let store = FilePhraseStore::new(path);
        assert!(store.health_check().await.is_err());
    }
}
