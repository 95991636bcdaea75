use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::dao::{phrase_store::PhraseStore, storage::StorageResult};

use super::{
    config::GistConfig,
    error::{GistDaoError, GistResult},
};

const USER_AGENT: &str = concat!("wordchain-back/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
/// GitHub allows 5000 authenticated requests per hour.
const AUTHENTICATED_HEALTH_INTERVAL: Duration = Duration::from_secs(60);
/// Anonymous clients get 60 requests per hour, shared with loads and reads.
const ANONYMOUS_HEALTH_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct GistDocument {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    raw_url: Option<String>,
}

/// Phrase store backed by a single JSON file inside a GitHub gist.
///
/// Gists have no append primitive, so every append rewrites the whole file
/// after merging with the current remote contents.
#[derive(Clone)]
pub struct GistPhraseStore {
    client: Client,
    gist_url: Arc<str>,
    gist_id: Arc<str>,
    file_name: Arc<str>,
    token: Option<Arc<str>>,
    write_lock: Arc<Mutex<()>>,
}

impl GistPhraseStore {
    /// Build the HTTP client and verify the gist is reachable.
    pub async fn connect(config: GistConfig) -> GistResult<Self> {
        let store = Self::from_config(config)?;
        store.fetch_document().await?;
        Ok(store)
    }

    fn from_config(config: GistConfig) -> GistResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| GistDaoError::ClientBuilder { source })?;

        let gist_url = Arc::<str>::from(format!(
            "{}/gists/{}",
            config.api_url.trim_end_matches('/'),
            config.gist_id
        ));

        Ok(Self {
            client,
            gist_url,
            gist_id: Arc::from(config.gist_id),
            file_name: Arc::from(config.file_name),
            token: config.token.map(Arc::from),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url).header("Accept", ACCEPT);
        if let Some(ref token) = self.token {
            builder.header("Authorization", format!("token {token}"))
        } else {
            builder
        }
    }

    async fn fetch_document(&self) -> GistResult<GistDocument> {
        let url = self.gist_url.to_string();
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|source| GistDaoError::RequestSend {
                url: url.clone(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(GistDaoError::RequestStatus {
                url,
                status: response.status(),
            });
        }

        response
            .json::<GistDocument>()
            .await
            .map_err(|source| GistDaoError::DecodeResponse { url, source })
    }

    async fn fetch_raw(&self, raw_url: &str) -> GistResult<String> {
        let response = self
            .request(Method::GET, raw_url)
            .send()
            .await
            .map_err(|source| GistDaoError::RequestSend {
                url: raw_url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(GistDaoError::RequestStatus {
                url: raw_url.to_string(),
                status: response.status(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| GistDaoError::DecodeResponse {
                url: raw_url.to_string(),
                source,
            })
    }

    async fn read_set(&self) -> GistResult<BTreeSet<String>> {
        let document = self.fetch_document().await?;
        let Some(file) = document.files.get(self.file_name.as_ref()) else {
            return Ok(BTreeSet::new());
        };

        let text = match (&file.content, &file.raw_url) {
            (Some(content), _) if !file.truncated => content.clone(),
            (_, Some(raw_url)) => self.fetch_raw(raw_url).await?,
            (Some(content), None) => content.clone(),
            (None, None) => String::new(),
        };

        decode_phrases(&self.file_name, &text)
    }

    async fn write_set(&self, phrases: &BTreeSet<String>) -> GistResult<()> {
        if self.token.is_none() {
            return Err(GistDaoError::ReadOnly {
                gist_id: self.gist_id.to_string(),
            });
        }

        let content =
            serde_json::to_string_pretty(phrases).map_err(|source| GistDaoError::DecodeContent {
                file: self.file_name.to_string(),
                source,
            })?;
        let file_name = self.file_name.to_string();
        let payload = json!({ "files": { file_name: { "content": content } } });

        let url = self.gist_url.to_string();
        let response = self
            .request(Method::PATCH, &url)
            .json(&payload)
            .send()
            .await
            .map_err(|source| GistDaoError::RequestSend {
                url: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(GistDaoError::RequestStatus {
                url,
                status: response.status(),
            })
        }
    }
}

/// Decode the stored file contents, treating blank content as an empty set.
fn decode_phrases(file: &str, text: &str) -> GistResult<BTreeSet<String>> {
    if text.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    let phrases: Vec<String> =
        serde_json::from_str(text).map_err(|source| GistDaoError::DecodeContent {
            file: file.to_string(),
            source,
        })?;
    Ok(phrases.into_iter().map(|p| p.to_lowercase()).collect())
}

impl PhraseStore for GistPhraseStore {
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
        Box::pin(async move { store.fetch_document().await.map(|_| ()).map_err(Into::into) })
    }

    fn health_interval(&self) -> Duration {
        if self.token.is_some() {
            AUTHENTICATED_HEALTH_INTERVAL
        } else {
            ANONYMOUS_HEALTH_INTERVAL
        }
    }
}
