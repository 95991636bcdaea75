//! Error types shared by the gist-backed phrase store.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`GistDaoError`] failures.
pub type GistResult<T> = Result<T, GistDaoError>;

/// Failures that can occur while interacting with the GitHub gist API.
#[derive(Debug, Error)]
pub enum GistDaoError {
    /// Required environment variable is missing.
    #[error("missing gist environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build gist HTTP client")]
    ClientBuilder {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// A request to the gist API could not be sent.
    #[error("failed to send gist request to `{url}`")]
    RequestSend {
        /// Requested URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The gist API returned an unexpected status code.
    #[error("unexpected gist response status {status} for `{url}`")]
    RequestStatus {
        /// Requested URL.
        url: String,
        /// Status returned by GitHub.
        status: StatusCode,
    },
    /// Response payload could not be decoded.
    #[error("failed to decode gist response for `{url}`")]
    DecodeResponse {
        /// Requested URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The stored file is not a JSON array of phrases.
    #[error("gist file `{file}` does not contain a JSON array of strings")]
    DecodeContent {
        /// File name inside the gist.
        file: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing requires a token but none was configured.
    #[error("gist `{gist_id}` cannot be updated without GIST_TOKEN")]
    ReadOnly {
        /// Identifier of the gist.
        gist_id: String,
    },
}

impl From<GistDaoError> for StorageError {
    fn from(err: GistDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
