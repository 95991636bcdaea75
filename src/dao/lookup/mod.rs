pub mod http;

use futures::future::BoxFuture;
use thiserror::Error;

pub use self::http::HttpLookup;

/// Result alias for remote dictionary lookups.
pub type LookupResult<T> = Result<T, LookupError>;

/// Failures of the remote dictionary oracle. Callers treat all of them as a
/// negative answer.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The URL template produced an invalid URL.
    #[error("invalid lookup url `{url}`")]
    InvalidUrl {
        /// URL after substitution.
        url: String,
    },
    /// Building the HTTP client failed.
    #[error("failed to build lookup client")]
    ClientBuilder {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be completed.
    #[error("lookup request to `{url}` failed")]
    Request {
        /// Requested URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The request exceeded its timeout.
    #[error("lookup timed out")]
    Timeout,
}

/// Opaque oracle answering whether a phrase is meaningful.
pub trait RemoteLookup: Send + Sync {
    /// Answer whether `phrase` is a meaningful Vietnamese phrase.
    fn lookup(&self, phrase: &str) -> BoxFuture<'static, LookupResult<bool>>;
}
