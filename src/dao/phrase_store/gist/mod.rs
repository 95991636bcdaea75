/// Environment driven configuration.
pub mod config;
pub mod error;
/// HTTP implementation of the store.
pub mod store;

pub use config::GistConfig;
pub use store::GistPhraseStore;
