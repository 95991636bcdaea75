use super::error::{GistDaoError, GistResult};

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_FILE_NAME: &str = "dict_offline.txt";

/// Runtime configuration describing which gist file backs the phrase store.
#[derive(Debug, Clone)]
pub struct GistConfig {
    /// Base URL of the GitHub API.
    pub api_url: String,
    /// Identifier of the gist.
    pub gist_id: String,
    /// File holding the JSON phrase array.
    pub file_name: String,
    /// Token allowing writes; read-only without it.
    pub token: Option<String>,
}

impl GistConfig {
    /// Construct a configuration for the given gist using the public GitHub API.
    pub fn new(gist_id: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            gist_id: gist_id.into(),
            file_name: DEFAULT_FILE_NAME.into(),
            token: None,
        }
    }

    /// Attach the token required to patch the gist.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> GistResult<Self> {
        let gist_id = std::env::var("GIST_ID")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(GistDaoError::MissingEnvVar { var: "GIST_ID" })?;

        let mut config = Self::new(gist_id);
        if let Ok(file_name) = std::env::var("GIST_DICT_FILE") {
            config.file_name = file_name;
        }
        if let Ok(api_url) = std::env::var("GIST_API_URL") {
            config.api_url = api_url;
        }
        if let Some(token) = std::env::var("GIST_TOKEN")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            config = config.with_token(token);
        }

        Ok(config)
    }
}
