//! Game configuration loading: turn timing, validation rules and lookup bounds.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/game.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WORDCHAIN_CONFIG_PATH";

/// How a new phrase must relate to the previously accepted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainMode {
    /// The first token must equal the previous phrase's last token.
    #[default]
    PrefixSuffix,
    /// The first token must rhyme with the previous phrase's last token.
    RhymeKey,
}

/// Immutable runtime configuration shared by every room.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Time budget granted to the player on turn.
    pub turn_duration: Duration,
    /// Fraction of the turn after which an idle player is reminded.
    pub reminder_fraction: f64,
    /// Delay after which an open lobby begins on its own.
    pub auto_begin: Duration,
    /// Minimum number of characters per token.
    pub min_token_len: usize,
    /// Exact number of tokens a phrase must contain.
    pub word_count: usize,
    /// Chaining rule between consecutive phrases.
    pub chain_mode: ChainMode,
    /// Minimum lobby size for the auto-begin deadline to start a match.
    pub min_participants_to_auto_begin: usize,
    /// Rejections tolerated per player before a rejection eliminates.
    pub strikes_before_elimination: u32,
    /// Upper bound on a single remote dictionary lookup.
    pub lookup_timeout: Duration,
}

impl GameConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), ?config, "loaded game config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; missing fields take their default value.
    ///
    /// Out-of-range values are replaced by their defaults with a warning rather
    /// than rejecting the whole document.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        let raw: RawConfig = serde_json::from_str(contents)?;
        Ok(raw.into())
    }

    /// Delay before the reminder of a turn fires.
    pub fn reminder_delay(&self) -> Duration {
        self.turn_duration.mul_f64(self.reminder_fraction)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    turn_secs: u64,
    reminder_fraction: f64,
    auto_begin_secs: u64,
    min_token_len: usize,
    word_count: usize,
    chain_mode: ChainMode,
    min_participants_to_auto_begin: usize,
    strikes_before_elimination: u32,
    lookup_timeout_ms: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            turn_secs: 60,
            reminder_fraction: 0.5,
            auto_begin_secs: 60,
            min_token_len: 2,
            word_count: 2,
            chain_mode: ChainMode::PrefixSuffix,
            min_participants_to_auto_begin: 1,
            strikes_before_elimination: 0,
            lookup_timeout_ms: 5_000,
        }
    }
}

impl From<RawConfig> for GameConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = RawConfig::default();

        let turn_secs = if value.turn_secs == 0 {
            warn!("turn_secs must be positive; using default");
            defaults.turn_secs
        } else {
            value.turn_secs
        };
        let reminder_fraction = if value.reminder_fraction > 0.0 && value.reminder_fraction < 1.0 {
            value.reminder_fraction
        } else {
            warn!(
                reminder_fraction = value.reminder_fraction,
                "reminder_fraction must lie in (0, 1); using default"
            );
            defaults.reminder_fraction
        };
        let word_count = if value.word_count == 0 {
            warn!("word_count must be positive; using default");
            defaults.word_count
        } else {
            value.word_count
        };

        let lookup_timeout_ms = if value.lookup_timeout_ms == 0 {
            warn!("lookup_timeout_ms must be positive; using default");
            defaults.lookup_timeout_ms
        } else {
            value.lookup_timeout_ms
        };

        Self {
            turn_duration: Duration::from_secs(turn_secs),
            reminder_fraction,
            auto_begin: Duration::from_secs(value.auto_begin_secs),
            min_token_len: value.min_token_len.max(1),
            word_count,
            chain_mode: value.chain_mode,
            min_participants_to_auto_begin: value.min_participants_to_auto_begin,
            strikes_before_elimination: value.strikes_before_elimination,
            lookup_timeout: Duration::from_millis(lookup_timeout_ms),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
