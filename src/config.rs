//! Configuration and settings management
//!
//! Loads settings from environment variables and defines gate constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Path of the persisted gate configuration document
    #[serde(rename = "gate_config_path", default = "default_gate_config_path")]
    pub gate_config_path_str: String,

    /// Idle window in seconds before an abandoned set-channel session expires
    #[serde(rename = "session_idle_secs")]
    pub session_idle_secs_str: Option<String>,

    /// Upper bound on concurrently tracked set-channel sessions
    #[serde(rename = "session_max_capacity")]
    pub session_max_capacity_str: Option<String>,
}

fn default_gate_config_path() -> String {
    "config.json".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use subgate::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly (without prefix)
            // Note: Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Returns the path of the gate configuration document
    #[must_use]
    pub fn gate_config_path(&self) -> PathBuf {
        PathBuf::from(&self.gate_config_path_str)
    }

    /// Returns the idle window after which an open set-channel session expires
    #[must_use]
    pub fn session_idle(&self) -> Duration {
        let secs = self
            .session_idle_secs_str
            .as_ref()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SESSION_IDLE_SECS);
        Duration::from_secs(secs)
    }

    /// Returns the maximum number of concurrently tracked set-channel sessions
    #[must_use]
    pub fn session_capacity(&self) -> u64 {
        self.session_max_capacity_str
            .as_ref()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SESSION_MAX_CAPACITY)
    }
}


// Session map configuration
/// Default idle window for open set-channel sessions (15 minutes)
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 900;
/// Default capacity of the set-channel session map
pub const DEFAULT_SESSION_MAX_CAPACITY: u64 = 1000;

// Telegram API retry configuration
/// Maximum attempts for transient Telegram API failures
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff delay between retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 250;
/// Upper bound on the backoff delay between retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 2000;
