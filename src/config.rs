//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the wager API
    pub api_endpoint: Option<String>,

    /// Bearer token for the signed-in bettor
    pub id_token: Option<String>,

    /// Room the wagers are placed in
    pub room_id: Option<String>,

    /// Where JSON snapshots are written
    pub cache_dir: PathBuf,

    /// Read snapshots from `cache_dir` instead of the network when present
    pub use_cache: bool,

    /// Also write assembled wagers as CSV
    pub save_csv: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional variables (with defaults):
    /// - WAGER_API_ENDPOINT, WAGER_ID_TOKEN, WAGER_ROOM_ID
    /// - WAGER_CACHE_DIR (default: cache)
    /// - USE_CACHE, SAVE_CSV (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_env_only()
    }

    /// Environment only, no .env file
    pub fn from_env_only() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        Ok(Self {
            api_endpoint: non_empty("WAGER_API_ENDPOINT"),
            id_token: non_empty("WAGER_ID_TOKEN"),
            room_id: non_empty("WAGER_ROOM_ID"),
            cache_dir: non_empty("WAGER_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("cache")),
            use_cache: parse_flag("USE_CACHE", non_empty("USE_CACHE"))?,
            save_csv: parse_flag("SAVE_CSV", non_empty("SAVE_CSV"))?,
        })
    }

    pub fn require_api_endpoint(&self) -> Result<&str, ConfigError> {
        self.api_endpoint
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("WAGER_API_ENDPOINT".to_string()))
    }

    pub fn require_room_id(&self) -> Result<&str, ConfigError> {
        self.room_id
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("WAGER_ROOM_ID".to_string()))
    }
}

fn parse_flag(var: &str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                var: var.to_string(),
                value: v,
            }),
        },
    }
}
