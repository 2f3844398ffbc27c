//! Runtime configuration for the dispatch engines.
//!
//! Supports YAML file and environment variable overrides, same priority
//! order as the wider framework: environment beats file beats default.
//! Scoped to what an in-process router/engine itself consults — transport,
//! storage and scheduling configuration belong to the coordinator that
//! embeds this crate, not to it.

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Log at `debug` when a dispatch table ignores an unrecognized event
    /// or command type. Off by default; high-cardinality event streams
    /// make this noisy.
    pub log_unmatched_dispatch: bool,
    /// Log a `RevocationResponse` delegation whenever no compensation
    /// handler matched a rejection.
    pub log_unhandled_rejections: bool,
}

impl RuntimeConfig {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("MERIDIAN_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(flag) = std::env::var("MERIDIAN_LOG_UNMATCHED_DISPATCH") {
            self.log_unmatched_dispatch = flag.to_lowercase() == "true" || flag == "1";
        }
        if let Ok(flag) = std::env::var("MERIDIAN_LOG_UNHANDLED_REJECTIONS") {
            self.log_unhandled_rejections = flag.to_lowercase() == "true" || flag == "1";
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
