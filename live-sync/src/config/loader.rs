use std::path::Path;
use thiserror::Error;
use url::Url;

use super::types::TrackerConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("Page size of the {0} table must be at least 1")]
    InvalidPageSize(&'static str),
}

/// Load tracker configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrackerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<TrackerConfig, ConfigError> {
    let config: TrackerConfig = serde_json::from_str(json)?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<TrackerConfig, ConfigError> {
    let default_config = include_str!("tracker_config.json");
    load_config_from_str(default_config)
}

impl TrackerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let api = parse_url("api.base_url", &self.api.base_url)?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                field: "api.base_url",
                reason: format!("unsupported scheme {}", api.scheme()),
            });
        }

        let broker = parse_url("broker.url", &self.broker.url)?;
        if !matches!(broker.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidUrl {
                field: "broker.url",
                reason: format!("expected ws:// or wss://, got {}", broker.scheme()),
            });
        }

        for (name, table) in self.tables.all() {
            if table.page_size == 0 {
                return Err(ConfigError::InvalidPageSize(name));
            }
        }
        Ok(())
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::InvalidUrl {
            field,
            reason: "empty".to_string(),
        });
    }
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })
}
