use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::services::GestureConfig;

/// Prefix of every environment variable read by [`Config::from_environment`]
pub const ENV_PREFIX: &str = "QUOTE_BUILDER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub editor: EditorConfig,
    pub gestures: GestureSettings,
    pub catalog: CatalogConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,
    #[serde(default = "default_draft_key")]
    pub draft_key: String,
    #[serde(default = "default_draft_dir")]
    pub draft_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GestureSettings {
    #[serde(default = "default_hold_delay_ms")]
    pub hold_delay_ms: u64,
    #[serde(default = "default_move_threshold_px")]
    pub move_threshold_px: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// JSON array of services imported at startup
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

impl Config {
    pub fn from_environment() -> Result<Self, ConfigError> {
        let config = Config {
            editor: from_env("editor")?,
            gestures: from_env("gesture")?,
            catalog: from_env("catalog")?,
            observability: from_env("observability")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.editor.autosave_debounce_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "Autosave debounce cannot be 0".to_string(),
            });
        }

        if self.editor.draft_key.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Draft key cannot be empty".to_string(),
            });
        }

        if self.gestures.hold_delay_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "Touch hold delay cannot be 0".to_string(),
            });
        }

        let threshold = self.gestures.move_threshold_px;
        if threshold.is_nan() || threshold <= 0.0 {
            return Err(ConfigError::ValidationError {
                message: "Touch move threshold must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// Deserialize one section from the prefixed environment
fn from_env<T: serde::de::DeserializeOwned>(section: &str) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl EditorConfig {
    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

impl GestureSettings {
    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig {
            hold_delay: Duration::from_millis(self.hold_delay_ms),
            move_threshold_px: self.move_threshold_px,
        }
    }
}

// Default value functions
pub(crate) fn default_autosave_debounce_ms() -> u64 {
    1500
}

pub(crate) fn default_draft_key() -> String {
    "quote-draft".to_string()
}

pub(crate) fn default_draft_dir() -> PathBuf {
    PathBuf::from("./drafts")
}

pub(crate) fn default_hold_delay_ms() -> u64 {
    300
}

pub(crate) fn default_move_threshold_px() -> f32 {
    10.0
}

pub(crate) fn default_service_name() -> String {
    "quote-builder-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
