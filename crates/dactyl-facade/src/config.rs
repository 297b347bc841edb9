//! Facade configuration, loaded from TOML.
//!
//! ```toml
//! [session]
//! default_timeout_ms = 8000
//! template_format = "ansi378"
//!
//! [preview]
//! compression = "fast"
//! ```
//!
//! Every key is optional; missing keys fall back to their defaults.

use std::path::Path;

use dactyl_core::constants::MAX_HISTORY_CAPACITY;
use dactyl_session::SessionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a [`FacadeConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// PNG compression level for capture previews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewCompression {
    #[default]
    Default,
    Fast,
    Best,
}

impl From<PreviewCompression> for image::codecs::png::CompressionType {
    fn from(compression: PreviewCompression) -> Self {
        match compression {
            PreviewCompression::Default => Self::Default,
            PreviewCompression::Fast => Self::Fast,
            PreviewCompression::Best => Self::Best,
        }
    }
}

/// Preview image settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// When false, captures return an empty preview.
    pub enabled: bool,

    pub compression: PreviewCompression,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compression: PreviewCompression::Default,
        }
    }
}

/// Top-level configuration for a [`crate::CommandFacade`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    pub session: SessionConfig,
    pub preview: PreviewConfig,
}

impl FacadeConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.default_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "session.default_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.session.history_capacity == 0
            || self.session.history_capacity > MAX_HISTORY_CAPACITY
        {
            return Err(ConfigError::Invalid(format!(
                "session.history_capacity must be between 1 and {}",
                MAX_HISTORY_CAPACITY
            )));
        }

        Ok(())
    }
}
