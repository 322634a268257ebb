//! Configuration management for Resizer.
//!
//! Configuration is loaded from a TOML file with sensible defaults. Every
//! section implements `Default`, so a missing file or a partial file is fine.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Resizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resource limits
    pub limits: LimitsConfig,

    /// Resize transform settings
    pub resize: ResizeConfig,

    /// Encoder settings
    pub encode: EncodeConfig,

    /// Where hosts write result files
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.resizer.resizer/config.toml
    /// - Linux: ~/.config/resizer/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\resizer\config\config.toml
    ///
    /// Falls back to ~/.resizer/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "resizer", "resizer")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".resizer").join("config.toml")
            })
    }

    /// Get the resolved output directory (with ~ expansion), if one is set.
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output.dir.as_ref().map(|dir| {
            let path_str = dir.to_string_lossy();
            let expanded = shellexpand::tilde(&path_str);
            PathBuf::from(expanded.into_owned())
        })
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
