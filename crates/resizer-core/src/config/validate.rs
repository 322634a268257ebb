//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_source_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_source_bytes must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.resize.divisor == 0 {
            return Err(ConfigError::ValidationError(
                "resize.divisor must be > 0".into(),
            ));
        }
        if !(1..=100).contains(&self.encode.jpeg_quality) {
            return Err(ConfigError::ValidationError(
                "encode.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if !(1..=30).contains(&self.encode.gif_speed) {
            return Err(ConfigError::ValidationError(
                "encode.gif_speed must be between 1 and 30".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {:?}",
                LOG_LEVELS
            )));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be one of {:?}",
                LOG_FORMATS
            )));
        }
        Ok(())
    }
}
