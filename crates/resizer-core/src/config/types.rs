//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resource limits protecting the unit against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest source buffer the host may ask for, in bytes
    pub max_source_bytes: usize,

    /// Maximum decoded image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: 64 * 1024 * 1024,
            max_image_dimension: 16384,
        }
    }
}

/// Resize transform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Each source dimension is divided by this (integer division)
    pub divisor: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self { divisor: 10 }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// JPEG quality factor (1-100, higher = less compression)
    pub jpeg_quality: u8,

    /// GIF palette quantizer speed (1-30, lower = better palette)
    pub gif_speed: i32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 80,
            gif_speed: 10,
        }
    }
}

/// Output settings used by hosts that persist results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for result files; next to the source when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
