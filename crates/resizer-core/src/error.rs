//! Error types for the Resizer conversion unit.
//!
//! Errors are organized by concern so a host can tell a bad input apart from
//! a misuse of the boundary protocol. Every [`ConvertError`] carries a stable
//! [`kind`](ConvertError::kind) code for reporting across the boundary.

use thiserror::Error;

use crate::pipeline::FormatTag;

/// Top-level error type for Resizer operations.
#[derive(Error, Debug)]
pub enum ResizerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Conversion request errors
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors surfaced by a single conversion request.
///
/// A request that fails with any of these publishes nothing; the previously
/// published result, if any, stays as it was.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Source bytes are not a recognizable image, or the codec rejected them
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Source container was recognized but is not png, jpeg or gif
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Codec failure while writing the transformed image
    #[error("Encode error ({format}): {message}")]
    Encode { format: FormatTag, message: String },

    /// Requested source buffer cannot be allocated
    #[error("Cannot allocate {requested} bytes: {message}")]
    Allocation { requested: usize, message: String },

    /// Fixed-ratio resize would produce an image with no pixels
    #[error("Resize target {width}x{height} is empty")]
    EmptyResizeTarget { width: u32, height: u32 },

    /// Host passed a mode tag outside the known range
    #[error("Invalid convert mode tag: {0}")]
    InvalidMode(i64),

    /// Another conversion is already in flight
    #[error("A conversion is already in progress")]
    Busy,

    /// The unit has been shut down and accepts no further calls
    #[error("Unit is shut down")]
    ShutDown,

    /// A region handle no longer names a live buffer
    #[error("Region is no longer valid")]
    StaleRegion,

    /// The host failed to fill the announced source region
    #[error("Host error: {0}")]
    Host(#[from] std::io::Error),
}

impl ConvertError {
    /// Stable snake_case code for reporting this error to a host.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::Encode { .. } => "encode",
            Self::Allocation { .. } => "allocation",
            Self::EmptyResizeTarget { .. } => "empty_resize_target",
            Self::InvalidMode(_) => "invalid_mode",
            Self::Busy => "busy",
            Self::ShutDown => "shut_down",
            Self::StaleRegion => "stale_region",
            Self::Host(_) => "host",
        }
    }
}

/// Convenience type alias for Resizer results.
pub type Result<T> = std::result::Result<T, ResizerError>;

/// Convenience type alias for conversion results.
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;
