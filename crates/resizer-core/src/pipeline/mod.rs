//! Image conversion pipeline components.
//!
//! This module contains the stages every conversion request runs through:
//! - **format**: Sniff the source container (png, jpeg or gif)
//! - **decode**: Decode source bytes under dimension limits
//! - **transform**: Fixed-ratio resize or 16-bit grayscale
//! - **encode**: Re-encode in the source container
//! - **processor**: Orchestrates the full pipeline

pub mod decode;
pub mod encode;
pub mod format;
pub mod processor;
pub mod transform;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder};
pub use encode::ImageEncoder;
pub use format::FormatTag;
pub use processor::{ConvertedImage, Converter};
pub use transform::{grayscale, resize_target, ConvertMode, Transformer};
