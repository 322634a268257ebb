//! Resizer Core - embeddable image conversion unit.
//!
//! A host hands the unit raw image bytes through a shared buffer, picks a
//! transform, and reads the re-encoded result back the same way:
//!
//! ```text
//! Host bytes → Source region → Decode → Resize | Grayscale → Encode → Result region → Host
//! ```
//!
//! The output container always matches the input (png, jpeg or gif).
//!
//! # Usage
//!
//! ```rust,ignore
//! use resizer_core::{Config, ConvertMode, Host, PublishedResult, Region, ResizerUnit};
//!
//! struct FileHost { bytes: Vec<u8>, output: Vec<u8> }
//!
//! impl Host for FileHost {
//!     fn set_file_bytes_to_mem(&mut self, _: &Region, dest: &mut [u8]) -> std::io::Result<()> {
//!         dest.copy_from_slice(&self.bytes);
//!         Ok(())
//!     }
//!
//!     fn set_result(&mut self, _: &PublishedResult, bytes: &[u8]) {
//!         self.output = bytes.to_vec();
//!     }
//! }
//!
//! let unit = ResizerUnit::new(&Config::load()?);
//! let mut host = FileHost { bytes: std::fs::read("photo.png")?, output: vec![] };
//! let len = host.bytes.len();
//! let report = unit.convert_image(&mut host, len, ConvertMode::Resize.tag())?;
//! println!("{}x{} {}", report.width, report.height, report.format);
//! ```

// Module declarations
pub mod bridge;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod output;
pub mod pipeline;
pub mod unit;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use bridge::{BufferBridge, Host, PublishedResult, Region, RegionKind};
pub use config::Config;
pub use error::{ConfigError, ConvertError, ConvertResult, ResizerError, Result};
pub use lifecycle::{Lifecycle, LifecycleState, ShutdownReason};
pub use output::{OutputFormat, OutputWriter, RequestOutcome};
pub use pipeline::{ConvertMode, ConvertedImage, Converter, FormatTag};
pub use unit::{ConvertReport, ResizerUnit};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_unit_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResizerUnit>();
        assert_send_sync::<Lifecycle>();
    }
}
