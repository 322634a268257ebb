//! Pipeline orchestration: decode → transform → encode.

use image::GenericImageView;

use crate::config::Config;
use crate::error::ConvertError;

use super::decode::ImageDecoder;
use super::encode::ImageEncoder;
use super::format::FormatTag;
use super::transform::{ConvertMode, Transformer};

/// Output of one successful conversion.
#[derive(Debug, Clone)]
pub struct ConvertedImage {
    /// Encoded result bytes
    pub bytes: Vec<u8>,
    /// Container of both the source and the result
    pub format: FormatTag,
    /// Source dimensions
    pub source_width: u32,
    pub source_height: u32,
    /// Result dimensions
    pub width: u32,
    pub height: u32,
}

/// Runs the three pipeline stages over an in-memory source.
///
/// Stateless between calls: nothing decoded for one request survives into
/// the next.
pub struct Converter {
    decoder: ImageDecoder,
    transformer: Transformer,
    encoder: ImageEncoder,
}

impl Converter {
    /// Create a new converter with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            transformer: Transformer::new(config.resize.clone()),
            encoder: ImageEncoder::new(config.encode.clone()),
        }
    }

    /// Convert `source` with the given mode, re-encoding in its own format.
    pub fn convert(
        &self,
        source: &[u8],
        mode: ConvertMode,
    ) -> Result<ConvertedImage, ConvertError> {
        let start = std::time::Instant::now();

        let decoded = self.decoder.decode(source)?;
        tracing::trace!("  Decode: {:?}", start.elapsed());

        let transform_start = std::time::Instant::now();
        let transformed = self.transformer.apply(&decoded.image, mode)?;
        drop(decoded.image);
        tracing::trace!("  Transform ({}): {:?}", mode, transform_start.elapsed());

        let encode_start = std::time::Instant::now();
        let bytes = self.encoder.encode(&transformed, decoded.format)?;
        tracing::trace!("  Encode: {:?}", encode_start.elapsed());

        let (width, height) = transformed.dimensions();
        tracing::debug!(
            "Converted {} {}x{} -> {}x{} ({}) in {:?}",
            decoded.format,
            decoded.width,
            decoded.height,
            width,
            height,
            mode,
            start.elapsed()
        );

        Ok(ConvertedImage {
            bytes,
            format: decoded.format,
            source_width: decoded.width,
            source_height: decoded.height,
            width,
            height,
        })
    }
}
