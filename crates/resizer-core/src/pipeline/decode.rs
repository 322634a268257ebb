//! Image decoding with format detection and dimension limits.

use image::{DynamicImage, GenericImageView, ImageReader, Limits};
use std::io::Cursor;

use crate::config::LimitsConfig;
use crate::error::ConvertError;

use super::format::FormatTag;

/// Image decoder with configurable limits.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Sniffed container format
    pub format: FormatTag,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an in-memory source buffer.
    ///
    /// The format is sniffed from the bytes before the codec runs, so the
    /// decoder never guesses from anything but content.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, ConvertError> {
        let format = FormatTag::sniff(bytes)?;

        let mut reader = ImageReader::with_format(Cursor::new(bytes), format.image_format());
        reader.limits(self.codec_limits());

        let image = reader.decode().map_err(|e| ConvertError::Decode {
            message: e.to_string(),
        })?;

        let (width, height) = image.dimensions();
        tracing::debug!("Decoded {} image ({}x{})", format, width, height);

        Ok(DecodedImage {
            image,
            format,
            width,
            height,
        })
    }

    fn codec_limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.limits.max_image_dimension);
        limits.max_image_height = Some(self.limits.max_image_dimension);
        limits
    }
}
