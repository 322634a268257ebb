//! Format-preserving re-encoding.
//!
//! | Format | Encoder | Settings |
//! |---|---|---|
//! | png | `PngEncoder` | defaults, lossless, 16-bit gray kept |
//! | jpeg | `JpegEncoder` | quality from `encode.jpeg_quality` |
//! | gif | `GifEncoder` | one RGBA frame, palette of at most 256 colors |

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Frame, ImageResult};

use crate::config::EncodeConfig;
use crate::error::ConvertError;

use super::format::FormatTag;

/// Encodes transformed images back into their source container.
pub struct ImageEncoder {
    config: EncodeConfig,
}

impl ImageEncoder {
    /// Create a new encoder with the given settings.
    pub fn new(config: EncodeConfig) -> Self {
        Self { config }
    }

    /// Encode `image` as `format`.
    pub fn encode(&self, image: &DynamicImage, format: FormatTag) -> Result<Vec<u8>, ConvertError> {
        let mut buffer = Vec::new();

        let result = match format {
            FormatTag::Png => Self::encode_png(image, &mut buffer),
            FormatTag::Jpeg => self.encode_jpeg(image, &mut buffer),
            FormatTag::Gif => self.encode_gif(image, &mut buffer),
        };

        result.map_err(|e| ConvertError::Encode {
            format,
            message: e.to_string(),
        })?;

        tracing::debug!("Encoded {} ({} bytes)", format, buffer.len());
        Ok(buffer)
    }

    fn encode_png(image: &DynamicImage, buffer: &mut Vec<u8>) -> ImageResult<()> {
        image.write_with_encoder(PngEncoder::new(buffer))
    }

    fn encode_jpeg(&self, image: &DynamicImage, buffer: &mut Vec<u8>) -> ImageResult<()> {
        // JPEG carries neither alpha nor 16-bit samples
        let flattened = if image.color().has_color() {
            DynamicImage::ImageRgb8(image.to_rgb8())
        } else {
            DynamicImage::ImageLuma8(image.to_luma8())
        };
        let encoder = JpegEncoder::new_with_quality(buffer, self.config.jpeg_quality);
        flattened.write_with_encoder(encoder)
    }

    fn encode_gif(&self, image: &DynamicImage, buffer: &mut Vec<u8>) -> ImageResult<()> {
        // The trailer is written when the encoder drops
        let mut encoder = GifEncoder::new_with_speed(buffer, self.config.gif_speed);
        encoder.encode_frame(Frame::new(image.to_rgba8()))
    }
}
