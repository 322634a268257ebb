//! Container format detection.
//!
//! The unit understands exactly three containers. Sniffing maps whatever
//! `image` recognizes onto the closed [`FormatTag`] set, so both the decode
//! and the encode site can match on it exhaustively.

use image::ImageFormat;
use serde::Serialize;
use std::fmt;

use crate::error::ConvertError;

/// Sniffed container type of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Png,
    Jpeg,
    Gif,
}

impl FormatTag {
    /// Lowercase name reported to the host.
    pub fn name(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
        }
    }

    /// Conventional file extension for result files.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
        }
    }

    /// The matching `image` crate format.
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
        }
    }

    /// Detect the container from the leading bytes.
    ///
    /// Bytes with no recognizable signature are a decode failure; a
    /// recognized container outside the supported trio is unsupported.
    pub fn sniff(bytes: &[u8]) -> Result<Self, ConvertError> {
        let format = image::guess_format(bytes).map_err(|e| ConvertError::Decode {
            message: format!("Cannot detect image format: {}", e),
        })?;
        Self::try_from(format)
    }
}

impl TryFrom<ImageFormat> for FormatTag {
    type Error = ConvertError;

    fn try_from(format: ImageFormat) -> Result<Self, Self::Error> {
        match format {
            ImageFormat::Png => Ok(Self::Png),
            ImageFormat::Jpeg => Ok(Self::Jpeg),
            ImageFormat::Gif => Ok(Self::Gif),
            other => Err(ConvertError::UnsupportedFormat {
                format: other
                    .extensions_str()
                    .first()
                    .copied()
                    .unwrap_or("unknown")
                    .to_string(),
            }),
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
