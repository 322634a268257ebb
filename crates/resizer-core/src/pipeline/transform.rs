//! Pixel transforms: fixed-ratio downscale and 16-bit grayscale.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::ResizeConfig;
use crate::error::ConvertError;

/// Transform selected by the host for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvertMode {
    /// Downscale each dimension by the configured divisor
    Resize,
    /// Replace every pixel by its 16-bit luminance
    Grayscale,
}

impl ConvertMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::Grayscale => "grayscale",
        }
    }

    /// Integer tag used on the host boundary.
    pub fn tag(self) -> i64 {
        match self {
            Self::Resize => 0,
            Self::Grayscale => 1,
        }
    }
}

impl TryFrom<i64> for ConvertMode {
    type Error = ConvertError;

    fn try_from(tag: i64) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Resize),
            1 => Ok(Self::Grayscale),
            other => Err(ConvertError::InvalidMode(other)),
        }
    }
}

impl FromStr for ConvertMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resize" | "0" => Ok(Self::Resize),
            "grayscale" | "greyscale" | "gray" | "1" => Ok(Self::Grayscale),
            other => Err(format!("unknown mode '{other}' (expected resize or grayscale)")),
        }
    }
}

impl fmt::Display for ConvertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target dimensions of the fixed-ratio downscale.
///
/// Integer division; the fractional remainder is dropped, so sources smaller
/// than `divisor` in a dimension yield 0 for it.
pub fn resize_target(width: u32, height: u32, divisor: u32) -> (u32, u32) {
    (width / divisor, height / divisor)
}

/// 16-bit luminance of every pixel, alpha kept when present.
///
/// Applying it to its own output returns the same raster.
pub fn grayscale(image: &DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageLumaA16(image.to_luma_alpha16())
    } else {
        DynamicImage::ImageLuma16(image.to_luma16())
    }
}

/// Applies a [`ConvertMode`] to a decoded image.
pub struct Transformer {
    config: ResizeConfig,
}

impl Transformer {
    /// Create a new transformer with the given resize settings.
    pub fn new(config: ResizeConfig) -> Self {
        Self { config }
    }

    /// Run the selected transform.
    pub fn apply(
        &self,
        image: &DynamicImage,
        mode: ConvertMode,
    ) -> Result<DynamicImage, ConvertError> {
        match mode {
            ConvertMode::Resize => self.resize(image),
            ConvertMode::Grayscale => Ok(grayscale(image)),
        }
    }

    fn resize(&self, image: &DynamicImage) -> Result<DynamicImage, ConvertError> {
        let (width, height) = image.dimensions();
        let (target_w, target_h) = resize_target(width, height, self.config.divisor);

        if target_w == 0 || target_h == 0 {
            return Err(ConvertError::EmptyResizeTarget {
                width: target_w,
                height: target_h,
            });
        }

        tracing::trace!(
            "Resizing {}x{} -> {}x{} (Lanczos3)",
            width,
            height,
            target_w,
            target_h
        );
        Ok(image.resize_exact(target_w, target_h, FilterType::Lanczos3))
    }
}
