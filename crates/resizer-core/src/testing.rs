//! In-memory fixtures shared by the unit tests.

use image::{DynamicImage, ImageBuffer, Rgb, Rgba};
use std::io::Cursor;

use crate::pipeline::FormatTag;

/// RGB gradient; a 16x16 image has exactly 256 distinct colors.
pub fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    }))
}

/// RGBA gradient with alpha varying along both axes.
pub fn gradient_rgba(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            200,
            ((x + y) * 255 / (width + height).max(1)) as u8,
        ])
    }))
}

/// Encode a fixture into the given container.
pub fn encode_fixture(image: &DynamicImage, format: FormatTag) -> Vec<u8> {
    let image = match format {
        // JPEG has no alpha channel
        FormatTag::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image.clone(),
    };
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format.image_format()).unwrap();
    buffer.into_inner()
}
