//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! color image the renderer draws on plus the single-channel intensity
//! image the rest of the pipeline works with.

use image::{DynamicImage, GrayImage, RgbImage};

use crate::types::InvalidImage;

/// Decode raw image bytes.
///
/// # Errors
///
/// Returns [`InvalidImage::Empty`] if `bytes` is empty.
/// Returns [`InvalidImage::Decode`] if the image format is unrecognized
/// or the data is corrupt.
/// Returns [`InvalidImage::ZeroDimensions`] if the decoded image has no
/// pixels.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, InvalidImage> {
    if bytes.is_empty() {
        return Err(InvalidImage::Empty);
    }

    let img = image::load_from_memory(bytes)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(InvalidImage::ZeroDimensions {
            width: img.width(),
            height: img.height(),
        });
    }
    Ok(img)
}

/// Three-channel color copy of a decoded image.
///
/// Grayscale inputs are expanded to RGB and alpha is dropped, so the
/// renderer always has a color canvas.
#[must_use = "returns the color image"]
pub fn to_rgb(image: &DynamicImage) -> RgbImage {
    image.to_rgb8()
}

/// Convert to a single intensity channel using the `image` crate's
/// weighted luminance (green weighs most, blue least).
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}
