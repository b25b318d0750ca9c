//! Gaussian blur for noise reduction before edge detection.
//!
//! The smoothing strength is configured as an odd kernel size (5x5,
//! 7x7, ...). A normalized kernel of exactly that many taps is built with
//! the usual size-to-sigma rule and applied separably with
//! [`imageproc::filter::separable_filter_equal`] on an `f32` copy. The
//! kernel length always equals the configured size.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;

/// Sigma for an odd Gaussian kernel size: `0.3 * ((k - 1) / 2 - 1) + 0.8`.
///
/// Returns `0.0` for sizes below 3, which [`gaussian_blur`] treats as
/// "no smoothing".
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    if kernel_size < 3 {
        return 0.0;
    }
    let half = (kernel_size - 1) as f32 / 2.0;
    0.3f32.mul_add(half - 1.0, 0.8)
}

/// Normalized 1-D Gaussian weights of length `kernel_size`, centred on
/// the middle tap.
///
/// Sizes below 3 yield the identity kernel `[1.0]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    let sigma = sigma_for_kernel(kernel_size);
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let half = (kernel_size / 2) as f32;
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let d = i as f32 - half;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Apply a `kernel_size x kernel_size` Gaussian blur.
///
/// Sizes below 3 return the image unchanged. Pixels beyond the border
/// repeat the nearest edge pixel. Both passes run in `f32` and the
/// result is rounded once, so flat regions keep their exact value.
#[must_use = "returns the blurred image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size < 3 {
        return image.clone();
    }
    let kernel = gaussian_kernel(kernel_size);
    let (width, height) = image.dimensions();
    let input = Image::<Luma<f32>>::from_fn(width, height, |x, y| {
        Luma([f32::from(image.get_pixel(x, y).0[0])])
    });
    let blurred = imageproc::filter::separable_filter_equal(&input, &kernel);
    GrayImage::from_fn(width, height, |x, y| {
        Luma([blurred.get_pixel(x, y).0[0].round().clamp(0.0, 255.0) as u8])
    })
}
