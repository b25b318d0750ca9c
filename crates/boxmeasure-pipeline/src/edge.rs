//! Canny edge detection and edge-map dilation.
//!
//! [`canny`] turns the blurred grayscale image into a binary edge map
//! (255 = edge, 0 = background). [`dilate`] optionally thickens that map
//! so small gaps in object outlines close before contour tracing.
//!
//! `imageproc::edges::canny` is not used directly: it applies its own
//! fixed Gaussian blur on top of ours, and its hysteresis walk underflows
//! at the image border (<https://github.com/image-rs/imageproc/issues/705>).

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::distance_transform::Norm;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero marks every pixel with any gradient as a
/// potential edge, which floods the contour tracer.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Clamp thresholds so both are at least [`MIN_THRESHOLD`] and
/// `low <= high`.
#[must_use]
pub fn clamp_thresholds(low_threshold: f32, high_threshold: f32) -> (f32, f32) {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    (low, high)
}

/// Detect edges using the Canny algorithm.
///
/// Sobel gradients, non-maximum suppression along the quantized gradient
/// direction, then hysteresis: magnitudes above `high_threshold` are
/// definite edges; magnitudes above `low_threshold` are edges only when
/// 8-connected to a definite edge.
///
/// Thresholds go through [`clamp_thresholds`] first. Images narrower or
/// shorter than 3 pixels have no interior to suppress over and yield an
/// empty edge map.
#[must_use = "returns the binary edge map"]
#[allow(clippy::cast_possible_truncation)]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (low, high) = clamp_thresholds(low_threshold, high_threshold);
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return GrayImage::new(width, height);
    }

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let gx: &[i16] = &gx;
    let gy: &[i16] = &gy;
    let magnitude: Vec<f32> = gx
        .iter()
        .zip(gy)
        .map(|(&h, &v)| f32::from(h).hypot(f32::from(v)))
        .collect();

    let grid = Grid {
        width: width as usize,
        height: height as usize,
    };
    let thinned = non_maximum_suppression(grid, &magnitude, gx, gy);

    let mut edges = GrayImage::new(width, height);
    hysteresis(grid, &thinned, low, high, &mut edges);
    edges
}

/// Grow every edge pixel into a `kernel_size x kernel_size` square
/// (one dilation iteration).
///
/// Kernel sizes below 3 return the map unchanged.
#[must_use = "returns the dilated edge map"]
pub fn dilate(edges: &GrayImage, kernel_size: u32) -> GrayImage {
    let radius = u8::try_from(kernel_size / 2).unwrap_or(u8::MAX);
    if radius == 0 {
        return edges.clone();
    }
    imageproc::morphology::dilate(edges, Norm::LInf, radius)
}

/// Row-major buffer shape shared by the suppression and hysteresis passes.
#[derive(Clone, Copy)]
struct Grid {
    width: usize,
    height: usize,
}

/// Gradient direction quantized to the four neighbor axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Gradient along x: compare left and right neighbors.
    Horizontal,
    /// Gradient toward bottom-right: compare the main diagonal.
    Diagonal,
    /// Gradient along y: compare neighbors above and below.
    Vertical,
    /// Gradient toward bottom-left: compare the anti-diagonal.
    AntiDiagonal,
}

impl Direction {
    fn quantize(gx: i16, gy: i16) -> Self {
        let mut angle = f32::from(gy).atan2(f32::from(gx)).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if (22.5..67.5).contains(&angle) {
            Self::Diagonal
        } else if (67.5..112.5).contains(&angle) {
            Self::Vertical
        } else if (112.5..157.5).contains(&angle) {
            Self::AntiDiagonal
        } else {
            Self::Horizontal
        }
    }
}

/// Keep only pixels whose magnitude is a local maximum across the edge.
///
/// Border pixels are always suppressed. Ties are kept, so a perfectly
/// symmetric step yields a two-pixel-wide ridge.
fn non_maximum_suppression(grid: Grid, magnitude: &[f32], gx: &[i16], gy: &[i16]) -> Vec<f32> {
    let w = grid.width;
    let mut out = vec![0.0; magnitude.len()];
    for y in 1..grid.height - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            let m = magnitude[i];
            if m <= 0.0 {
                continue;
            }
            let (a, b) = match Direction::quantize(gx[i], gy[i]) {
                Direction::Horizontal => (i - 1, i + 1),
                Direction::Diagonal => (i - w - 1, i + w + 1),
                Direction::Vertical => (i - w, i + w),
                Direction::AntiDiagonal => (i - w + 1, i + w - 1),
            };
            if m >= magnitude[a] && m >= magnitude[b] {
                out[i] = m;
            }
        }
    }
    out
}

/// Double-threshold hysteresis with an explicit stack.
///
/// Neighbor ranges are clipped to the grid, so the walk never leaves the
/// image.
fn hysteresis(grid: Grid, thinned: &[f32], low: f32, high: f32, edges: &mut GrayImage) {
    let (w, h) = (grid.width, grid.height);
    let out: &mut [u8] = edges;
    let mut stack = Vec::new();
    for seed in 0..thinned.len() {
        if thinned[seed] <= high || out[seed] != 0 {
            continue;
        }
        out[seed] = 255;
        stack.push(seed);
        while let Some(i) = stack.pop() {
            let (x, y) = (i % w, i / w);
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let n = ny * w + nx;
                    if out[n] == 0 && thinned[n] > low {
                        out[n] = 255;
                        stack.push(n);
                    }
                }
            }
        }
    }
}
