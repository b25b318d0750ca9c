//! Shared types for the boxmeasure detection pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// annotated output image without depending on `image` directly.
pub use image::RgbImage;

/// An integer pixel coordinate on a traced contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from left edge).
    pub x: u32,
    /// Row (pixels from top edge).
    pub y: u32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// The ordered border pixels of one traced contour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a new contour from its border points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the contour.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Axis-aligned bounding rectangle of the contour, or `None` for an
    /// empty contour.
    ///
    /// Both extents are inclusive, so a single-pixel contour has a
    /// `1x1` box.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.0.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.0[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(BoundingBox::new(
            min_x,
            min_y,
            max_x - min_x + 1,
            max_y - min_y + 1,
        ))
    }
}

/// Integer pixel rectangle around a detected object.
///
/// `width` is the reported "length" measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Create a new bounding box.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the rightmost column.
    #[must_use]
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// One past the bottom row.
    #[must_use]
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    /// `width * height`.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether the two rectangles share interior area.
    ///
    /// Open-rectangle test: boxes that only touch along an edge do not
    /// intersect.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        u64::from(self.x) < other.right()
            && self.right() > u64::from(other.x)
            && u64::from(self.y) < other.bottom()
            && self.bottom() > u64::from(other.y)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Minimum-size thresholds a bounding box must exceed to be kept.
///
/// All comparisons are strict: a box exactly `min_width` wide is
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeFilter {
    /// Width must be strictly greater than this.
    pub min_width: u32,
    /// Height must be strictly greater than this.
    pub min_height: u32,
    /// When set, `width * height` must be strictly greater than this.
    ///
    /// Rejects jagged noise contours that pass the width and height
    /// tests individually but are small in aggregate.
    pub min_area: Option<u64>,
}

impl SizeFilter {
    /// Whether `bbox` passes every enabled threshold.
    #[must_use]
    pub fn accepts(&self, bbox: &BoundingBox) -> bool {
        bbox.width > self.min_width
            && bbox.height > self.min_height
            && self.min_area.is_none_or(|min| bbox.area() > min)
    }
}

impl Default for SizeFilter {
    fn default() -> Self {
        Self {
            min_width: 50,
            min_height: 10,
            min_area: None,
        }
    }
}

/// How candidate boxes that overlap earlier accepted boxes are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Accept every box that passes the size filter.
    #[default]
    Allow,
    /// Accept a box only if it intersects no previously accepted box.
    /// Greedy and order-dependent: see [`ContourOrder`].
    Suppress,
}

/// Order in which size-filtered candidates are offered to the
/// [`OverlapPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourOrder {
    /// Order in which the border follower discovered the contours
    /// (raster scan of each border's starting pixel).
    Discovery,
    /// Stable sort by the bounding box's top-left corner, row first.
    #[default]
    TopLeft,
}

/// Outline style for the annotated output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStyle {
    /// Outline color as RGB.
    pub color: [u8; 3],
    /// Outline thickness in pixels, drawn inward from the box border.
    pub thickness: u32,
}

impl RenderStyle {
    /// Pure green.
    pub const GREEN: [u8; 3] = [0, 255, 0];
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            color: Self::GREEN,
            thickness: 2,
        }
    }
}

/// Configuration for the detection pipeline.
///
/// The observed detector variants are points in this one space; see
/// [`simple`](Self::simple), [`dilated`](Self::dilated) and
/// [`non_overlapping`](Self::non_overlapping).
///
/// Canny thresholds are clamped rather than rejected (see
/// [`edge::clamp_thresholds`](crate::edge::clamp_thresholds)). Kernel
/// sizes and render thickness are checked by [`validate`](Self::validate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Gaussian kernel size (odd). `1` disables smoothing.
    pub blur_kernel_size: u32,

    /// Canny low threshold. Gradient magnitudes above this are edges
    /// only when connected to a strong edge.
    pub canny_low: f32,

    /// Canny high threshold. Gradient magnitudes above this are
    /// definite edges.
    pub canny_high: f32,

    /// Square structuring-element size for one dilation pass over the
    /// edge map, or `None` to skip dilation.
    pub dilation: Option<u32>,

    /// Minimum-size thresholds.
    pub size_filter: SizeFilter,

    /// Overlap handling between accepted boxes.
    pub overlap: OverlapPolicy,

    /// Candidate order fed to the overlap policy.
    pub contour_order: ContourOrder,

    /// Outline style for the annotated image.
    pub render: RenderStyle,
}

impl DetectionConfig {
    /// Default Gaussian kernel size.
    pub const DEFAULT_BLUR_KERNEL_SIZE: u32 = 5;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    /// Default dilation kernel size.
    pub const DEFAULT_DILATION_KERNEL_SIZE: u32 = 5;
    /// Largest accepted blur kernel.
    pub const MAX_BLUR_KERNEL_SIZE: u32 = 31;
    /// Largest accepted dilation kernel.
    pub const MAX_DILATION_KERNEL_SIZE: u32 = 255;

    /// Canny (50, 150), no dilation, `w > 50 && h > 10`, overlaps allowed.
    #[must_use]
    pub fn simple() -> Self {
        Self {
            dilation: None,
            ..Self::default()
        }
    }

    /// Canny (30, 100), 5x5 dilation, `w > 30 && h > 10 && area > 500`,
    /// overlaps allowed.
    #[must_use]
    pub fn dilated() -> Self {
        Self {
            canny_low: 30.0,
            canny_high: 100.0,
            dilation: Some(Self::DEFAULT_DILATION_KERNEL_SIZE),
            size_filter: SizeFilter {
                min_width: 30,
                min_height: 10,
                min_area: Some(500),
            },
            ..Self::default()
        }
    }

    /// Canny (50, 150), 5x5 dilation, `w > 50 && h > 10`, overlapping
    /// boxes suppressed.
    #[must_use]
    pub fn non_overlapping() -> Self {
        Self {
            overlap: OverlapPolicy::Suppress,
            ..Self::default()
        }
    }

    /// Check the invariants that cannot be fixed up by clamping.
    ///
    /// # Errors
    ///
    /// Returns [`DetectionError::InvalidConfig`] if a kernel size is
    /// zero, even, or too large, if the render thickness is zero, or if
    /// a Canny threshold is not finite.
    pub fn validate(&self) -> Result<(), DetectionError> {
        check_kernel("blur_kernel_size", self.blur_kernel_size, Self::MAX_BLUR_KERNEL_SIZE)?;
        if let Some(size) = self.dilation {
            check_kernel("dilation", size, Self::MAX_DILATION_KERNEL_SIZE)?;
        }
        if !self.canny_low.is_finite() || !self.canny_high.is_finite() {
            return Err(DetectionError::InvalidConfig(format!(
                "canny thresholds must be finite, got low={} high={}",
                self.canny_low, self.canny_high,
            )));
        }
        if self.render.thickness == 0 {
            return Err(DetectionError::InvalidConfig(
                "render thickness must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_kernel(name: &str, size: u32, max: u32) -> Result<(), DetectionError> {
    if size == 0 || size % 2 == 0 || size > max {
        return Err(DetectionError::InvalidConfig(format!(
            "{name} must be an odd size between 1 and {max}, got {size}",
        )));
    }
    Ok(())
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: Self::DEFAULT_BLUR_KERNEL_SIZE,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            dilation: Some(Self::DEFAULT_DILATION_KERNEL_SIZE),
            size_filter: SizeFilter::default(),
            overlap: OverlapPolicy::default(),
            contour_order: ContourOrder::default(),
            render: RenderStyle::default(),
        }
    }
}

/// Result of one detection run.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Accepted boxes in acceptance order.
    pub boxes: Vec<BoundingBox>,

    /// Copy of the decoded color image with every accepted box outlined.
    pub annotated: RgbImage,

    /// Dimensions of the source image in pixels.
    pub dimensions: Dimensions,
}

impl Detection {
    /// Reported length of each accepted box (its pixel width), in
    /// acceptance order.
    #[must_use]
    pub fn widths(&self) -> Vec<u32> {
        self.boxes.iter().map(|b| b.width).collect()
    }
}

/// Reasons an input cannot be turned into a pixel grid.
#[derive(Debug, thiserror::Error)]
pub enum InvalidImage {
    /// The input image data was empty.
    #[error("input image data is empty")]
    Empty,

    /// The input could not be read.
    #[error("cannot read image: {0}")]
    Unreadable(#[from] std::io::Error),

    /// The image format is unrecognized or the data is corrupt.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The image decoded to an empty pixel grid.
    #[error("image has zero dimensions ({width}x{height})")]
    ZeroDimensions {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
    },
}

/// Errors that can occur during detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// The input could not be decoded.
    #[error("invalid image: {0}")]
    InvalidImage(#[from] InvalidImage),

    /// Detection configuration is invalid.
    #[error("invalid detection configuration: {0}")]
    InvalidConfig(String),
}
