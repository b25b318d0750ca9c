//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! [`crate::detect`] runs every stage in one call. [`Pipeline`] lets the
//! caller drive execution one step at a time:
//!
//! ```rust
//! # use boxmeasure_pipeline::{DetectionConfig, DetectionError, Pipeline};
//! # fn run(png: Vec<u8>) -> Result<(), DetectionError> {
//! let edges = Pipeline::new(png, DetectionConfig::default())
//!     .decode()?
//!     .preprocess()
//!     .detect_edges();
//! println!("{} edge pixels", edges.edge_map().pixels().filter(|p| p.0[0] > 0).count());
//!
//! let detection = edges.trace_contours().filter().render().into_detection();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state,
//! carrying the intermediates later stages need. Only
//! [`decode`](Pending::decode) is fallible; every later stage is total,
//! and an image with no objects simply flows through with zero boxes.

use crate::diagnostics::StageMetrics;
use crate::filter::FilterOutcome;
use crate::types::{
    BoundingBox, Contour, Detection, DetectionConfig, DetectionError, Dimensions, GrayImage,
    RgbImage,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source image bytes and config are stored but not yet touched.
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing: call .decode() to continue"]
pub struct Pending {
    config: DetectionConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// The configuration this run will use.
    #[must_use]
    pub const fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Validate the config, decode the source image, and advance to the
    /// [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`DetectionError::InvalidConfig`] if the configuration
    /// fails [`DetectionConfig::validate`]. Returns
    /// [`DetectionError::InvalidImage`] if the source bytes are empty,
    /// corrupt, or decode to an empty pixel grid.
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = self.source.len()))]
    pub fn decode(self) -> Result<Decoded, DetectionError> {
        self.config.validate()?;
        let image = crate::grayscale::decode(&self.source)?;
        let original = crate::grayscale::to_rgb(&image);
        let dimensions = Dimensions {
            width: original.width(),
            height: original.height(),
        };
        tracing::debug!(width = dimensions.width, height = dimensions.height, "decoded");
        Ok(Decoded {
            config: self.config,
            input_bytes: self.source.len(),
            image,
            original,
            dimensions,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
///
/// Call [`preprocess`](Self::preprocess) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing: call .preprocess() to continue"]
pub struct Decoded {
    config: DetectionConfig,
    input_bytes: usize,
    image: image::DynamicImage,
    original: RgbImage,
    dimensions: Dimensions,
}

impl Decoded {
    /// The decoded color image. Boxes are drawn on a copy of this.
    #[must_use]
    pub const fn original(&self) -> &RgbImage {
        &self.original
    }

    /// Source image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Metrics for the decode stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Decode {
            input_bytes: self.input_bytes,
            width: self.dimensions.width,
            height: self.dimensions.height,
            pixel_count: self.dimensions.pixel_count(),
        }
    }

    /// Convert to grayscale, blur, and advance to the [`Preprocessed`]
    /// stage.
    #[tracing::instrument(level = "debug", skip_all, fields(kernel = self.config.blur_kernel_size))]
    pub fn preprocess(self) -> Preprocessed {
        let gray = crate::grayscale::to_grayscale(&self.image);
        let blurred = crate::blur::gaussian_blur(&gray, self.config.blur_kernel_size);
        Preprocessed {
            config: self.config,
            original: self.original,
            gray,
            blurred,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 2: Preprocessed ─────────────────────

/// Pipeline state after grayscale conversion and Gaussian blur.
///
/// Call [`detect_edges`](Self::detect_edges) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing: call .detect_edges() to continue"]
pub struct Preprocessed {
    config: DetectionConfig,
    original: RgbImage,
    gray: GrayImage,
    blurred: GrayImage,
    dimensions: Dimensions,
}

impl Preprocessed {
    /// The unblurred grayscale image.
    #[must_use]
    pub const fn grayscale(&self) -> &GrayImage {
        &self.gray
    }

    /// The blurred grayscale image that edge detection runs on.
    #[must_use]
    pub const fn blurred(&self) -> &GrayImage {
        &self.blurred
    }

    /// Metrics for grayscale conversion and blur.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Preprocess {
            width: self.dimensions.width,
            height: self.dimensions.height,
            kernel_size: self.config.blur_kernel_size,
            sigma: crate::blur::sigma_for_kernel(self.config.blur_kernel_size),
        }
    }

    /// Run Canny, optionally dilate, and advance to the [`EdgeMapped`]
    /// stage.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(low = self.config.canny_low, high = self.config.canny_high, dilation = ?self.config.dilation),
    )]
    pub fn detect_edges(self) -> EdgeMapped {
        let canny = crate::edge::canny(&self.blurred, self.config.canny_low, self.config.canny_high);
        let dilated = self
            .config
            .dilation
            .map(|kernel_size| crate::edge::dilate(&canny, kernel_size));
        tracing::debug!(
            edge_pixels = crate::diagnostics::count_edge_pixels(&canny),
            "edge map ready"
        );
        EdgeMapped {
            config: self.config,
            original: self.original,
            canny,
            dilated,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 3: EdgeMapped ───────────────────────

/// Pipeline state after edge detection (and optional dilation).
///
/// Call [`trace_contours`](Self::trace_contours) to advance to the next
/// stage.
#[must_use = "pipeline stages are consumed by advancing: call .trace_contours() to continue"]
pub struct EdgeMapped {
    config: DetectionConfig,
    original: RgbImage,
    canny: GrayImage,
    dilated: Option<GrayImage>,
    dimensions: Dimensions,
}

impl EdgeMapped {
    /// The Canny output before dilation.
    #[must_use]
    pub const fn canny(&self) -> &GrayImage {
        &self.canny
    }

    /// The dilated edge map, or `None` when dilation is disabled.
    #[must_use]
    pub const fn dilated(&self) -> Option<&GrayImage> {
        self.dilated.as_ref()
    }

    /// The edge map contour tracing runs on: the dilated map when
    /// dilation is enabled, otherwise the Canny output.
    #[must_use]
    pub fn edge_map(&self) -> &GrayImage {
        self.dilated.as_ref().unwrap_or(&self.canny)
    }

    /// Metrics for edge detection and dilation.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let (low_threshold, high_threshold) =
            crate::edge::clamp_thresholds(self.config.canny_low, self.config.canny_high);
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            edge_pixel_count: crate::diagnostics::count_edge_pixels(&self.canny),
            total_pixel_count: self.dimensions.pixel_count(),
            dilation_kernel: self.dilated.as_ref().and(self.config.dilation),
            dilated_edge_pixel_count: self
                .dilated
                .as_ref()
                .map(crate::diagnostics::count_edge_pixels),
        }
    }

    /// Trace external contours and advance to the [`ContoursTraced`]
    /// stage.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn trace_contours(self) -> ContoursTraced {
        let contours = crate::contour::trace_external(self.edge_map());
        tracing::debug!(contours = contours.len(), "traced external contours");
        ContoursTraced {
            config: self.config,
            original: self.original,
            contours,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 4: ContoursTraced ───────────────────

/// Pipeline state after contour tracing.
///
/// Call [`filter`](Self::filter) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing: call .filter() to continue"]
pub struct ContoursTraced {
    config: DetectionConfig,
    original: RgbImage,
    contours: Vec<Contour>,
    dimensions: Dimensions,
}

impl ContoursTraced {
    /// The traced external contours, in discovery order.
    #[must_use]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Metrics for contour tracing.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let stats = crate::diagnostics::contour_stats(&self.contours);
        StageMetrics::ContourTracing {
            contour_count: self.contours.len(),
            total_point_count: stats.total,
            min_contour_points: stats.min,
            max_contour_points: stats.max,
            mean_contour_points: stats.mean,
        }
    }

    /// Compute bounding boxes, apply the size filter and overlap policy,
    /// and advance to the [`Filtered`] stage.
    #[tracing::instrument(level = "debug", skip_all, fields(policy = ?self.config.overlap))]
    pub fn filter(self) -> Filtered {
        let outcome = crate::filter::filter_boxes(
            &self.contours,
            &self.config.size_filter,
            self.config.contour_order,
            self.config.overlap,
        );
        tracing::debug!(
            candidates = outcome.candidates,
            size_rejected = outcome.size_rejected,
            overlap_rejected = outcome.overlap_rejected,
            accepted = outcome.accepted.len(),
            "filtered bounding boxes"
        );
        Filtered {
            config: self.config,
            original: self.original,
            outcome,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 5: Filtered ─────────────────────────

/// Pipeline state after size filtering and overlap handling.
///
/// Call [`render`](Self::render) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing: call .render() to continue"]
pub struct Filtered {
    config: DetectionConfig,
    original: RgbImage,
    outcome: FilterOutcome,
    dimensions: Dimensions,
}

impl Filtered {
    /// Accepted boxes in acceptance order.
    #[must_use]
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.outcome.accepted
    }

    /// Full filter outcome including rejection counts.
    #[must_use]
    pub const fn outcome(&self) -> &FilterOutcome {
        &self.outcome
    }

    /// Metrics for box filtering.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Filtering {
            policy: self.config.overlap,
            candidates: self.outcome.candidates,
            size_rejected: self.outcome.size_rejected,
            overlap_rejected: self.outcome.overlap_rejected,
            accepted: self.outcome.accepted.len(),
        }
    }

    /// Draw the accepted boxes on a copy of the original and advance to
    /// the [`Rendered`] stage.
    #[tracing::instrument(level = "debug", skip_all, fields(boxes = self.outcome.accepted.len()))]
    pub fn render(self) -> Rendered {
        let annotated =
            crate::render::annotate(&self.original, &self.outcome.accepted, &self.config.render);
        Rendered {
            boxes: self.outcome.accepted,
            annotated,
            dimensions: self.dimensions,
            thickness: self.config.render.thickness,
        }
    }
}

// ───────────────────────── Stage 6: Rendered ─────────────────────────

/// Final pipeline state: boxes accepted and drawn.
#[must_use = "call .into_detection() to take the result"]
pub struct Rendered {
    boxes: Vec<BoundingBox>,
    annotated: RgbImage,
    dimensions: Dimensions,
    thickness: u32,
}

impl Rendered {
    /// Accepted boxes in acceptance order.
    #[must_use]
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// The annotated color image.
    #[must_use]
    pub const fn annotated(&self) -> &RgbImage {
        &self.annotated
    }

    /// Metrics for rendering.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Render {
            box_count: self.boxes.len(),
            thickness: self.thickness,
        }
    }

    /// Consume the pipeline and return the [`Detection`].
    #[must_use]
    pub fn into_detection(self) -> Detection {
        Detection {
            boxes: self.boxes,
            annotated: self.annotated,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Entry point for the incremental pipeline.
///
/// ```rust
/// # use boxmeasure_pipeline::{DetectionConfig, Pipeline};
/// let pending = Pipeline::new(Vec::new(), DetectionConfig::default());
/// assert!(pending.decode().is_err());
/// ```
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline in the [`Pending`] state.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(source: Vec<u8>, config: DetectionConfig) -> Pending {
        Pending { config, source }
    }
}
