//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! threshold tuning and parameter experimentation.
//! [`detect_with_diagnostics`] drives the same [`Pipeline`] typestate
//! chain as [`detect`](crate::detect), timing each transition and
//! recording the metrics the resulting stage reports.
//!
//! Time comes from a caller-supplied [`Clock`], so this crate never reads
//! the system clock itself. Durations are serialized as fractional
//! seconds (`f64`) for JSON compatibility, since `std::time::Duration`
//! does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::types::{Contour, Detection, DetectionConfig, DetectionError, GrayImage, OverlapPolicy};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of wall-clock time for stage measurements.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
///
/// Each field captures one transition of the [`Pipeline`] typestate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Config validation and image decoding.
    pub decode: StageDiagnostics,
    /// Grayscale conversion and Gaussian blur.
    pub preprocess: StageDiagnostics,
    /// Canny edge detection and optional dilation.
    pub edge_detection: StageDiagnostics,
    /// External contour tracing.
    pub contour_tracing: StageDiagnostics,
    /// Bounding boxes, size filter, and overlap policy.
    pub filtering: StageDiagnostics,
    /// Drawing accepted boxes.
    pub render: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Grayscale conversion and blur metrics.
    Preprocess {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Blur kernel size.
        kernel_size: u32,
        /// Sigma derived from the kernel size.
        sigma: f32,
    },
    /// Canny edge detection and dilation metrics.
    EdgeDetection {
        /// Low threshold (after clamping).
        low_threshold: f32,
        /// High threshold (after clamping).
        high_threshold: f32,
        /// Number of Canny edge pixels (value == 255).
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
        /// Dilation structuring-element size, `None` when disabled.
        dilation_kernel: Option<u32>,
        /// Number of edge pixels after dilation, `None` when disabled.
        dilated_edge_pixel_count: Option<u64>,
    },
    /// Contour tracing metrics.
    ContourTracing {
        /// Number of external contours found.
        contour_count: usize,
        /// Total number of points across all contours.
        total_point_count: usize,
        /// Minimum points in any single contour.
        min_contour_points: usize,
        /// Maximum points in any single contour.
        max_contour_points: usize,
        /// Mean points per contour.
        mean_contour_points: f64,
    },
    /// Box filtering metrics.
    Filtering {
        /// Overlap policy applied.
        policy: OverlapPolicy,
        /// Candidate boxes considered.
        candidates: usize,
        /// Candidates rejected by the size filter.
        size_rejected: usize,
        /// Candidates rejected for intersecting an accepted box.
        overlap_rejected: usize,
        /// Boxes accepted.
        accepted: usize,
    },
    /// Rendering metrics.
    Render {
        /// Boxes drawn.
        box_count: usize,
        /// Outline thickness in pixels.
        thickness: u32,
    },
}

/// High-level summary for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of external contours found.
    pub contour_count: usize,
    /// Number of accepted objects.
    pub object_count: usize,
    /// Widths of accepted objects in acceptance order.
    pub widths: Vec<u32>,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let stages = [
            ("Decode", &self.decode),
            ("Preprocess", &self.preprocess),
            ("Edge Detection", &self.edge_detection),
            ("Contour Tracing", &self.contour_tracing),
            ("Filtering", &self.filtering),
            ("Render", &self.render),
        ];

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Objects: {}  |  Widths: {:?}",
            self.summary.contour_count, self.summary.object_count, self.summary.widths,
        ));

        lines.join("\n")
    }
}

/// Run the full detection pipeline, timing every stage with `clock`.
///
/// Produces the same [`Detection`] as [`detect`](crate::detect) for the
/// same input and config.
///
/// # Errors
///
/// Same as [`detect`](crate::detect).
pub fn detect_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &DetectionConfig,
    clock: &C,
) -> Result<(Detection, PipelineDiagnostics), DetectionError> {
    let total_start = clock.now();

    let (decoded, duration) = timed(clock, || {
        Pipeline::new(image_bytes.to_vec(), config.clone()).decode()
    });
    let decoded = decoded?;
    let decode = stage(duration, decoded.metrics());
    let dimensions = decoded.dimensions();

    let (preprocessed, duration) = timed(clock, || decoded.preprocess());
    let preprocess = stage(duration, preprocessed.metrics());

    let (edges, duration) = timed(clock, || preprocessed.detect_edges());
    let edge_detection = stage(duration, edges.metrics());

    let (traced, duration) = timed(clock, || edges.trace_contours());
    let contour_tracing = stage(duration, traced.metrics());
    let contour_count = traced.contours().len();

    let (filtered, duration) = timed(clock, || traced.filter());
    let filtering = stage(duration, filtered.metrics());

    let (rendered, duration) = timed(clock, || filtered.render());
    let render = stage(duration, rendered.metrics());

    let total_duration = clock.elapsed(&total_start);

    let detection = rendered.into_detection();
    let summary = PipelineSummary {
        image_width: dimensions.width,
        image_height: dimensions.height,
        pixel_count: dimensions.pixel_count(),
        contour_count,
        object_count: detection.boxes.len(),
        widths: detection.widths(),
    };
    tracing::debug!(
        objects = summary.object_count,
        total_ms = duration_ms(total_duration),
        "detection with diagnostics complete"
    );

    Ok((
        detection,
        PipelineDiagnostics {
            decode,
            preprocess,
            edge_detection,
            contour_tracing,
            filtering,
            render,
            total_duration,
            summary,
        },
    ))
}

const fn stage(duration: Duration, metrics: StageMetrics) -> StageDiagnostics {
    StageDiagnostics { duration, metrics }
}

/// Run `f` and measure how long it took.
fn timed<C: Clock, T>(clock: &C, f: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let value = f();
    (value, clock.elapsed(&start))
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => {
            format!("{input_bytes} bytes -> {width}x{height}")
        }
        StageMetrics::Preprocess {
            width,
            height,
            kernel_size,
            sigma,
        } => format!("{width}x{height} blur {kernel_size}x{kernel_size} sigma={sigma:.2}"),
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
            dilation_kernel,
            dilated_edge_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            let mut details = format!(
                "low={low_threshold:.1} high={high_threshold:.1} edges={edge_pixel_count} ({density:.1}%)",
            );
            if let (Some(k), Some(dilated)) = (dilation_kernel, dilated_edge_pixel_count) {
                details.push_str(&format!(" dilate {k}x{k} -> {dilated}"));
            }
            details
        }
        StageMetrics::ContourTracing {
            contour_count,
            total_point_count,
            min_contour_points,
            max_contour_points,
            mean_contour_points,
        } => {
            format!(
                "{contour_count} contours, {total_point_count} pts (min={min_contour_points} max={max_contour_points} mean={mean_contour_points:.1})",
            )
        }
        StageMetrics::Filtering {
            policy,
            candidates,
            size_rejected,
            overlap_rejected,
            accepted,
        } => {
            format!(
                "{policy:?} {candidates} candidates, -{size_rejected} size, -{overlap_rejected} overlap, {accepted} accepted",
            )
        }
        StageMetrics::Render {
            box_count,
            thickness,
        } => format!("{box_count} boxes, {thickness}px"),
    }
}

/// Count edge pixels (value == 255) in a grayscale image.
pub(crate) fn count_edge_pixels(image: &GrayImage) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(u8::from(p.0[0] == 255)))
        .sum()
}

/// Point-count statistics for a set of contours.
pub(crate) struct ContourStats {
    /// Total number of points across all contours.
    pub total: usize,
    /// Minimum number of points in any single contour.
    pub min: usize,
    /// Maximum number of points in any single contour.
    pub max: usize,
    /// Mean number of points per contour.
    pub mean: f64,
}

/// Compute point-count statistics from a set of contours.
pub(crate) fn contour_stats(contours: &[Contour]) -> ContourStats {
    let total: usize = contours.iter().map(Contour::len).sum();
    let min = contours.iter().map(Contour::len).min().unwrap_or(0);
    let max = contours.iter().map(Contour::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if contours.is_empty() {
        0.0
    } else {
        total as f64 / contours.len() as f64
    };
    ContourStats {
        total,
        min,
        max,
        mean,
    }
}
