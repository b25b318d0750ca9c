//! boxmeasure-io: Filesystem shell around the detection pipeline.
//!
//! Reads the input image from disk, runs
//! [`boxmeasure_pipeline::detect`], and writes the annotated image to
//! `<output_dir>/<input file name>`. All pixel work happens in the
//! pipeline crate; this crate only moves bytes and maps errors.

pub mod config;
pub mod output;

use std::path::{Path, PathBuf};

use boxmeasure_pipeline::{
    BoundingBox, Clock, Detection, DetectionConfig, DetectionError, Dimensions, InvalidImage,
    PipelineDiagnostics,
};
use serde::{Deserialize, Serialize};

pub use config::load_config;
pub use output::{ensure_not_input, output_path, write_annotated};

/// Errors from a file-level measurement run.
#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    /// The input is missing, unreadable, empty, or not a decodable image.
    #[error("invalid image {}: {source}", path.display())]
    InvalidImage {
        /// Path of the offending input.
        path: PathBuf,
        /// What was wrong with it.
        source: InvalidImage,
    },

    /// Detection configuration is invalid.
    #[error("invalid detection configuration: {0}")]
    InvalidConfig(String),

    /// The input path has no final file-name component to reuse for the
    /// output.
    #[error("input path has no file name: {}", .0.display())]
    NoFileName(PathBuf),

    /// The output path resolves to the input file itself.
    #[error("output would overwrite the input image {}; choose another output directory", .0.display())]
    OutputIsInput(PathBuf),

    /// The output directory could not be created.
    #[error("cannot create output directory {}: {source}", path.display())]
    CreateOutputDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Encoding or writing the annotated image failed.
    #[error("cannot write annotated image {}: {source}", path.display())]
    WriteOutput {
        /// Destination path.
        path: PathBuf,
        /// Underlying encode or I/O error.
        source: image::ImageError,
    },

    /// The configuration file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`DetectionConfig`].
    #[error("cannot parse config {}: {source}", path.display())]
    ConfigParse {
        /// Config file path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

impl MeasureError {
    /// Attach the input `path` to a pipeline error.
    #[must_use]
    pub fn from_detection(path: &Path, err: DetectionError) -> Self {
        match err {
            DetectionError::InvalidImage(source) => Self::InvalidImage {
                path: path.to_path_buf(),
                source,
            },
            DetectionError::InvalidConfig(msg) => Self::InvalidConfig(msg),
        }
    }
}

/// Outcome of measuring one image file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Where the annotated image was written.
    pub output_path: PathBuf,
    /// Accepted boxes in acceptance order.
    pub boxes: Vec<BoundingBox>,
    /// Source image dimensions.
    pub dimensions: Dimensions,
}

impl DetectionResult {
    /// Reported length of each accepted box (its pixel width), in
    /// acceptance order.
    #[must_use]
    pub fn widths(&self) -> Vec<u32> {
        self.boxes.iter().map(|b| b.width).collect()
    }
}

/// Measure objects in the image at `input`.
///
/// The annotated copy is written to `output_dir` under the input's file
/// name, replacing any earlier output with that name. Nothing is written
/// when the input is invalid.
///
/// # Errors
///
/// Returns [`MeasureError::NoFileName`] if `input` has no file name,
/// [`MeasureError::OutputIsInput`] if the output path is the input file,
/// [`MeasureError::InvalidImage`] if it cannot be read or decoded,
/// [`MeasureError::InvalidConfig`] if `config` is invalid, and
/// [`MeasureError::CreateOutputDir`] or [`MeasureError::WriteOutput`] if
/// the annotated image cannot be written.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(input = %input.display(), output_dir = %output_dir.display()),
)]
pub fn measure_file(
    input: &Path,
    output_dir: &Path,
    config: &DetectionConfig,
) -> Result<DetectionResult, MeasureError> {
    let (destination, bytes) = read_input(input, output_dir)?;
    let detection = boxmeasure_pipeline::detect(&bytes, config)
        .map_err(|e| MeasureError::from_detection(input, e))?;
    finish(&bytes, destination, detection)
}

/// Same as [`measure_file`], additionally timing every pipeline stage
/// with `clock`.
///
/// # Errors
///
/// Same as [`measure_file`].
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(input = %input.display(), output_dir = %output_dir.display()),
)]
pub fn measure_file_with_diagnostics<C: Clock>(
    input: &Path,
    output_dir: &Path,
    config: &DetectionConfig,
    clock: &C,
) -> Result<(DetectionResult, PipelineDiagnostics), MeasureError> {
    let (destination, bytes) = read_input(input, output_dir)?;
    let (detection, diagnostics) =
        boxmeasure_pipeline::detect_with_diagnostics(&bytes, config, clock)
            .map_err(|e| MeasureError::from_detection(input, e))?;
    Ok((finish(&bytes, destination, detection)?, diagnostics))
}

/// Measure objects in an in-memory image whose original file name is
/// `file_name`.
///
/// Behaves like [`measure_file`] without the read: the annotated copy is
/// written to `output_dir` under the final component of `file_name`.
///
/// # Errors
///
/// Same as [`measure_file`], except that no read error can occur.
pub fn measure_bytes(
    bytes: &[u8],
    file_name: &Path,
    output_dir: &Path,
    config: &DetectionConfig,
) -> Result<DetectionResult, MeasureError> {
    let destination = output_path(file_name, output_dir)?;
    let detection = boxmeasure_pipeline::detect(bytes, config)
        .map_err(|e| MeasureError::from_detection(file_name, e))?;
    finish(bytes, destination, detection)
}

/// Derive the output path for `input` and read its bytes.
fn read_input(input: &Path, output_dir: &Path) -> Result<(PathBuf, Vec<u8>), MeasureError> {
    let destination = output_path(input, output_dir)?;
    ensure_not_input(input, &destination)?;
    let bytes = std::fs::read(input).map_err(|e| MeasureError::InvalidImage {
        path: input.to_path_buf(),
        source: InvalidImage::Unreadable(e),
    })?;
    Ok((destination, bytes))
}

/// Write the annotated image and package the result.
fn finish(
    bytes: &[u8],
    destination: PathBuf,
    detection: Detection,
) -> Result<DetectionResult, MeasureError> {
    write_annotated(&detection.annotated, &destination, bytes)?;
    Ok(DetectionResult {
        output_path: destination,
        boxes: detection.boxes,
        dimensions: detection.dimensions,
    })
}
