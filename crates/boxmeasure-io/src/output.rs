//! Output path derivation and annotated-image encoding.

use std::path::{Path, PathBuf};

use boxmeasure_pipeline::RgbImage;
use image::ImageFormat;

use crate::MeasureError;

/// Where the annotated copy of `input` goes: `output_dir` joined with
/// the input's file name.
///
/// # Errors
///
/// Returns [`MeasureError::NoFileName`] if `input` ends in `..` or is a
/// root.
pub fn output_path(input: &Path, output_dir: &Path) -> Result<PathBuf, MeasureError> {
    let name = input
        .file_name()
        .ok_or_else(|| MeasureError::NoFileName(input.to_path_buf()))?;
    let path = output_dir.join(name);
    tracing::debug!(input = %input.display(), output = %path.display(), "derived output path");
    Ok(path)
}

/// Reject a `destination` that names the same file as `input`.
///
/// Both paths are compared after canonicalization, so `-o .` next to the
/// input or a path through a symlinked directory is caught. A
/// destination that does not exist yet cannot be the input.
///
/// # Errors
///
/// Returns [`MeasureError::OutputIsInput`] if both paths resolve to the
/// same file.
pub fn ensure_not_input(input: &Path, destination: &Path) -> Result<(), MeasureError> {
    match (std::fs::canonicalize(input), std::fs::canonicalize(destination)) {
        (Ok(a), Ok(b)) if a == b => Err(MeasureError::OutputIsInput(a)),
        _ => Ok(()),
    }
}

/// Format the annotated image is encoded in.
///
/// Taken from `path`'s extension when it names a known format, otherwise
/// sniffed from the original input bytes, otherwise PNG.
#[must_use]
pub fn output_format(path: &Path, source_bytes: &[u8]) -> ImageFormat {
    ImageFormat::from_path(path)
        .or_else(|_| image::guess_format(source_bytes))
        .unwrap_or(ImageFormat::Png)
}

/// Encode `image` and write it to `path`, creating the parent directory
/// if needed. An existing file at `path` is replaced.
///
/// # Errors
///
/// Returns [`MeasureError::CreateOutputDir`] if the parent directory
/// cannot be created, or [`MeasureError::WriteOutput`] if encoding or
/// writing fails (including formats this build cannot encode).
pub fn write_annotated(
    image: &RgbImage,
    path: &Path,
    source_bytes: &[u8],
) -> Result<(), MeasureError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| MeasureError::CreateOutputDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let format = output_format(path, source_bytes);
    image
        .save_with_format(path, format)
        .map_err(|source| MeasureError::WriteOutput {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(path = %path.display(), ?format, "wrote annotated image");
    Ok(())
}
