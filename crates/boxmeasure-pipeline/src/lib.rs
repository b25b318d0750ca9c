//! boxmeasure-pipeline: Contour-based object detection (sans-IO).
//!
//! Finds rectangular-ish objects in an image and measures their pixel
//! widths through:
//! decode -> grayscale -> blur -> Canny -> optional dilation ->
//! external contour tracing -> bounding boxes -> size filter ->
//! overlap policy -> outline rendering.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Reading input files and
//! writing the annotated image lives in `boxmeasure-io`.

pub mod blur;
pub mod contour;
pub mod diagnostics;
pub mod edge;
pub mod filter;
pub mod grayscale;
pub mod pipeline;
pub mod render;
pub mod types;

pub use diagnostics::{Clock, PipelineDiagnostics, detect_with_diagnostics};
pub use filter::FilterOutcome;
pub use pipeline::Pipeline;
pub use types::{
    BoundingBox, Contour, ContourOrder, Detection, DetectionConfig, DetectionError, Dimensions,
    GrayImage, InvalidImage, OverlapPolicy, Point, RenderStyle, RgbImage, SizeFilter,
};

/// Run the full detection pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration,
/// then produces a [`Detection`]: the accepted bounding boxes in
/// acceptance order and a copy of the image with each box outlined.
/// Finding nothing is not an error; the result simply has no boxes and
/// the annotated image equals the decoded input.
///
/// # Pipeline steps
///
/// 1. Validate the configuration
/// 2. Decode the image; keep a color copy and convert to grayscale
/// 3. Gaussian blur (noise reduction)
/// 4. Canny edge detection
/// 5. Optional dilation of the edge map
/// 6. External contour tracing
/// 7. Bounding boxes, size filter, overlap policy
/// 8. Outline accepted boxes on the color copy
///
/// # Errors
///
/// Returns [`DetectionError::InvalidConfig`] if `config` fails
/// [`DetectionConfig::validate`].
/// Returns [`DetectionError::InvalidImage`] if `image_bytes` is empty,
/// unrecognized, corrupt, or decodes to zero pixels.
pub fn detect(image_bytes: &[u8], config: &DetectionConfig) -> Result<Detection, DetectionError> {
    let detection = Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .preprocess()
        .detect_edges()
        .trace_contours()
        .filter()
        .render()
        .into_detection();
    tracing::debug!(objects = detection.boxes.len(), "detection complete");
    Ok(detection)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    fn uniform_png(width: u32, height: u32, value: u8) -> Vec<u8> {
        encode_png(&RgbImage::from_pixel(
            width,
            height,
            image::Rgb([value, value, value]),
        ))
    }

    /// Left half black, right half white: one long vertical edge and no
    /// closed object.
    fn sharp_edge_png(width: u32, height: u32) -> Vec<u8> {
        encode_png(&RgbImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        }))
    }

    #[test]
    fn detect_empty_input() {
        let result = detect(&[], &DetectionConfig::default());
        assert!(matches!(
            result,
            Err(DetectionError::InvalidImage(InvalidImage::Empty))
        ));
    }

    #[test]
    fn detect_corrupt_input() {
        let result = detect(&[0xFF, 0x00], &DetectionConfig::default());
        assert!(matches!(
            result,
            Err(DetectionError::InvalidImage(InvalidImage::Decode(_)))
        ));
    }

    #[test]
    fn detect_invalid_config() {
        let config = DetectionConfig {
            dilation: Some(4),
            ..DetectionConfig::default()
        };
        let result = detect(&uniform_png(10, 10, 255), &config);
        assert!(matches!(result, Err(DetectionError::InvalidConfig(_))));
    }

    #[test]
    fn uniform_image_has_no_objects_and_unchanged_output() {
        let png = uniform_png(40, 30, 128);
        let detection = detect(&png, &DetectionConfig::default()).unwrap();
        assert!(detection.boxes.is_empty());
        assert!(detection.widths().is_empty());
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(detection.annotated, decoded);
    }

    #[test]
    fn vertical_edge_alone_is_too_narrow() {
        // The edge spans the full height but is only a few pixels wide,
        // so the size filter rejects it.
        let detection = detect(&sharp_edge_png(60, 40), &DetectionConfig::default()).unwrap();
        assert!(detection.boxes.is_empty());
    }

    #[test]
    fn one_pixel_image_is_valid() {
        let detection = detect(&uniform_png(1, 1, 0), &DetectionConfig::default()).unwrap();
        assert!(detection.boxes.is_empty());
        assert_eq!(
            detection.dimensions,
            Dimensions {
                width: 1,
                height: 1
            }
        );
    }
}
