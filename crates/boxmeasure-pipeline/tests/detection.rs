//! Integration tests: synthetic scenes through the full detection pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Cursor;

use boxmeasure_pipeline::{
    BoundingBox, DetectionConfig, DetectionError, InvalidImage, OverlapPolicy, RgbImage, detect,
};

const WHITE: image::Rgb<u8> = image::Rgb([255, 255, 255]);
const BLACK: image::Rgb<u8> = image::Rgb([0, 0, 0]);

/// White canvas with each `(x, y, w, h)` filled black.
fn scene(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> RgbImage {
    RgbImage::from_fn(width, height, |px, py| {
        let inside = rects
            .iter()
            .any(|&(x, y, w, h)| (x..x + w).contains(&px) && (y..y + h).contains(&py));
        if inside { BLACK } else { WHITE }
    })
}

fn encode(img: &RgbImage, format: image::ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn png(img: &RgbImage) -> Vec<u8> {
    encode(img, image::ImageFormat::Png)
}

fn presets() -> [DetectionConfig; 4] {
    [
        DetectionConfig::default(),
        DetectionConfig::simple(),
        DetectionConfig::dilated(),
        DetectionConfig::non_overlapping(),
    ]
}

fn assert_pairwise_disjoint(boxes: &[BoundingBox]) {
    for (i, a) in boxes.iter().enumerate() {
        for b in &boxes[i + 1..] {
            assert!(!a.intersects(b), "{a:?} intersects {b:?}");
        }
    }
}

/// An L-shaped object whose bounding box encloses a separate small
/// rectangle without touching it.
fn l_shape_with_inset() -> Vec<u8> {
    png(&scene(
        220,
        150,
        &[
            (20, 20, 15, 100),  // vertical bar of the L
            (20, 105, 160, 15), // horizontal bar of the L
            (80, 40, 60, 20),   // free-standing rectangle
        ],
    ))
}

#[test]
fn single_rectangle_measures_its_width() {
    let bytes = png(&scene(240, 120, &[(70, 40, 100, 40)]));
    let detection = detect(&bytes, &DetectionConfig::default()).unwrap();
    assert_eq!(detection.boxes.len(), 1, "{:?}", detection.boxes);
    let width = detection.widths()[0];
    assert!((96..=110).contains(&width), "width {width}");
}

#[test]
fn two_separated_rectangles_under_suppression() {
    let bytes = png(&scene(
        240,
        100,
        &[(40, 40, 60, 20), (120, 40, 60, 20)],
    ));
    let detection = detect(&bytes, &DetectionConfig::non_overlapping()).unwrap();
    assert_eq!(detection.boxes.len(), 2, "{:?}", detection.boxes);
    for width in detection.widths() {
        assert!((56..=70).contains(&width), "width {width}");
    }
    assert!(!detection.boxes[0].intersects(&detection.boxes[1]));
    // Top-left order: the left rectangle is accepted first.
    assert!(detection.boxes[0].x < detection.boxes[1].x);
}

#[test]
fn blank_image_yields_nothing_and_identical_output() {
    let img = RgbImage::from_pixel(120, 80, image::Rgb([200, 180, 40]));
    let bytes = png(&img);
    for config in presets() {
        let detection = detect(&bytes, &config).unwrap();
        assert!(detection.boxes.is_empty());
        assert_eq!(detection.annotated, img);
    }
}

#[test]
fn zero_byte_input_is_invalid_image() {
    let err = detect(&[], &DetectionConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        DetectionError::InvalidImage(InvalidImage::Empty)
    ));
}

#[test]
fn every_box_passes_the_size_filter() {
    let bytes = png(&scene(
        300,
        200,
        &[
            (10, 10, 100, 40),
            (150, 10, 30, 30), // too narrow for every preset
            (10, 100, 45, 12), // passes w > 30 only without the area test
            (120, 120, 150, 50),
            (200, 80, 5, 5),
        ],
    ));
    for config in presets() {
        let detection = detect(&bytes, &config).unwrap();
        assert!(!detection.boxes.is_empty());
        for b in &detection.boxes {
            assert!(config.size_filter.accepts(b), "{b:?} under {config:?}");
        }
    }
}

#[test]
fn suppression_removes_enclosed_box_and_allow_keeps_it() {
    let bytes = l_shape_with_inset();

    let allow = detect(&bytes, &DetectionConfig::default()).unwrap();
    let suppress = detect(&bytes, &DetectionConfig::non_overlapping()).unwrap();

    assert_eq!(allow.boxes.len(), 2, "{:?}", allow.boxes);
    assert_eq!(suppress.boxes.len(), 1, "{:?}", suppress.boxes);
    assert!(allow.boxes.len() >= suppress.boxes.len());
    assert_pairwise_disjoint(&suppress.boxes);
    // The L comes first in top-left order and wins.
    assert!(suppress.widths()[0] > 150);
}

#[test]
fn discovery_order_is_also_disjoint_under_suppression() {
    let config = DetectionConfig {
        contour_order: boxmeasure_pipeline::ContourOrder::Discovery,
        overlap: OverlapPolicy::Suppress,
        ..DetectionConfig::default()
    };
    let detection = detect(&l_shape_with_inset(), &config).unwrap();
    assert!(!detection.boxes.is_empty());
    assert_pairwise_disjoint(&detection.boxes);
}

#[test]
fn detection_is_idempotent() {
    let bytes = l_shape_with_inset();
    for config in presets() {
        let first = detect(&bytes, &config).unwrap();
        let second = detect(&bytes, &config).unwrap();
        assert_eq!(first.widths(), second.widths());
        assert_eq!(first.boxes, second.boxes);
        assert_eq!(first.annotated, second.annotated);
    }
}

#[test]
fn accepted_boxes_are_outlined_in_green() {
    let img = scene(240, 120, &[(70, 40, 100, 40)]);
    let detection = detect(&png(&img), &DetectionConfig::default()).unwrap();
    let b = detection.boxes[0];
    assert_eq!(detection.annotated.get_pixel(b.x, b.y).0, [0, 255, 0]);
    assert_eq!(
        detection
            .annotated
            .get_pixel(b.x + b.width - 1, b.y + b.height - 1)
            .0,
        [0, 255, 0]
    );
    // Far from the box the image is untouched.
    assert_eq!(*detection.annotated.get_pixel(5, 5), WHITE);
}

#[test]
fn bmp_input_matches_png_input() {
    let img = scene(240, 120, &[(70, 40, 100, 40)]);
    let from_png = detect(&png(&img), &DetectionConfig::default()).unwrap();
    let from_bmp = detect(
        &encode(&img, image::ImageFormat::Bmp),
        &DetectionConfig::default(),
    )
    .unwrap();
    assert_eq!(from_png.boxes, from_bmp.boxes);
}

#[test]
fn rectangle_flush_with_left_edge_is_detected() {
    let bytes = png(&scene(200, 100, &[(0, 30, 100, 40)]));
    for config in [DetectionConfig::default(), DetectionConfig::simple()] {
        let detection = detect(&bytes, &config).unwrap();
        assert_eq!(detection.boxes.len(), 1, "{:?}", detection.boxes);
        let b = detection.boxes[0];
        assert!(b.x <= 1, "{b:?}");
        assert!((96..=110).contains(&b.width), "{b:?}");
    }
}

#[test]
fn rectangle_in_top_left_corner_is_detected() {
    let bytes = png(&scene(200, 100, &[(0, 0, 100, 40)]));
    let detection = detect(&bytes, &DetectionConfig::default()).unwrap();
    assert_eq!(detection.boxes.len(), 1, "{:?}", detection.boxes);
    let b = detection.boxes[0];
    assert!(b.x <= 1 && b.y <= 1, "{b:?}");
    assert!((96..=110).contains(&b.width), "{b:?}");
}
