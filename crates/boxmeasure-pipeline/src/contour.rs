//! Contour tracing: extract outermost object borders from a binary edge map.
//!
//! Border following is done by `imageproc::contours::find_contours`
//! (Suzuki-Abe), which reports every border with its place in the
//! nesting hierarchy. Only outer borders with no enclosing border are
//! kept, so a hollow outline yields one contour rather than an outer
//! and an inner ring.
//!
//! `find_contours` only starts an outer border at a pixel whose left
//! neighbour lies inside the image, so a region touching column 0 is
//! missed or reported as a hole. The edge map is traced inside a
//! one-pixel zero frame and the points shifted back afterwards.

use image::GrayImage;
use imageproc::contours::BorderType;

use crate::types::{Contour, Point};

/// Trace the external contours of all foreground regions in `edges`.
///
/// Any non-zero pixel counts as foreground. Regions touching the image
/// border are traced like any other. Contours are returned in discovery
/// order: the raster-scan order of each border's starting pixel.
#[must_use = "returns the traced contours"]
pub fn trace_external(edges: &GrayImage) -> Vec<Contour> {
    let framed = with_zero_frame(edges);
    let borders: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(&framed);

    borders
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| {
            // Foreground never lies on the frame, so every point is >= 1.
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new(p.x.saturating_sub(1), p.y.saturating_sub(1)))
                .collect();
            Contour::new(points)
        })
        .filter(|c| !c.is_empty())
        .collect()
}

/// Copy `edges` into the centre of an image one pixel larger on every
/// side, with the frame set to background.
fn with_zero_frame(edges: &GrayImage) -> GrayImage {
    let (width, height) = edges.dimensions();
    let mut framed = GrayImage::new(width + 2, height + 2);
    for (x, y, pixel) in edges.enumerate_pixels() {
        framed.put_pixel(x + 1, y + 1, *pixel);
    }
    framed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn fill(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
    }

    fn outline(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for x in x0..x0 + w {
            img.put_pixel(x, y0, image::Luma([255]));
            img.put_pixel(x, y0 + h - 1, image::Luma([255]));
        }
        for y in y0..y0 + h {
            img.put_pixel(x0, y, image::Luma([255]));
            img.put_pixel(x0 + w - 1, y, image::Luma([255]));
        }
    }

    #[test]
    fn empty_image_produces_no_contours() {
        assert!(trace_external(&GrayImage::new(10, 10)).is_empty());
    }

    #[test]
    fn single_pixel_is_one_contour() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(5, 5, image::Luma([255]));
        let contours = trace_external(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].bounding_box().unwrap(),
            BoundingBox::new(5, 5, 1, 1)
        );
    }

    #[test]
    fn filled_rectangle_bounds_match() {
        let mut img = GrayImage::new(40, 30);
        fill(&mut img, 5, 6, 20, 10);
        let contours = trace_external(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].bounding_box().unwrap(),
            BoundingBox::new(5, 6, 20, 10)
        );
    }

    #[test]
    fn hollow_outline_yields_only_outer_border() {
        let mut img = GrayImage::new(40, 30);
        outline(&mut img, 5, 5, 25, 15);
        let contours = trace_external(&img);
        assert_eq!(contours.len(), 1, "inner hole border must be dropped");
        assert_eq!(
            contours[0].bounding_box().unwrap(),
            BoundingBox::new(5, 5, 25, 15)
        );
    }

    #[test]
    fn nested_shape_inside_outline_is_dropped() {
        let mut img = GrayImage::new(60, 60);
        outline(&mut img, 2, 2, 50, 50);
        fill(&mut img, 20, 20, 5, 5);
        let contours = trace_external(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].bounding_box().unwrap(),
            BoundingBox::new(2, 2, 50, 50)
        );
    }

    #[test]
    fn separate_regions_are_separate_contours() {
        let mut img = GrayImage::new(60, 20);
        fill(&mut img, 2, 2, 10, 10);
        fill(&mut img, 30, 5, 10, 10);
        let contours = trace_external(&img);
        assert_eq!(contours.len(), 2);
        // Discovery order follows the raster scan: the higher region first.
        assert_eq!(contours[0].bounding_box().unwrap().x, 2);
        assert_eq!(contours[1].bounding_box().unwrap().x, 30);
    }

    #[test]
    fn region_touching_image_border_is_traced() {
        let mut img = GrayImage::new(20, 20);
        fill(&mut img, 0, 0, 20, 4);
        let contours = trace_external(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].bounding_box().unwrap(),
            BoundingBox::new(0, 0, 20, 4)
        );
    }

    #[test]
    fn region_in_first_column_is_traced() {
        let mut img = GrayImage::new(20, 20);
        fill(&mut img, 0, 5, 4, 10);
        let contours = trace_external(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].bounding_box().unwrap(),
            BoundingBox::new(0, 5, 4, 10)
        );
    }

    #[test]
    fn region_filling_whole_image_is_traced() {
        let mut img = GrayImage::new(8, 6);
        fill(&mut img, 0, 0, 8, 6);
        let contours = trace_external(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].bounding_box().unwrap(),
            BoundingBox::new(0, 0, 8, 6)
        );
    }

    #[test]
    fn outline_flush_with_left_edge_keeps_only_outer_border() {
        let mut img = GrayImage::new(40, 30);
        outline(&mut img, 0, 4, 25, 15);
        fill(&mut img, 10, 10, 3, 3);
        let contours = trace_external(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].bounding_box().unwrap(),
            BoundingBox::new(0, 4, 25, 15)
        );
    }

    #[test]
    fn framing_leaves_coordinates_unchanged() {
        let mut img = GrayImage::new(30, 30);
        fill(&mut img, 29, 29, 1, 1);
        fill(&mut img, 0, 0, 1, 1);
        let boxes: Vec<_> = trace_external(&img)
            .iter()
            .map(|c| c.bounding_box().unwrap())
            .collect();
        assert_eq!(
            boxes,
            vec![BoundingBox::new(0, 0, 1, 1), BoundingBox::new(29, 29, 1, 1)]
        );
    }
}
