//! Draw accepted bounding boxes onto the color image.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::types::{BoundingBox, RenderStyle};

/// Outline every box in `boxes` on `canvas`.
///
/// Each outline is `style.thickness` one-pixel rings, the outermost on
/// the box border and the rest stepping inward. Rings that would have
/// no interior are skipped, and drawing is clipped to the canvas.
pub fn draw_boxes(canvas: &mut RgbImage, boxes: &[BoundingBox], style: &RenderStyle) {
    let color = Rgb(style.color);
    for bbox in boxes {
        for ring in 0..style.thickness {
            let Some(rect) = ring_rect(bbox, ring) else {
                break;
            };
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }
}

/// Copy of `source` with every box outlined.
///
/// With no boxes the copy is pixel-identical to `source`.
#[must_use = "returns the annotated image"]
pub fn annotate(source: &RgbImage, boxes: &[BoundingBox], style: &RenderStyle) -> RgbImage {
    let mut canvas = source.clone();
    draw_boxes(&mut canvas, boxes, style);
    canvas
}

/// The `ring`-th inset of `bbox`, or `None` once the inset is empty or
/// off the `i32` drawing grid.
fn ring_rect(bbox: &BoundingBox, ring: u32) -> Option<Rect> {
    let inset = ring.checked_mul(2)?;
    let width = bbox.width.checked_sub(inset).filter(|w| *w > 0)?;
    let height = bbox.height.checked_sub(inset).filter(|h| *h > 0)?;
    let left = i32::try_from(bbox.x.checked_add(ring)?).ok()?;
    let top = i32::try_from(bbox.y.checked_add(ring)?).ok()?;
    Some(Rect::at(left, top).of_size(width, height))
}
