//! Bounding-box extraction, size filtering, and overlap handling.
//!
//! Each traced contour becomes one candidate box. Candidates that fail
//! the [`SizeFilter`] are dropped, the survivors are put in
//! [`ContourOrder`], and the [`OverlapPolicy`] decides greedily which of
//! them are accepted.

use serde::{Deserialize, Serialize};

use crate::types::{BoundingBox, Contour, ContourOrder, OverlapPolicy, SizeFilter};

/// Outcome of filtering one image's contours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOutcome {
    /// Accepted boxes in acceptance order.
    pub accepted: Vec<BoundingBox>,
    /// Number of candidate boxes considered (one per non-empty contour).
    pub candidates: usize,
    /// Candidates rejected by the size filter.
    pub size_rejected: usize,
    /// Size-filtered candidates rejected because they intersect an
    /// earlier accepted box. Always zero under [`OverlapPolicy::Allow`].
    pub overlap_rejected: usize,
}

/// Compute bounding boxes for `contours` and decide which are accepted.
///
/// Every accepted box passes `size_filter`. Under
/// [`OverlapPolicy::Suppress`] no two accepted boxes intersect; the
/// check runs against boxes accepted so far, so the result depends on
/// `order`.
#[must_use]
pub fn filter_boxes(
    contours: &[Contour],
    size_filter: &SizeFilter,
    order: ContourOrder,
    policy: OverlapPolicy,
) -> FilterOutcome {
    let boxes: Vec<BoundingBox> = contours.iter().filter_map(Contour::bounding_box).collect();
    let candidates = boxes.len();

    let mut sized: Vec<BoundingBox> = boxes.into_iter().filter(|b| size_filter.accepts(b)).collect();
    let size_rejected = candidates - sized.len();

    if order == ContourOrder::TopLeft {
        sized.sort_by_key(|b| (b.y, b.x));
    }

    let mut accepted: Vec<BoundingBox> = Vec::with_capacity(sized.len());
    let mut overlap_rejected = 0;
    for candidate in sized {
        let clear = match policy {
            OverlapPolicy::Allow => true,
            OverlapPolicy::Suppress => !accepted.iter().any(|a| a.intersects(&candidate)),
        };
        if clear {
            accepted.push(candidate);
        } else {
            overlap_rejected += 1;
        }
    }

    FilterOutcome {
        accepted,
        candidates,
        size_rejected,
        overlap_rejected,
    }
}
