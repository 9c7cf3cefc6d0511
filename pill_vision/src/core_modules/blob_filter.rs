// THEORY:
// Not every component is a pill. Tiny ones are sensor noise or crumbs that
// slipped through the blur; enormous ones are patches of tray the binarizer put
// on the wrong side. The filter keeps only blobs strictly between two bounds.
//
// The lower bound scales with resolution (`max(floor, area / divisor)`) so that
// a 12 MP photo and a 0.3 MP preview reject noise at comparable physical sizes.
// The upper bound is a fixed fraction of the frame.

use crate::core_modules::blob::Blob;
use tracing::debug;

/// Size bounds for plausible pills, both exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeBounds {
    pub min_size: f64,
    pub max_size: f64,
}

impl SizeBounds {
    /// Bounds for an image of `width` x `height`.
    pub fn for_image(
        width: u32,
        height: u32,
        min_floor: f64,
        min_area_divisor: f64,
        max_area_fraction: f64,
    ) -> Self {
        let area = width as f64 * height as f64;
        Self {
            min_size: min_floor.max(area / min_area_divisor),
            max_size: max_area_fraction * area,
        }
    }

    pub fn admits(&self, pixel_count: usize) -> bool {
        let size = pixel_count as f64;
        size > self.min_size && size < self.max_size
    }
}

/// Keeps the blobs whose size lies strictly inside `bounds`, preserving order.
pub fn filter_blobs(blobs: Vec<Blob>, bounds: SizeBounds) -> Vec<Blob> {
    let before = blobs.len();
    let kept: Vec<Blob> = blobs
        .into_iter()
        .filter(|blob| bounds.admits(blob.pixel_count))
        .collect();
    debug!(
        before,
        after = kept.len(),
        min_size = bounds.min_size,
        max_size = bounds.max_size,
        "filtered blobs by size"
    );
    kept
}
