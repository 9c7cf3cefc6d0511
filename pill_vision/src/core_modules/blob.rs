// THEORY:
// A `Blob` is one connected patch of foreground in the eroded mask, summarized
// down to the two numbers counting needs: how many pixels it covers and where
// its centre is. It is a "dumb" value object with no identity beyond its
// position in the list a single detection run produced.
//
// `Point` is shared by centroids and by the final counting markers; both are
// expressed in source-image pixel coordinates.

use std::f64::consts::PI;

/// A location in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A connected foreground region.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Blob {
    /// Number of member pixels. Always positive for labeled blobs.
    pub pixel_count: usize,
    /// Unweighted mean of the member pixel coordinates.
    pub centroid: Point,
}

impl Blob {
    pub fn new(pixel_count: usize, centroid: Point) -> Self {
        Self {
            pixel_count,
            centroid,
        }
    }

    /// Radius of the disk with the same area as this blob.
    pub fn equivalent_radius(&self) -> f64 {
        (self.pixel_count as f64 / PI).sqrt()
    }
}
