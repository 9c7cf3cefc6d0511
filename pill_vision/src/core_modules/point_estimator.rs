// THEORY:
// The last stage converts blobs into counting markers. A blob about the size of
// the reference is one pill and gets one marker at its centroid. A blob several
// times larger is treated as a fused cluster: the ratio, rounded, says how many
// pills it holds, and that many markers are spread evenly on a circle inside it.
//
// This stage is cheap and pure. The caller keeps the `DetectionResult` and
// re-runs only this function whenever the user picks a new reference, without
// touching any pixels.

use crate::core_modules::blob::{Blob, Point};
use std::f64::consts::TAU;

/// Fraction of the equivalent-disk radius at which cluster markers are placed.
pub const DEFAULT_CLUSTER_RADIUS_FACTOR: f64 = 0.6;

/// Number of pills a blob of `pixel_count` represents at `reference` pixels per pill.
/// Never less than 1 and never more than `pixel_count`, since a pill covers at
/// least one pixel. A non-positive reference counts every blob as one pill.
pub fn pills_in_blob(pixel_count: usize, reference: f64) -> usize {
    if reference <= 0.0 || !reference.is_finite() {
        return 1;
    }
    let estimate = (pixel_count as f64 / reference).round();
    (estimate as usize).min(pixel_count).max(1)
}

/// Estimates one marker per pill using the default cluster radius.
pub fn estimate_points(blobs: &[Blob], reference: f64) -> Vec<Point> {
    estimate_points_with_radius(blobs, reference, DEFAULT_CLUSTER_RADIUS_FACTOR)
}

/// Estimates one marker per pill.
///
/// Markers come out blob by blob in list order; within a cluster they run in
/// ascending angle starting from the positive x axis.
pub fn estimate_points_with_radius(blobs: &[Blob], reference: f64, radius_factor: f64) -> Vec<Point> {
    let mut points = Vec::with_capacity(blobs.len());
    for blob in blobs {
        let count = pills_in_blob(blob.pixel_count, reference);
        if count == 1 {
            points.push(blob.centroid);
            continue;
        }

        let radius = radius_factor * blob.equivalent_radius();
        for i in 0..count {
            let angle = TAU * i as f64 / count as f64;
            points.push(Point::new(
                blob.centroid.x + radius * angle.cos(),
                blob.centroid.y + radius * angle.sin(),
            ));
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-9;

    fn blob_at(size: usize, x: f64, y: f64) -> Blob {
        Blob::new(size, Point::new(x, y))
    }

    #[test]
    fn ungauged_reference_gives_one_point_per_blob() {
        let blobs = vec![blob_at(500, 1.0, 2.0), blob_at(90, 3.0, 4.0)];
        for reference in [0.0, -12.0] {
            assert_eq!(
                estimate_points(&blobs, reference),
                vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]
            );
        }
    }

    #[test]
    fn single_pills_sit_on_their_centroids() {
        let blobs = vec![blob_at(64, 14.5, 14.5), blob_at(64, 74.5, 74.5)];
        assert_eq!(
            estimate_points(&blobs, 64.0),
            vec![Point::new(14.5, 14.5), Point::new(74.5, 74.5)]
        );
    }

    #[test]
    fn small_blobs_still_count_once() {
        assert_eq!(pills_in_blob(10, 100.0), 1);
        assert_eq!(estimate_points(&[blob_at(10, 5.0, 5.0)], 100.0).len(), 1);
    }

    #[test]
    fn sub_pixel_reference_is_capped_at_one_pill_per_pixel() {
        assert_eq!(pills_in_blob(1000, 1e-300), 1000);
        assert_eq!(pills_in_blob(1000, 0.25), 1000);
        assert_eq!(pills_in_blob(7, f64::MIN_POSITIVE), 7);

        let blob = blob_at(1000, 20.0, 20.0);
        let points = estimate_points(&[blob], 1e-300);
        assert_eq!(points.len(), 1000);
    }

    #[test]
    fn split_count_law() {
        let reference = 100.0;
        for k in 1..=6usize {
            for size in [k * 100 - 49, k * 100, k * 100 + 49] {
                let blob = blob_at(size, 50.0, 40.0);
                let points = estimate_points(&[blob], reference);
                assert_eq!(points.len(), k, "size {size}");
                if k == 1 {
                    assert_eq!(points[0], blob.centroid);
                    continue;
                }

                let radius = 0.6 * (size as f64 / PI).sqrt();
                for (i, p) in points.iter().enumerate() {
                    assert!((p.distance_to(&blob.centroid) - radius).abs() < EPS);
                    let angle = (p.y - 40.0).atan2(p.x - 50.0).rem_euclid(TAU);
                    let expected = TAU * i as f64 / k as f64;
                    let diff = (angle - expected).abs();
                    assert!(diff < 1e-6 || (TAU - diff) < 1e-6, "angle {angle} vs {expected}");
                }
            }
        }
    }

    #[test]
    fn points_follow_blob_order() {
        let blobs = vec![blob_at(200, 10.0, 10.0), blob_at(100, 90.0, 90.0)];
        let points = estimate_points(&blobs, 100.0);
        assert_eq!(points.len(), 3);
        assert!(points[0].x > 10.0 && (points[0].y - 10.0).abs() < EPS);
        assert!(points[1].x < 10.0);
        assert_eq!(points[2], Point::new(90.0, 90.0));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let blobs = vec![blob_at(333, 12.0, 7.0), blob_at(95, 1.0, 1.0)];
        assert_eq!(estimate_points(&blobs, 110.0), estimate_points(&blobs, 110.0));
    }
}
