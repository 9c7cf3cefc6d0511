// THEORY:
// Calibration lets the user overrule the computed reference size by pointing at
// a blob they know is exactly one pill. The pipeline itself stays stateless; this
// module is an optional helper a caller can own to drive the interaction.
//
// Key architectural principles:
// 1.  **Two-State Machine**: `Idle -> Calibrating` when the user asks to calibrate,
//     `Calibrating -> Idle` once a click lands on a blob. A click that misses
//     every blob keeps the session in `Calibrating`.
// 2.  **Generous Hit Test**: A blob is hit when the click falls inside 1.5x its
//     equivalent-disk radius around the centroid. Overlapping hits go to the
//     closest centroid, then to the earlier blob.
// 3.  **Explicit Reference**: The active reference size is a plain value threaded
//     into `estimate_points`. Nothing is recomputed from pixels.
// 4.  **One Image, One Session**: A session wraps a single `DetectionResult`. A new
//     image means a new session, which discards any override.

use crate::core_modules::blob::{Blob, Point};
use crate::core_modules::point_estimator::{DEFAULT_CLUSTER_RADIUS_FACTOR, estimate_points_with_radius};
use crate::pipeline::DetectionResult;
use tracing::debug;

/// Multiple of the equivalent-disk radius that still counts as clicking a blob.
pub const DEFAULT_HIT_RADIUS_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CalibrationMode {
    Idle,
    Calibrating,
}

/// What a click did to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// The session was idle; clicks are not calibration input.
    Ignored,
    /// No blob was under the click; the session keeps waiting.
    Missed,
    /// The blob at `blob_index` now defines the reference size.
    Calibrated { blob_index: usize, reference: f64 },
}

/// Index of the blob under `(x, y)`, if any.
pub fn find_blob_at(blobs: &[Blob], x: f64, y: f64, hit_radius_factor: f64) -> Option<usize> {
    let click = Point::new(x, y);
    let mut best: Option<(usize, f64)> = None;
    for (index, blob) in blobs.iter().enumerate() {
        let distance = blob.centroid.distance_to(&click);
        if distance >= blob.equivalent_radius() * hit_radius_factor {
            continue;
        }
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}

/// Caller-owned calibration state for one detected image.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    detection: DetectionResult,
    reference: f64,
    mode: CalibrationMode,
    hit_radius_factor: f64,
    cluster_radius_factor: f64,
}

impl CalibrationSession {
    pub fn new(detection: DetectionResult) -> Self {
        Self::with_factors(detection, DEFAULT_HIT_RADIUS_FACTOR, DEFAULT_CLUSTER_RADIUS_FACTOR)
    }

    pub fn with_factors(detection: DetectionResult, hit_radius_factor: f64, cluster_radius_factor: f64) -> Self {
        let reference = detection.default_reference_size;
        Self {
            detection,
            reference,
            mode: CalibrationMode::Idle,
            hit_radius_factor,
            cluster_radius_factor,
        }
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    /// The reference size currently in effect.
    pub fn reference(&self) -> f64 {
        self.reference
    }

    pub fn detection(&self) -> &DetectionResult {
        &self.detection
    }

    pub fn is_overridden(&self) -> bool {
        self.reference != self.detection.default_reference_size
    }

    pub fn begin(&mut self) {
        self.mode = CalibrationMode::Calibrating;
    }

    /// Leaves calibration mode without changing the reference.
    pub fn cancel(&mut self) {
        self.mode = CalibrationMode::Idle;
    }

    /// Handles a click at image coordinates `(x, y)`.
    pub fn click(&mut self, x: f64, y: f64) -> ClickOutcome {
        if self.mode != CalibrationMode::Calibrating {
            return ClickOutcome::Ignored;
        }
        let Some(blob_index) = find_blob_at(&self.detection.blobs, x, y, self.hit_radius_factor) else {
            return ClickOutcome::Missed;
        };

        self.reference = self.detection.blobs[blob_index].pixel_count as f64;
        self.mode = CalibrationMode::Idle;
        debug!(blob_index, reference = self.reference, "calibrated reference size");
        ClickOutcome::Calibrated {
            blob_index,
            reference: self.reference,
        }
    }

    /// Restores the computed default reference size.
    pub fn reset_to_default(&mut self) {
        self.reference = self.detection.default_reference_size;
    }

    /// Counting markers at the current reference size.
    pub fn points(&self) -> Vec<Point> {
        estimate_points_with_radius(&self.detection.blobs, self.reference, self.cluster_radius_factor)
    }

    pub fn count(&self) -> usize {
        self.points().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection() -> DetectionResult {
        DetectionResult {
            width: 200,
            height: 100,
            blobs: vec![
                Blob::new(100, Point::new(20.0, 20.0)),
                Blob::new(300, Point::new(100.0, 50.0)),
                Blob::new(110, Point::new(170.0, 80.0)),
            ],
            default_reference_size: 125.0,
        }
    }

    #[test]
    fn starts_idle_with_the_default_reference() {
        let session = CalibrationSession::new(detection());
        assert_eq!(session.mode(), CalibrationMode::Idle);
        assert_eq!(session.reference(), 125.0);
        assert!(!session.is_overridden());
        // 100 -> 1, 300 -> 2, 110 -> 1
        assert_eq!(session.count(), 4);
    }

    #[test]
    fn clicks_while_idle_are_ignored() {
        let mut session = CalibrationSession::new(detection());
        assert_eq!(session.click(20.0, 20.0), ClickOutcome::Ignored);
        assert_eq!(session.reference(), 125.0);
    }

    #[test]
    fn missing_click_stays_in_calibrating() {
        let mut session = CalibrationSession::new(detection());
        session.begin();
        assert_eq!(session.click(60.0, 90.0), ClickOutcome::Missed);
        assert_eq!(session.mode(), CalibrationMode::Calibrating);
    }

    #[test]
    fn hit_adopts_the_blob_size_and_returns_to_idle() {
        let mut session = CalibrationSession::new(detection());
        session.begin();
        // Radius of a 100 px blob is ~5.64, hit radius ~8.46.
        let outcome = session.click(27.0, 24.0);
        assert_eq!(
            outcome,
            ClickOutcome::Calibrated {
                blob_index: 0,
                reference: 100.0
            }
        );
        assert_eq!(session.mode(), CalibrationMode::Idle);
        assert!(session.is_overridden());
        // 100 -> 1, 300 -> 3, 110 -> 1
        assert_eq!(session.count(), 5);

        session.reset_to_default();
        assert_eq!(session.count(), 4);
    }

    #[test]
    fn cancel_keeps_reference() {
        let mut session = CalibrationSession::new(detection());
        session.begin();
        session.cancel();
        assert_eq!(session.mode(), CalibrationMode::Idle);
        assert_eq!(session.reference(), 125.0);
    }

    #[test]
    fn overlapping_hits_pick_the_closest_centroid() {
        let blobs = vec![
            Blob::new(400, Point::new(0.0, 0.0)),
            Blob::new(400, Point::new(20.0, 0.0)),
        ];
        // Both hit radii (~16.9) cover x = 12; blob 1 is closer.
        assert_eq!(find_blob_at(&blobs, 12.0, 0.0, DEFAULT_HIT_RADIUS_FACTOR), Some(1));
        assert_eq!(find_blob_at(&blobs, 10.0, 0.0, DEFAULT_HIT_RADIUS_FACTOR), Some(0));
        assert_eq!(find_blob_at(&blobs, 10.0, 30.0, DEFAULT_HIT_RADIUS_FACTOR), None);
    }
}
