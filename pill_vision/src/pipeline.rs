// THEORY:
// The `pipeline` module is the top-level API of the counting engine. It strings
// the stage modules together into the two operations a caller needs:
//
// 1.  `segment`: decoded RGBA buffer -> grayscale -> blur -> binarize -> erode ->
//     label -> size filter -> default reference size. The result is a
//     `DetectionResult`, which the caller keeps for as long as the image is shown.
// 2.  `estimate_points`: blobs + reference size -> counting markers. This is the
//     cheap step, re-run every time the user calibrates.
//
// Each stage depends on the full output of the one before it, so the run is
// strictly sequential. Intermediate buffers live only for the duration of one
// call; `segment` drops them before returning. Nothing survives between calls
// except what the caller chooses to keep.

use crate::core_modules::binarizer::{BorderSampling, Polarity, binarize};
use crate::core_modules::binary_mask::BinaryMask;
use crate::core_modules::blob_filter::{SizeBounds, filter_blobs};
use crate::core_modules::calibrator::{SizeHistogramParams, default_reference_size};
use crate::core_modules::grayscale::{GrayscaleImage, to_grayscale};
use crate::core_modules::labeler::label_components;
use crate::core_modules::morphology::erode_repeated;
use crate::core_modules::noise_filter::gaussian_blur;
use crate::core_modules::point_estimator::estimate_points_with_radius;
use crate::error::{PipelineError, Result};
use tracing::{debug, info};

// Re-export key data structures for the public API.
pub use crate::core_modules::blob::{Blob, Point};
pub use crate::core_modules::calibration::{CalibrationMode, CalibrationSession, ClickOutcome, find_blob_at};
pub use crate::core_modules::pixel_buffer::PixelBuffer;
pub use crate::core_modules::point_estimator::estimate_points;

/// Configuration for the counting pipeline. `Default` is the standard pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Every Nth border pixel votes on polarity.
    pub border_sample_stride: u32,
    /// How far inside the edge the polarity vote samples. The blur zeroes the outermost ring.
    pub border_sample_inset: u32,
    /// Erosion passes applied to the mask. The standard pipeline uses exactly one.
    pub erosion_passes: u32,
    /// Blobs must be larger than `max(min_blob_floor, area / min_blob_area_divisor)`.
    pub min_blob_floor: f64,
    pub min_blob_area_divisor: f64,
    /// Blobs must be smaller than this fraction of the image area.
    pub max_blob_area_fraction: f64,
    /// Size-histogram bucket width is `max(floor, mean / divisor)`.
    pub histogram_bucket_floor: usize,
    pub histogram_bucket_divisor: f64,
    /// Cluster markers sit at this fraction of the blob's equivalent-disk radius.
    pub cluster_radius_factor: f64,
    /// Calibration clicks hit a blob within this multiple of its equivalent-disk radius.
    pub hit_radius_factor: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            border_sample_stride: 10,
            border_sample_inset: 1,
            erosion_passes: 1,
            min_blob_floor: 50.0,
            min_blob_area_divisor: 6000.0,
            max_blob_area_fraction: 0.5,
            histogram_bucket_floor: 50,
            histogram_bucket_divisor: 20.0,
            cluster_radius_factor: 0.6,
            hit_radius_factor: 1.5,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.border_sample_stride == 0 {
            return Err(PipelineError::InvalidConfig("border_sample_stride must be positive"));
        }
        if !(self.min_blob_area_divisor > 0.0) {
            return Err(PipelineError::InvalidConfig("min_blob_area_divisor must be positive"));
        }
        if !(self.max_blob_area_fraction > 0.0 && self.max_blob_area_fraction <= 1.0) {
            return Err(PipelineError::InvalidConfig("max_blob_area_fraction must be in (0, 1]"));
        }
        if self.histogram_bucket_floor == 0 {
            return Err(PipelineError::InvalidConfig("histogram_bucket_floor must be positive"));
        }
        if !(self.histogram_bucket_divisor > 0.0) {
            return Err(PipelineError::InvalidConfig("histogram_bucket_divisor must be positive"));
        }
        if !(self.cluster_radius_factor >= 0.0) || !(self.hit_radius_factor > 0.0) {
            return Err(PipelineError::InvalidConfig("radius factors must be positive"));
        }
        Ok(())
    }

    fn border_sampling(&self) -> BorderSampling {
        BorderSampling {
            stride: self.border_sample_stride,
            inset: self.border_sample_inset,
        }
    }

    fn size_bounds(&self, width: u32, height: u32) -> SizeBounds {
        SizeBounds::for_image(
            width,
            height,
            self.min_blob_floor,
            self.min_blob_area_divisor,
            self.max_blob_area_fraction,
        )
    }

    fn histogram_params(&self) -> SizeHistogramParams {
        SizeHistogramParams {
            bucket_floor: self.histogram_bucket_floor,
            bucket_divisor: self.histogram_bucket_divisor,
        }
    }
}

/// The durable output of segmentation for one image.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectionResult {
    /// Dimensions of the segmented image.
    pub width: u32,
    pub height: u32,
    /// Plausible pill blobs in scan order.
    pub blobs: Vec<Blob>,
    /// Estimated pixels per pill, or 0 when there are no blobs.
    pub default_reference_size: f64,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

/// Every intermediate buffer of one segmentation run, for inspection.
#[derive(Debug, Clone)]
pub struct StageImages {
    pub grayscale: GrayscaleImage,
    pub blurred: GrayscaleImage,
    pub mask: BinaryMask,
    pub eroded: BinaryMask,
    pub threshold: u8,
    pub polarity: Polarity,
    /// Labeled components before size filtering.
    pub raw_blobs: Vec<Blob>,
}

/// A configured instance of the counting pipeline. Holds no per-image state.
#[derive(Debug, Clone, Default)]
pub struct CountingPipeline {
    config: PipelineConfig,
}

impl CountingPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs stages 1-7 on `image`.
    pub fn segment(&self, image: &PixelBuffer) -> Result<DetectionResult> {
        self.run(image).map(|(detection, _)| detection)
    }

    /// Like [`segment`](Self::segment) but also returns every intermediate buffer.
    pub fn segment_with_stages(&self, image: &PixelBuffer) -> Result<(DetectionResult, StageImages)> {
        self.run(image)
    }

    /// Runs stage 8 with the configured cluster radius.
    pub fn estimate_points(&self, blobs: &[Blob], reference: f64) -> Vec<Point> {
        estimate_points_with_radius(blobs, reference, self.config.cluster_radius_factor)
    }

    /// Starts a calibration session over `detection` with the configured factors.
    pub fn calibration_session(&self, detection: DetectionResult) -> CalibrationSession {
        CalibrationSession::with_factors(
            detection,
            self.config.hit_radius_factor,
            self.config.cluster_radius_factor,
        )
    }

    fn run(&self, image: &PixelBuffer) -> Result<(DetectionResult, StageImages)> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidImage { width, height });
        }
        debug!(width, height, "segmenting image");

        // --- 1. Grayscale ---
        let grayscale = to_grayscale(image)?;

        // --- 2. Noise Filter ---
        let blurred = gaussian_blur(&grayscale)?;

        // --- 3. Binarize ---
        let binarization = binarize(&blurred, self.config.border_sampling())?;

        // --- 4. Erode ---
        let eroded = erode_repeated(&binarization.mask, self.config.erosion_passes)?;

        // --- 5. Label ---
        let raw_blobs = label_components(&eroded)?;

        // --- 6. Size Filter ---
        let blobs = filter_blobs(raw_blobs.clone(), self.config.size_bounds(width, height));

        // --- 7. Reference Size ---
        let default_reference_size = default_reference_size(&blobs, self.config.histogram_params());

        info!(
            blobs = blobs.len(),
            default_reference_size,
            threshold = binarization.threshold,
            "segmentation complete"
        );

        let stages = StageImages {
            grayscale,
            blurred,
            threshold: binarization.threshold,
            polarity: binarization.polarity,
            mask: binarization.mask,
            eroded,
            raw_blobs,
        };

        Ok((
            DetectionResult {
                width,
                height,
                blobs,
                default_reference_size,
            },
            stages,
        ))
    }
}

/// Runs stages 1-7 with the standard configuration.
pub fn segment(image: &PixelBuffer) -> Result<DetectionResult> {
    CountingPipeline::default().segment(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_config() {
        let config = PipelineConfig {
            max_blob_area_fraction: 1.5,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            CountingPipeline::new(config),
            Err(PipelineError::InvalidConfig(_))
        ));

        let config = PipelineConfig {
            border_sample_stride: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_sized_image_is_invalid() {
        let image = PixelBuffer::new(0, 10, Vec::new()).unwrap();
        assert!(matches!(
            segment(&image),
            Err(PipelineError::InvalidImage { width: 0, height: 10 })
        ));
    }

    #[test]
    fn blank_image_is_a_normal_empty_result() {
        let image = PixelBuffer::new(64, 48, vec![255u8; 64 * 48 * 4]).unwrap();
        let detection = segment(&image).unwrap();
        assert!(detection.is_empty());
        assert_eq!(detection.default_reference_size, 0.0);
        assert!(estimate_points(&detection.blobs, detection.default_reference_size).is_empty());
    }

    #[test]
    fn stages_match_the_plain_run() {
        let mut data = vec![0u8; 40 * 40 * 4];
        for y in 10..30 {
            for x in 10..30 {
                let i = (y * 40 + x) * 4;
                data[i..i + 4].copy_from_slice(&[250, 250, 250, 255]);
            }
        }
        let image = PixelBuffer::new(40, 40, data).unwrap();
        let pipeline = CountingPipeline::default();
        let (detection, stages) = pipeline.segment_with_stages(&image).unwrap();
        assert_eq!(detection, pipeline.segment(&image).unwrap());
        assert_eq!(stages.polarity, Polarity::LightObjects);
        assert_eq!(stages.raw_blobs.len(), 1);
        assert_eq!(detection.blobs.len(), 1);
        assert!(stages.eroded.foreground_count() < stages.mask.foreground_count());
    }
}
