// THEORY:
// To count fused clusters the pipeline needs to know how big one pill is. On a
// typical tray most blobs are single pills, so the most common blob size is a
// good guess. Sizes are noisy, so they are bucketed first and the fullest bucket
// (the mode) is taken; its centre becomes the default reference size.
//
// Bucket width adapts to the population: `max(floor, mean / divisor)`, so the
// histogram has roughly the same resolution whether pills are 80 or 8000 pixels.
// Buckets are examined in ascending size order and the first one with the
// highest count wins a tie. A mode bucket starting at 0 carries no size
// information, so the median blob size is used instead.

use crate::core_modules::blob::Blob;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Parameters of the size histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeHistogramParams {
    /// Smallest allowed bucket width, in pixels.
    pub bucket_floor: usize,
    /// The mean blob size is divided by this to get the adaptive bucket width.
    pub bucket_divisor: f64,
}

impl Default for SizeHistogramParams {
    fn default() -> Self {
        Self {
            bucket_floor: 50,
            bucket_divisor: 20.0,
        }
    }
}

/// Width of the size-histogram buckets for a population with `mean_size`.
pub fn bucket_width(mean_size: f64, params: SizeHistogramParams) -> usize {
    let adaptive = (mean_size / params.bucket_divisor).floor();
    params.bucket_floor.max(adaptive as usize)
}

/// Median blob size. Even populations average the two middle sizes.
pub fn median_size(blobs: &[Blob]) -> f64 {
    if blobs.is_empty() {
        return 0.0;
    }
    let mut sizes: Vec<usize> = blobs.iter().map(|b| b.pixel_count).collect();
    sizes.sort_unstable();
    let mid = sizes.len() / 2;
    if sizes.len() % 2 == 0 {
        (sizes[mid - 1] + sizes[mid]) as f64 / 2.0
    } else {
        sizes[mid] as f64
    }
}

/// Estimates the pixel area of a single pill from the blob population.
///
/// Returns 0 when there are no blobs; callers treat that as "ungauged".
pub fn default_reference_size(blobs: &[Blob], params: SizeHistogramParams) -> f64 {
    if blobs.is_empty() {
        return 0.0;
    }

    let mean = blobs.iter().map(|b| b.pixel_count as f64).sum::<f64>() / blobs.len() as f64;
    let width = bucket_width(mean, params);

    let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
    for blob in blobs {
        *histogram.entry(blob.pixel_count / width * width).or_default() += 1;
    }

    let mut mode_bucket = 0usize;
    let mut mode_count = 0usize;
    for (&bucket, &count) in &histogram {
        if count > mode_count {
            mode_bucket = bucket;
            mode_count = count;
        }
    }

    if mode_bucket == 0 {
        let median = median_size(blobs);
        warn!(median, "size histogram mode is the zero bucket, using median blob size");
        return median;
    }

    let reference = mode_bucket as f64 + width as f64 / 2.0;
    debug!(
        mean,
        bucket_width = width,
        mode_bucket,
        mode_count,
        reference,
        "estimated default reference size"
    );
    reference
}
