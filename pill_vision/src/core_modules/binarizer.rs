// THEORY:
// The binarizer decides, for every pixel, whether it belongs to a pill or to the
// tray. It does so with one global threshold and one global polarity, which is
// enough for a single dominant foreground class under roughly even lighting.
//
// Key architectural principles & algorithm steps:
// 1.  **Histogram**: A 256-bin intensity histogram of the blurred image.
// 2.  **Otsu Threshold**: Every candidate `t` in `0..=255` splits the histogram into
//     a background class (`<= t`) and a foreground class (`> t`). The candidate with
//     the largest inter-class variance `wB * wF * (mB - mF)^2` wins; ties go to the
//     lowest `t`. An empty class scores 0.
// 3.  **Polarity**: Threshold alone cannot say whether pills are the light or the
//     dark class. The tray fills the edges of a photo, so every Nth pixel on the
//     image border votes +1 if it is above the threshold and -1 otherwise. A light
//     border means the pills are dark.
// 4.  **Mask**: The resolved polarity turns the threshold into a `BinaryMask`.
//
// The blur stage writes 0 into the outermost ring, so the border is sampled one
// ring further in (`border_inset`); sampling the zero ring would always vote
// "dark border".

use crate::core_modules::binary_mask::BinaryMask;
use crate::core_modules::grayscale::GrayscaleImage;
use crate::error::Result;
use tracing::debug;

/// Number of histogram bins for 8-bit intensities.
pub const HISTOGRAM_BINS: usize = 256;

/// Which side of the threshold holds the objects being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// The border is predominantly light; pixels `<= threshold` are foreground.
    DarkObjects,
    /// The border is predominantly dark (or evenly split); pixels `> threshold` are foreground.
    LightObjects,
}

impl Polarity {
    #[inline]
    pub fn is_foreground(self, intensity: u8, threshold: u8) -> bool {
        match self {
            Polarity::DarkObjects => intensity <= threshold,
            Polarity::LightObjects => intensity > threshold,
        }
    }
}

/// Where and how densely the border is sampled for the polarity vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderSampling {
    /// Take every `stride`-th pixel along each edge.
    pub stride: u32,
    /// Distance of the sampled ring from the true image edge.
    pub inset: u32,
}

impl Default for BorderSampling {
    fn default() -> Self {
        Self { stride: 10, inset: 1 }
    }
}

/// The output of the binarizer along with the decisions that produced it.
#[derive(Debug, Clone)]
pub struct Binarization {
    pub mask: BinaryMask,
    pub threshold: u8,
    pub polarity: Polarity,
}

/// Counts how many pixels fall into each intensity bin.
pub fn intensity_histogram(image: &GrayscaleImage) -> [u64; HISTOGRAM_BINS] {
    let mut histogram = [0u64; HISTOGRAM_BINS];
    for &v in image.as_raw() {
        histogram[v as usize] += 1;
    }
    histogram
}

fn variance_from_sums(total: u64, weighted_total: u64, count_b: u64, weighted_b: u64) -> f64 {
    let count_f = total - count_b;
    if count_b == 0 || count_f == 0 {
        return 0.0;
    }
    let w_b = count_b as f64 / total as f64;
    let w_f = count_f as f64 / total as f64;
    let mean_b = weighted_b as f64 / count_b as f64;
    let mean_f = (weighted_total - weighted_b) as f64 / count_f as f64;
    w_b * w_f * (mean_b - mean_f).powi(2)
}

/// Inter-class variance of splitting `histogram` into `<= threshold` and `> threshold`.
pub fn inter_class_variance(histogram: &[u64; HISTOGRAM_BINS], threshold: u8) -> f64 {
    let (mut total, mut weighted_total, mut count_b, mut weighted_b) = (0u64, 0u64, 0u64, 0u64);
    for (i, &count) in histogram.iter().enumerate() {
        total += count;
        weighted_total += i as u64 * count;
        if i <= threshold as usize {
            count_b += count;
            weighted_b += i as u64 * count;
        }
    }
    variance_from_sums(total, weighted_total, count_b, weighted_b)
}

/// Otsu's method: the threshold maximizing inter-class variance, lowest on ties.
pub fn otsu_threshold(histogram: &[u64; HISTOGRAM_BINS]) -> u8 {
    let total: u64 = histogram.iter().sum();
    let weighted_total: u64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as u64 * count)
        .sum();

    let mut count_b = 0u64;
    let mut weighted_b = 0u64;
    let mut best_variance = f64::NEG_INFINITY;
    let mut best_threshold = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        count_b += count;
        weighted_b += t as u64 * count;
        let variance = variance_from_sums(total, weighted_total, count_b, weighted_b);
        if variance > best_variance {
            best_variance = variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Positions of every `stride`-th pixel on the ring `inset` pixels inside the edge.
/// Corners are visited once per edge they lie on.
fn border_samples(width: u32, height: u32, sampling: BorderSampling) -> Vec<(u32, u32)> {
    let stride = sampling.stride.max(1) as usize;
    // Fall back to the true edge when the image is too small for the inset ring.
    let ring = sampling.inset.saturating_mul(2);
    let inset = if width > ring && height > ring {
        sampling.inset
    } else {
        0
    };
    let (left, right) = (inset, width - 1 - inset);
    let (top, bottom) = (inset, height - 1 - inset);

    let mut samples = Vec::new();
    for x in (left..=right).step_by(stride) {
        samples.push((x, top));
        samples.push((x, bottom));
    }
    for y in (top..=bottom).step_by(stride) {
        samples.push((left, y));
        samples.push((right, y));
    }
    samples
}

/// Votes on the border to decide which side of `threshold` holds the objects.
pub fn resolve_polarity(image: &GrayscaleImage, threshold: u8, sampling: BorderSampling) -> Polarity {
    if image.width() == 0 || image.height() == 0 {
        return Polarity::LightObjects;
    }
    let vote: i64 = border_samples(image.width(), image.height(), sampling)
        .into_iter()
        .map(|(x, y)| if image.get(x, y) > threshold { 1 } else { -1 })
        .sum();

    if vote > 0 {
        Polarity::DarkObjects
    } else {
        Polarity::LightObjects
    }
}

/// Thresholds `image` with Otsu's method and the border-resolved polarity.
pub fn binarize(image: &GrayscaleImage, sampling: BorderSampling) -> Result<Binarization> {
    let histogram = intensity_histogram(image);
    let threshold = otsu_threshold(&histogram);
    let polarity = resolve_polarity(image, threshold, sampling);

    let mut mask = BinaryMask::zeroed(image.width(), image.height())?;
    for y in 0..image.height() {
        for x in 0..image.width() {
            mask.set(x, y, polarity.is_foreground(image.get(x, y), threshold));
        }
    }

    debug!(
        threshold,
        ?polarity,
        foreground = mask.foreground_count(),
        "binarized image"
    );

    Ok(Binarization {
        mask,
        threshold,
        polarity,
    })
}
