// THEORY:
// The first stage collapses colour into a single intensity channel. Pills are
// told apart from the tray by brightness alone, so the hue and saturation a
// camera records are noise as far as counting is concerned.
//
// Key architectural principles:
// 1.  **Perceptual Weighting**: Intensity is Rec. 601 luma, the same weighted sum
//     of R, G and B that drives perceived brightness. Alpha is ignored.
// 2.  **Integer Output**: Each pixel is rounded back to a byte so the binarizer can
//     build an exact 256-bin histogram.
// 3.  **Owned Result**: The grayscale image is a new buffer; the RGBA input is
//     never touched.

use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::{Result, try_zeroed};

const LUMA_RED: f64 = 0.299;
const LUMA_GREEN: f64 = 0.587;
const LUMA_BLUE: f64 = 0.114;

/// A single-channel 8-bit image, one byte per pixel in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayscaleImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayscaleImage {
    /// Builds an image from raw intensities. Returns `None` if the length does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub(crate) fn zeroed(width: u32, height: u32) -> Result<Self> {
        let data = try_zeroed(width as usize * height as usize)?;
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Intensity at `(x, y)`. Panics outside the image.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Copies the intensities into an `image::GrayImage` for saving or display.
    pub fn to_luma_image(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| image::Luma([self.get(x, y)]))
    }
}

/// Rec. 601 luma of one RGB triple, rounded to the nearest integer.
#[inline]
pub fn luminance(red: u8, green: u8, blue: u8) -> u8 {
    let luma = LUMA_RED * red as f64 + LUMA_GREEN * green as f64 + LUMA_BLUE * blue as f64;
    luma.round().clamp(0.0, 255.0) as u8
}

/// Reduces an RGBA buffer to a grayscale image of the same dimensions.
pub fn to_grayscale(buffer: &PixelBuffer) -> Result<GrayscaleImage> {
    let mut gray = GrayscaleImage::zeroed(buffer.width(), buffer.height())?;
    for (out, px) in gray.as_raw_mut().iter_mut().zip(buffer.pixels()) {
        *out = luminance(px[0], px[1], px[2]);
    }
    Ok(gray)
}
