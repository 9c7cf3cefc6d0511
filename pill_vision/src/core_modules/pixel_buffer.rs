// THEORY:
// `PixelBuffer` is the boundary object between the caller and the pipeline. The
// caller decodes a file or grabs a camera frame, flattens it into interleaved
// RGBA bytes and hands it over. The pipeline only ever reads it: every stage
// derives a fresh buffer from its predecessor's output.
//
// Key architectural principles:
// 1.  **Dumb Data Container**: Like the `Pixel` of a frame, the buffer carries no
//     behaviour beyond indexing. Colour science lives in the grayscale stage.
// 2.  **Validated Once**: The byte length is checked when the buffer is built, so
//     later stages can index without re-checking.
// 3.  **Decoding Stays Outside**: Conversions from `image` types are provided for
//     convenience, but opening files is always the caller's job.

use crate::error::{PipelineError, Result};

/// Number of interleaved channels per pixel (R, G, B, A).
pub const RGBA_CHANNELS: usize = 4;

/// An interleaved RGBA image of `width * height * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw RGBA bytes. Fails if `data` is not exactly `width * height * 4` bytes long.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(RGBA_CHANNELS))
            .ok_or(PipelineError::InvalidImage { width, height })?;
        if data.len() != expected {
            return Err(PipelineError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Copies a borrowed RGBA slice into a new buffer.
    pub fn from_rgba_slice(width: u32, height: u32, data: &[u8]) -> Result<Self> {
        Self::new(width, height, data.to_vec())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Iterates over the pixels in row-major order as `[r, g, b, a]` slices.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(RGBA_CHANNELS)
    }

    /// Returns the RGBA bytes of the pixel at `(x, y)`, or `None` outside the image.
    pub fn rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * RGBA_CHANNELS;
        let px = &self.data[start..start + RGBA_CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl From<image::RgbaImage> for PixelBuffer {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

impl From<&image::DynamicImage> for PixelBuffer {
    fn from(img: &image::DynamicImage) -> Self {
        Self::from(img.to_rgba8())
    }
}
