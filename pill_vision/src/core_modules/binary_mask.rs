use crate::error::{Result, try_zeroed};

/// A per-pixel foreground/background map. Each byte is 0 (background) or 1 (foreground).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BinaryMask {
    pub(crate) fn zeroed(width: u32, height: u32) -> Result<Self> {
        let data = try_zeroed(width as usize * height as usize)?;
        Ok(Self { width, height, data })
    }

    /// Builds a mask from a row-major slice of booleans. Returns `None` if the length does not match.
    pub fn from_bools(width: u32, height: u32, cells: &[bool]) -> Option<Self> {
        if cells.len() != width as usize * height as usize {
            return None;
        }
        let data = cells.iter().map(|&c| c as u8).collect();
        Some(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize] != 0
    }

    #[inline]
    pub(crate) fn set(&mut self, x: u32, y: u32, foreground: bool) {
        self.data[y as usize * self.width as usize + x as usize] = foreground as u8;
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Renders the mask as black background with white foreground.
    pub fn to_luma_image(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.is_foreground(x, y) { 255 } else { 0 }])
        })
    }
}
