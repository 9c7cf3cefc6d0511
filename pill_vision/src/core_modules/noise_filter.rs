// THEORY:
// Sensor noise produces isolated bright or dark specks that survive a global
// threshold and turn into tiny false blobs. A single 3x3 Gaussian pass smooths
// them into their surroundings before the binarizer ever sees the image.
//
// Key architectural principles:
// 1.  **Fixed Kernel**: `[[1,2,1],[2,4,2],[1,2,1]] / 16`, applied by direct
//     convolution. There is nothing to tune.
// 2.  **Zero Border**: Pixels whose 3x3 window would leave the image are written
//     as 0. They are not clamped or reflected. This keeps the result reproducible
//     and matches the erosion stage, which also clears the outer ring.

use crate::core_modules::grayscale::GrayscaleImage;
use crate::error::Result;

const KERNEL: [[u32; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];
const KERNEL_WEIGHT: u32 = 16;

/// Applies the 3x3 Gaussian kernel, leaving the one-pixel border at 0.
pub fn gaussian_blur(gray: &GrayscaleImage) -> Result<GrayscaleImage> {
    let (width, height) = (gray.width(), gray.height());
    let mut blurred = GrayscaleImage::zeroed(width, height)?;
    if width < 3 || height < 3 {
        return Ok(blurred);
    }

    let src = gray.as_raw();
    let stride = width as usize;
    let out = blurred.as_raw_mut();

    for y in 1..(height as usize - 1) {
        for x in 1..(stride - 1) {
            let mut sum = 0u32;
            for (ky, row) in KERNEL.iter().enumerate() {
                let base = (y + ky - 1) * stride + x - 1;
                for (kx, weight) in row.iter().enumerate() {
                    sum += weight * src[base + kx] as u32;
                }
            }
            // Round to nearest, halves up.
            out[y * stride + x] = ((sum + KERNEL_WEIGHT / 2) / KERNEL_WEIGHT) as u8;
        }
    }

    Ok(blurred)
}
