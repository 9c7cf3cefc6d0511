// Helpers for writing intermediate stage buffers to disk as PNG files.

use crate::pipeline::StageImages;
use image::ImageEncoder;
use std::path::{Path, PathBuf};

/// Writes an 8-bit grayscale image as a PNG file.
pub fn save_luma(path: &Path, img: &image::GrayImage) -> Result<(), image::error::ImageError> {
    let output = std::fs::File::create(path)?;
    let encoder = image::codecs::png::PngEncoder::new(std::io::BufWriter::new(output));
    encoder.write_image(img.as_raw(), img.width(), img.height(), image::ExtendedColorType::L8)?;
    Ok(())
}

/// Writes `gray.png`, `blurred.png`, `mask.png` and `eroded.png` into `dir`.
/// Returns the written paths in that order.
pub fn save_stages(dir: &Path, stages: &StageImages) -> Result<Vec<PathBuf>, image::error::ImageError> {
    std::fs::create_dir_all(dir)?;
    let outputs = [
        ("gray.png", stages.grayscale.to_luma_image()),
        ("blurred.png", stages.blurred.to_luma_image()),
        ("mask.png", stages.mask.to_luma_image()),
        ("eroded.png", stages.eroded.to_luma_image()),
    ];

    let mut written = Vec::with_capacity(outputs.len());
    for (name, img) in outputs {
        let path = dir.join(name);
        save_luma(&path, &img)?;
        written.push(path);
    }
    Ok(written)
}
