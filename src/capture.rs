//! Screenshot I/O module
//! Loads uploaded screenshots into 3-channel RGB buffers (alpha is dropped)
//! and writes crops and annotated images back to disk.
//! Decoding and format support come from the `image` crate.

use anyhow::{bail, Context, Result};
use image::{DynamicImage, GenericImageView, RgbImage};
use log::debug;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Converts a decoded image of any pixel layout to RGB, dropping alpha.
pub fn to_rgb(image: &DynamicImage) -> Result<RgbImage> {
    if image.dimensions() == (0, 0) {
        bail!("Decoded an empty image - nothing to detect");
    }
    Ok(image.to_rgb8())
}

/// Loads a screenshot from disk as RGB.
pub fn load_screenshot(path: &Path) -> Result<RgbImage> {
    let start = Instant::now();

    let decoded = image::open(path)
        .with_context(|| format!("Failed to decode screenshot {}", path.display()))?;
    let rgb = to_rgb(&decoded).with_context(|| format!("Unusable screenshot {}", path.display()))?;

    debug!(
        "Loaded {} ({}x{}) in {:?}",
        path.display(),
        rgb.width(),
        rgb.height(),
        start.elapsed()
    );
    Ok(rgb)
}

/// Saves an RGB image, creating the parent directory when missing.
/// The format follows the file extension.
pub fn save_image(path: &Path, image: &RgbImage) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    image
        .save(path)
        .with_context(|| format!("Failed to save image to {}", path.display()))
}
