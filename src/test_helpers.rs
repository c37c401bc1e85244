//! Shared test utilities for the image-repo test suite.
//!
//! Synthesizes small encoded images in memory so codec and pipeline tests
//! run against real PNG/JPEG bytes without checked-in fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let source = jpeg_bytes(200, 100);
//! let tmp = TempDir::new().unwrap();
//! write_image(tmp.path(), "cat.jpg", &source);
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

/// Horizontal gradient so resizes and re-encodes produce non-trivial output.
fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

// =========================================================================
// Encoded sources
// =========================================================================

/// A `width`x`height` RGB JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_rgb(width, height);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// A `width`x`height` RGB PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_rgb(width, height);
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// A `width`x`height` PNG with a half-transparent alpha channel.
pub fn rgba_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| Rgba([200, (x % 256) as u8, 40, 128]));
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    out
}

// =========================================================================
// Filesystem
// =========================================================================

/// Write `bytes` to `dir/name`, creating parent directories. Returns the path.
pub fn write_image(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}
