//! Pure Rust codec built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with content sniffing |
//! | Resize | `image::DynamicImage::resize_exact` with the configured filter (Lanczos3 default) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the requested quality |
//!
//! Input format is detected from the bytes, never from the file name, since
//! uploads carry display-only names.

use super::codec::{CodecError, Dimensions, ImageCodec};
use super::params::{Quality, ResizeFilter};
use crate::types::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// File extensions the decoders compiled into this build can read.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    SUPPORTED_EXTENSIONS
}

/// Codec backed by the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCodec {
    filter: ResizeFilter,
}

impl RustCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: ResizeFilter) -> Self {
        Self { filter }
    }
}

fn filter_type(filter: ResizeFilter) -> FilterType {
    match filter {
        ResizeFilter::Nearest => FilterType::Nearest,
        ResizeFilter::Triangle => FilterType::Triangle,
        ResizeFilter::CatmullRom => FilterType::CatmullRom,
        ResizeFilter::Gaussian => FilterType::Gaussian,
        ResizeFilter::Lanczos3 => FilterType::Lanczos3,
    }
}

/// Convert to a pixel layout the target encoder accepts.
///
/// JPEG has no alpha channel and no 16-bit mode, so everything goes through
/// RGB8 (grayscale stays L8). PNG takes 8 and 16-bit layouts but not float.
fn encodable(img: &DynamicImage, format: ImageFormat) -> Option<DynamicImage> {
    match (format, img) {
        (ImageFormat::Jpeg, DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_)) => None,
        (ImageFormat::Jpeg, _) => Some(DynamicImage::ImageRgb8(img.to_rgb8())),
        (ImageFormat::Png, DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)) => {
            Some(DynamicImage::ImageRgba8(img.to_rgba8()))
        }
        (ImageFormat::Png, _) => None,
    }
}

impl ImageCodec for RustCodec {
    type Buffer = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CodecError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn dimensions(&self, buffer: &DynamicImage) -> Dimensions {
        Dimensions {
            width: buffer.width(),
            height: buffer.height(),
        }
    }

    fn resize(&self, buffer: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        buffer.resize_exact(width, height, filter_type(self.filter))
    }

    fn encode(
        &self,
        buffer: &DynamicImage,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        let converted = encodable(buffer, format);
        let img = converted.as_ref().unwrap_or(buffer);

        let mut out = Vec::new();
        let written = match format {
            ImageFormat::Png => img.write_with_encoder(PngEncoder::new(&mut out)),
            ImageFormat::Jpeg => img.write_with_encoder(JpegEncoder::new_with_quality(
                &mut out,
                quality.value() as u8,
            )),
        };
        written.map_err(|e| CodecError::Encode(format!("{format}: {e}")))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{jpeg_bytes, png_bytes, rgba_png_bytes};

    #[test]
    fn supported_extensions_cover_common_uploads() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let codec = RustCodec::new();
        let img = codec.decode(&jpeg_bytes(200, 150)).unwrap();
        assert_eq!(
            codec.dimensions(&img),
            Dimensions {
                width: 200,
                height: 150
            }
        );
    }

    #[test]
    fn decode_garbage_errors() {
        let codec = RustCodec::new();
        let result = codec.decode(b"definitely not an image");
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn decode_truncated_png_errors() {
        let codec = RustCodec::new();
        let bytes = png_bytes(64, 64);
        let result = codec.decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn resize_produces_exact_dimensions() {
        let codec = RustCodec::new();
        let img = codec.decode(&jpeg_bytes(400, 300)).unwrap();
        // Distorting resize: aspect ratio is not preserved
        let resized = codec.resize(&img, 50, 120);
        assert_eq!((resized.width(), resized.height()), (50, 120));
    }

    #[test]
    fn encode_png_roundtrip_dimensions() {
        let codec = RustCodec::new();
        let img = codec.decode(&jpeg_bytes(200, 100)).unwrap();
        let resized = codec.resize(&img, 100, 50);
        let bytes = codec
            .encode(&resized, ImageFormat::Png, Quality::BEST)
            .unwrap();

        assert!(bytes.starts_with(b"\x89PNG"));
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[test]
    fn encode_jpeg_flattens_alpha() {
        let codec = RustCodec::new();
        let img = codec.decode(&rgba_png_bytes(32, 16)).unwrap();
        let bytes = codec
            .encode(&img, ImageFormat::Jpeg, Quality::BEST)
            .unwrap();

        assert!(bytes.starts_with(&[0xFF, 0xD8]));
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn resize_and_encode_is_deterministic() {
        let codec = RustCodec::new();
        let source = jpeg_bytes(300, 200);
        let run = || {
            let img = codec.decode(&source).unwrap();
            let resized = codec.resize(&img, 120, 80);
            codec
                .encode(&resized, ImageFormat::Jpeg, Quality::BEST)
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn with_filter_is_kept() {
        let codec = RustCodec::with_filter(ResizeFilter::Nearest);
        let img = codec.decode(&png_bytes(10, 10)).unwrap();
        let resized = codec.resize(&img, 3, 7);
        assert_eq!((resized.width(), resized.height()), (3, 7));
    }
}
