//! High-level image operations.
//!
//! These functions combine the geometry calculations with codec execution:
//! decode the source, resolve the output size, resample, encode.

use super::codec::{CodecError, Dimensions, ImageCodec};
use super::geometry::resolve_dimensions;
use super::params::{Quality, ResizeTarget};
use crate::types::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Resolved output size {width}x{height} has a zero side")]
    ZeroSize { width: u32, height: u32 },
    #[error("Resolved output size {width}x{height} exceeds the {max} pixel limit")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ResizeError>;

/// An encoded output image and its dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Plan the output size without touching pixels.
///
/// Fails when the resolved size has a zero side, which happens for extreme
/// aspect ratios (e.g. width 1 of a 200x100 source), or when either side
/// exceeds `target.max_side` (e.g. width 16384 of a 1x16384 source derives
/// a height of 268435456).
pub fn plan_output_size(target: &ResizeTarget, source: Dimensions) -> Result<Dimensions> {
    let (width, height) = resolve_dimensions(
        target.width,
        target.height,
        target.keep_aspect_ratio,
        (source.width, source.height),
    );
    if width == 0 || height == 0 {
        return Err(ResizeError::ZeroSize { width, height });
    }
    if width > target.max_side || height > target.max_side {
        return Err(ResizeError::TooLarge {
            width,
            height,
            max: target.max_side,
        });
    }
    Ok(Dimensions { width, height })
}

/// Decode `source`, resize it to the planned size and encode it as `format`.
pub fn resize_and_encode(
    codec: &impl ImageCodec,
    source: &[u8],
    target: &ResizeTarget,
    format: ImageFormat,
    quality: Quality,
) -> Result<EncodedImage> {
    let decoded = codec.decode(source)?;
    let source_dims = codec.dimensions(&decoded);
    let out = plan_output_size(target, source_dims)?;

    tracing::debug!(
        source_width = source_dims.width,
        source_height = source_dims.height,
        width = out.width,
        height = out.height,
        "resizing"
    );

    let resized = codec.resize(&decoded, out.width, out.height);
    let bytes = codec.encode(&resized, format, quality)?;

    Ok(EncodedImage {
        bytes,
        width: out.width,
        height: out.height,
    })
}
