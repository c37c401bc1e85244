//! Image processing: geometry, decode, resize, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from bytes) |
//! | **Resize** | `resize_exact`, Lanczos3 by default |
//! | **Encode → PNG / JPEG** | `PngEncoder` / `JpegEncoder` at quality 100 |
//!
//! The module is split into:
//! - **Geometry**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Codec**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Operations**: High-level functions combining geometry + codec

pub mod codec;
mod geometry;
pub mod operations;
mod params;
pub mod rust_codec;

pub use codec::{CodecError, Dimensions, ImageCodec};
pub use geometry::resolve_dimensions;
pub use operations::{EncodedImage, ResizeError, plan_output_size, resize_and_encode};
pub use params::{Quality, ResizeFilter, ResizeTarget};
pub use rust_codec::{RustCodec, supported_input_extensions};
