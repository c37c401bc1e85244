//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait defines the four operations every codec must
//! support: decode, dimensions, resize and encode. The import pipeline only
//! talks to this trait, so the imaging library behind it can be swapped per
//! platform (or replaced by a mock in tests) without touching pipeline logic.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_codec::RustCodec), built on the `image` crate.

use super::params::Quality;
use crate::types::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Not a recognizable image: {0}")]
    Decode(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of a decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image codecs.
///
/// Implementations must be deterministic: the same buffer resized to the same
/// size and encoded with the same format and quality yields the same bytes.
/// Content dedup depends on it.
pub trait ImageCodec: Sync {
    /// Decoded pixel buffer.
    type Buffer;

    /// Decode an encoded image. Fails with [`CodecError::Decode`] when the
    /// bytes are not an image this codec understands.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Buffer, CodecError>;

    fn dimensions(&self, buffer: &Self::Buffer) -> Dimensions;

    /// Resample to exactly `width` × `height` (both non-zero).
    fn resize(&self, buffer: &Self::Buffer, width: u32, height: u32) -> Self::Buffer;

    /// Encode into `format`. Fails with [`CodecError::Encode`] when the format
    /// or pixel layout cannot be written.
    fn encode(
        &self,
        buffer: &Self::Buffer,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock codec with a trivial wire format, so pipeline tests run without
    /// real image encoding.
    ///
    /// Source bytes are `width:u32le ++ height:u32le ++ content`; see
    /// [`mock_source`]. Encoded output is `format tag ++ width ++ height ++
    /// content`, so two imports with the same content and geometry produce
    /// identical payloads. Uses Mutex (not RefCell) so it is Sync.
    #[derive(Default)]
    pub struct MockCodec {
        pub operations: Mutex<Vec<RecordedOp>>,
        pub fail_encode: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct MockImage {
        pub width: u32,
        pub height: u32,
        pub content: Vec<u8>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(usize),
        Resize { width: u32, height: u32 },
        Encode { format: ImageFormat, quality: u32 },
    }

    /// Build source bytes the mock codec decodes as a `width` × `height` image.
    pub fn mock_source(width: u32, height: u32, content: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + content.len());
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend_from_slice(content);
        bytes
    }

    impl MockCodec {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_encode() -> Self {
            Self {
                fail_encode: true,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageCodec for MockCodec {
        type Buffer = MockImage;

        fn decode(&self, bytes: &[u8]) -> Result<MockImage, CodecError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(bytes.len()));

            if bytes.len() < 8 {
                return Err(CodecError::Decode("mock header too short".into()));
            }
            let width = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
            let height = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
            if width == 0 || height == 0 {
                return Err(CodecError::Decode("mock image has a zero side".into()));
            }
            Ok(MockImage {
                width,
                height,
                content: bytes[8..].to_vec(),
            })
        }

        fn dimensions(&self, buffer: &MockImage) -> Dimensions {
            Dimensions {
                width: buffer.width,
                height: buffer.height,
            }
        }

        fn resize(&self, buffer: &MockImage, width: u32, height: u32) -> MockImage {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Resize { width, height });
            MockImage {
                width,
                height,
                content: buffer.content.clone(),
            }
        }

        fn encode(
            &self,
            buffer: &MockImage,
            format: ImageFormat,
            quality: Quality,
        ) -> Result<Vec<u8>, CodecError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format,
                quality: quality.value(),
            });
            if self.fail_encode {
                return Err(CodecError::Encode(format!("mock cannot write {format}")));
            }
            let mut out = format.as_str().as_bytes().to_vec();
            out.extend_from_slice(&buffer.width.to_le_bytes());
            out.extend_from_slice(&buffer.height.to_le_bytes());
            out.extend_from_slice(&buffer.content);
            Ok(out)
        }
    }

    #[test]
    fn mock_decodes_header() {
        let codec = MockCodec::new();
        let img = codec.decode(&mock_source(800, 600, b"pixels")).unwrap();
        assert_eq!(
            codec.dimensions(&img),
            Dimensions {
                width: 800,
                height: 600
            }
        );
        assert_eq!(img.content, b"pixels");
    }

    #[test]
    fn mock_rejects_garbage() {
        let codec = MockCodec::new();
        assert!(matches!(codec.decode(b"nope"), Err(CodecError::Decode(_))));
        assert!(matches!(
            codec.decode(&mock_source(0, 10, b"")),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn mock_records_resize_and_encode() {
        let codec = MockCodec::new();
        let img = codec.decode(&mock_source(10, 10, b"x")).unwrap();
        let small = codec.resize(&img, 5, 4);
        codec
            .encode(&small, ImageFormat::Png, Quality::BEST)
            .unwrap();

        let ops = codec.get_operations();
        assert_eq!(ops.len(), 3);
        assert_eq!(
            ops[1],
            RecordedOp::Resize {
                width: 5,
                height: 4
            }
        );
        assert!(matches!(
            ops[2],
            RecordedOp::Encode {
                format: ImageFormat::Png,
                quality: 100
            }
        ));
    }

    #[test]
    fn mock_encode_is_deterministic() {
        let codec = MockCodec::new();
        let img = codec.decode(&mock_source(3, 2, b"abc")).unwrap();
        let a = codec.encode(&img, ImageFormat::Jpeg, Quality::BEST).unwrap();
        let b = codec.encode(&img, ImageFormat::Jpeg, Quality::BEST).unwrap();
        assert_eq!(a, b);
        let png = codec.encode(&img, ImageFormat::Png, Quality::BEST).unwrap();
        assert_ne!(a, png);
    }
}
