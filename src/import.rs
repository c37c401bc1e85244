//! The image import pipeline.
//!
//! ```text
//! request ─► validate ─► decode ─► resize ─► encode ─► fingerprint ─► dedup ─► insert
//!            (format,     └──── imaging::resize_and_encode ────┘                 │
//!             dimensions,                                                          ▼
//!             input)                                              (id, already_existed)
//! ```
//!
//! # Validation
//!
//! Everything that can be checked without pixels is checked first, so an
//! invalid request never costs a decode:
//!
//! 1. `target_format` must name one of the [`ImageFormat`]s (any case).
//! 2. Dimensions depend on the mode. With `keep_aspect_ratio`, exactly one of
//!    width/height is positive and the other (`<= 0`) is derived. Without it,
//!    both must be positive. Positive sides are capped by
//!    [`ImportOptions::max_dimension`].
//! 3. The source must be non-empty.
//!
//! # Dedup
//!
//! The encoded output is fingerprinted and the store is asked for every record
//! in that fingerprint bucket. A candidate only counts as a duplicate when its
//! payload is byte-identical. On a hit the existing id is returned and nothing
//! is written. On a miss a new record is inserted; the store repeats the
//! check under its own lock and may still report an existing id when a
//! concurrent import of the same content won the race.

use crate::config::RepoConfig;
use crate::fingerprint::Fingerprint;
use crate::imaging::{
    CodecError, ImageCodec, Quality, ResizeError, ResizeFilter, ResizeTarget, RustCodec,
    resize_and_encode,
};
use crate::store::{Inserted, RecordStore, StoreError, find_same_content};
use crate::types::{ImageFormat, ImageRecord};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid target format: {0}")]
    InvalidFormat(String),
    #[error("Invalid target dimensions: {0}")]
    InvalidDimensions(String),
    #[error("No image data uploaded")]
    EmptyInput,
    #[error("Could not decode source image: {0}")]
    Decode(String),
    #[error("Could not encode image: {0}")]
    Encode(String),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Could not read source: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ResizeError> for ImportError {
    fn from(err: ResizeError) -> Self {
        match err {
            ResizeError::Codec(CodecError::Decode(msg)) => ImportError::Decode(msg),
            ResizeError::Codec(CodecError::Encode(msg)) => ImportError::Encode(msg),
            ResizeError::ZeroSize { width, height } => ImportError::InvalidDimensions(format!(
                "resolved output size {width}x{height} has a zero side"
            )),
            ResizeError::TooLarge { width, height, max } => ImportError::InvalidDimensions(
                format!("resolved output size {width}x{height} exceeds the {max} pixel limit"),
            ),
        }
    }
}

/// One upload to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// Requested width; `<= 0` means "derive" in aspect-ratio mode.
    pub target_width: i32,
    /// Requested height; `<= 0` means "derive" in aspect-ratio mode.
    pub target_height: i32,
    pub keep_aspect_ratio: bool,
    /// Format name as supplied by the caller, matched case-insensitively.
    pub target_format: String,
    /// Encoded source image.
    pub source: Vec<u8>,
    /// Display name of the upload. Stored, never used for dedup.
    pub file_name: String,
}

/// Store-wide import settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Largest accepted target side, in pixels.
    pub max_dimension: u32,
    pub filter: ResizeFilter,
    pub quality: Quality,
}

impl ImportOptions {
    pub fn from_config(config: &RepoConfig) -> Self {
        Self {
            max_dimension: config.import.max_dimension,
            filter: config.import.filter,
            quality: Quality::BEST,
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from_config(&RepoConfig::default())
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub id: Uuid,
    /// True when identical content was already stored and nothing was written.
    pub already_existed: bool,
    pub format: ImageFormat,
    /// Stored dimensions.
    pub width: u32,
    pub height: u32,
}

/// A request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub target: ResizeTarget,
    pub format: ImageFormat,
}

/// Check a request without decoding anything.
pub fn validate(
    request: &ImportRequest,
    options: &ImportOptions,
) -> Result<ValidatedRequest, ImportError> {
    let valid = validate_params(
        request.target_width,
        request.target_height,
        request.keep_aspect_ratio,
        &request.target_format,
        options,
    )?;
    if request.source.is_empty() {
        return Err(ImportError::EmptyInput);
    }
    Ok(valid)
}

/// Check the resize parameters alone. Batch imports run this once up front
/// since every file shares them.
pub fn validate_params(
    target_width: i32,
    target_height: i32,
    keep_aspect_ratio: bool,
    target_format: &str,
    options: &ImportOptions,
) -> Result<ValidatedRequest, ImportError> {
    let format: ImageFormat = target_format
        .parse()
        .map_err(|_| ImportError::InvalidFormat(target_format.to_string()))?;

    let (w, h) = (target_width, target_height);
    if keep_aspect_ratio {
        if (w > 0) == (h > 0) {
            return Err(ImportError::InvalidDimensions(format!(
                "{w}x{h}: keeping the aspect ratio needs exactly one positive side"
            )));
        }
    } else if w <= 0 || h <= 0 {
        return Err(ImportError::InvalidDimensions(format!(
            "{w}x{h}: both sides must be positive"
        )));
    }

    let largest = w.max(h);
    if largest as i64 > options.max_dimension as i64 {
        return Err(ImportError::InvalidDimensions(format!(
            "{w}x{h}: sides are limited to {} pixels",
            options.max_dimension
        )));
    }

    Ok(ValidatedRequest {
        target: ResizeTarget {
            width: w,
            height: h,
            keep_aspect_ratio,
            max_side: options.max_dimension,
        },
        format,
    })
}

/// Import with the default [`RustCodec`], configured from `options`.
pub fn import(
    store: &impl RecordStore,
    request: &ImportRequest,
    options: &ImportOptions,
) -> Result<ImportOutcome, ImportError> {
    let codec = RustCodec::with_filter(options.filter);
    import_image(&codec, store, request, options)
}

/// Import using a specific codec (allows testing with a mock).
pub fn import_image(
    codec: &impl ImageCodec,
    store: &impl RecordStore,
    request: &ImportRequest,
    options: &ImportOptions,
) -> Result<ImportOutcome, ImportError> {
    let valid = validate(request, options)?;
    debug!(
        file = %request.file_name,
        format = %valid.format,
        width = request.target_width,
        height = request.target_height,
        keep_aspect_ratio = request.keep_aspect_ratio,
        "importing"
    );

    let encoded = resize_and_encode(
        codec,
        &request.source,
        &valid.target,
        valid.format,
        options.quality,
    )?;
    let fingerprint = Fingerprint::of(&encoded.bytes);
    debug!(%fingerprint, bytes = encoded.bytes.len(), "encoded");

    let candidates = store.find_by_fingerprint(&fingerprint)?;
    if let Some(existing) = find_same_content(&candidates, &encoded.bytes) {
        info!(id = %existing.id, file = %request.file_name, "image already stored");
        return Ok(ImportOutcome {
            id: existing.id,
            already_existed: true,
            format: existing.format,
            width: existing.width,
            height: existing.height,
        });
    }

    let record = ImageRecord::new(
        encoded.bytes,
        request.file_name.as_str(),
        valid.format,
        encoded.width,
        encoded.height,
    );
    let inserted = store.insert(record)?;
    match inserted {
        Inserted::Created(id) => info!(
            %id,
            file = %request.file_name,
            width = encoded.width,
            height = encoded.height,
            format = %valid.format,
            "stored image"
        ),
        Inserted::Existing(id) => info!(%id, file = %request.file_name, "image stored concurrently"),
    }

    Ok(ImportOutcome {
        id: inserted.id(),
        already_existed: matches!(inserted, Inserted::Existing(_)),
        format: valid.format,
        width: encoded.width,
        height: encoded.height,
    })
}
