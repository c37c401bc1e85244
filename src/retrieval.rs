//! Reading stored images back by id.
//!
//! Both reads treat "no record" and "record without payload" the same way:
//! [`LookupError::NotFound`].

use crate::store::{RecordStore, StoreError};
use crate::types::{ImageFormat, ImageInfo};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("No image with id {0}")]
    NotFound(Uuid),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Encoded bytes of a stored image and the format they are in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPayload {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl StoredPayload {
    /// MIME type derived from the stored format tag (`image/png`, `image/jpeg`).
    pub fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Fetch the encoded payload of a record.
pub fn fetch_payload(store: &impl RecordStore, id: Uuid) -> Result<StoredPayload, LookupError> {
    match store.get(id)? {
        Some(record) if !record.payload.is_empty() => Ok(StoredPayload {
            bytes: record.payload,
            format: record.format,
        }),
        _ => Err(LookupError::NotFound(id)),
    }
}

/// Fetch a record's metadata without its payload.
pub fn fetch_info(store: &impl RecordStore, id: Uuid) -> Result<ImageInfo, LookupError> {
    match store.info(id)? {
        Some(info) if info.size > 0 => Ok(info),
        _ => Err(LookupError::NotFound(id)),
    }
}
