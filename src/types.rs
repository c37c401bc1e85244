//! Record types shared by the pipeline, the stores and the CLI.
//!
//! These are serialized into the on-disk store index and printed by
//! `info --json`, so field names are part of the storage format.

use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Target raster encodings. Output is always one of these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Canonical lowercase tag stored with each record.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    /// File extension used for stored blobs and `get` output.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a format name is not one of the supported encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown image format '{}' (expected png or jpeg)", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

impl FromStr for ImageFormat {
    type Err = UnknownFormat;

    /// Case-insensitive: `PNG`, `Jpeg`, `jpg` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("png") {
            Ok(ImageFormat::Png)
        } else if name.eq_ignore_ascii_case("jpeg") || name.eq_ignore_ascii_case("jpg") {
            Ok(ImageFormat::Jpeg)
        } else {
            Err(UnknownFormat(s.to_string()))
        }
    }
}

/// A stored image. Created once by the import pipeline, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: Uuid,
    pub payload: Vec<u8>,
    /// Name of the uploaded file. Informational only, never a dedup key.
    pub file_name: String,
    pub format: ImageFormat,
    /// Stored (post-resize) dimensions.
    pub width: u32,
    pub height: u32,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Build a new record: fresh id, current UTC timestamp, fingerprint
    /// derived from `payload`.
    pub fn new(
        payload: Vec<u8>,
        file_name: impl Into<String>,
        format: ImageFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let fingerprint = Fingerprint::of(&payload);
        Self {
            id: Uuid::new_v4(),
            payload,
            file_name: file_name.into(),
            format,
            width,
            height,
            fingerprint,
            created_at: Utc::now(),
        }
    }

    /// Metadata view of this record.
    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            id: self.id,
            file_name: self.file_name.clone(),
            format: self.format,
            created_at: self.created_at,
            width: self.width,
            height: self.height,
            size: self.payload.len() as u64,
        }
    }
}

/// Everything about a record except its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: Uuid,
    pub file_name: String,
    pub format: ImageFormat,
    pub created_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    /// Payload length in bytes.
    pub size: u64,
}
