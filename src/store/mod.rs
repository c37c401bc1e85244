//! Record storage.
//!
//! The import pipeline persists through the [`RecordStore`] trait and never
//! holds a global handle. Two implementations ship:
//!
//! | Store | Use |
//! |---|---|
//! | [`MemoryStore`] | Tests and embedding; nothing survives the process |
//! | [`FileStore`] | The CLI; a directory with a JSON index and one blob per record |
//!
//! # Contract
//!
//! Records are create-and-read only. [`RecordStore::insert`] is an atomic
//! check-and-insert: when a record with the same fingerprint **and** the same
//! payload bytes already exists, nothing is written and the existing id comes
//! back as [`Inserted::Existing`]. This closes the race between two
//! concurrent imports of identical content that both miss the pipeline's
//! lookup. A store that answers `Existing` is reporting a dedup hit, not an
//! error.

mod fs;
mod memory;

pub use fs::FileStore;
pub use memory::MemoryStore;

use crate::fingerprint::{Fingerprint, same_content};
use crate::types::{ImageInfo, ImageRecord};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store index {path} is unusable: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("Refusing to store an empty payload")]
    EmptyPayload,
    #[error("Record id {0} is already taken")]
    DuplicateId(Uuid),
}

/// Outcome of [`RecordStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    /// The record was written under its own id.
    Created(Uuid),
    /// Identical content was already stored under this id; nothing written.
    Existing(Uuid),
}

impl Inserted {
    pub fn id(self) -> Uuid {
        match self {
            Inserted::Created(id) | Inserted::Existing(id) => id,
        }
    }
}

/// Persistence for image records.
pub trait RecordStore: Send + Sync {
    /// Atomically store `record` unless identical content already exists.
    fn insert(&self, record: ImageRecord) -> Result<Inserted, StoreError>;

    /// Full record, payload included.
    fn get(&self, id: Uuid) -> Result<Option<ImageRecord>, StoreError>;

    /// All records whose fingerprint equals `fingerprint`. Collisions are
    /// possible; callers compare payloads.
    fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<ImageRecord>, StoreError>;

    /// Metadata only. Stores that keep payloads out of line override this to
    /// avoid reading them.
    fn info(&self, id: Uuid) -> Result<Option<ImageInfo>, StoreError> {
        Ok(self.get(id)?.map(|record| record.info()))
    }
}

/// Find the record among `candidates` whose payload equals `payload`.
pub(crate) fn find_same_content<'a>(
    candidates: impl IntoIterator<Item = &'a ImageRecord>,
    payload: &[u8],
) -> Option<&'a ImageRecord> {
    candidates
        .into_iter()
        .find(|candidate| same_content(&candidate.payload, payload))
}
