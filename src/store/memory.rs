//! In-memory record store.

use super::{Inserted, RecordStore, StoreError, find_same_content};
use crate::fingerprint::Fingerprint;
use crate::types::ImageRecord;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<Uuid, ImageRecord>,
    /// Fingerprint → ids, in insertion order.
    by_fingerprint: HashMap<Fingerprint, Vec<Uuid>>,
}

/// Mutex-guarded map of records with a fingerprint index.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        // Records are only ever inserted whole, so a poisoned guard still
        // holds a consistent map.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, record: ImageRecord) -> Result<Inserted, StoreError> {
        if record.payload.is_empty() {
            return Err(StoreError::EmptyPayload);
        }
        let mut records = self.lock();
        if records.by_id.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }

        let bucket = records
            .by_fingerprint
            .get(&record.fingerprint)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let candidates = bucket.iter().filter_map(|id| records.by_id.get(id));
        if let Some(existing) = find_same_content(candidates, &record.payload) {
            return Ok(Inserted::Existing(existing.id));
        }

        let id = record.id;
        records
            .by_fingerprint
            .entry(record.fingerprint.clone())
            .or_default()
            .push(id);
        records.by_id.insert(id, record);
        Ok(Inserted::Created(id))
    }

    fn get(&self, id: Uuid) -> Result<Option<ImageRecord>, StoreError> {
        Ok(self.lock().by_id.get(&id).cloned())
    }

    fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<ImageRecord>, StoreError> {
        let records = self.lock();
        let found = records
            .by_fingerprint
            .get(fingerprint)
            .into_iter()
            .flatten()
            .filter_map(|id| records.by_id.get(id).cloned())
            .collect();
        Ok(found)
    }
}
