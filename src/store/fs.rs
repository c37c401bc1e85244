//! On-disk record store.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//! ├── config.toml          # optional store configuration
//! ├── index.json           # record metadata, keyed by id
//! └── blobs/
//!     ├── <id>.png         # encoded payloads, one file per record
//!     └── <id>.jpg
//! ```
//!
//! The index holds everything except payloads, including each payload's
//! size, so `info` only stats a blob to confirm it is intact. At load time a runtime fingerprint → ids map is rebuilt from the
//! index; it is never serialized.
//!
//! ## Atomicity
//!
//! An insert writes the blob to a hidden temp file and renames it into
//! place, then rewrites the index the same way. A record becomes visible
//! only when the renamed index lands. A crash in between leaves an orphan
//! blob that no index entry points to, never a half-written record. An
//! index entry whose blob has gone missing, or no longer has the recorded
//! size, reads as absent.
//!
//! All inserts go through one mutex, so within a process the dedup check and
//! the write are atomic. Separate processes sharing one directory are not
//! coordinated.
//!
//! Unlike a cache, the index is the only copy of the metadata: a corrupt or
//! future-version index is an error, not a reason to start empty.

use super::{Inserted, RecordStore, StoreError};
use crate::fingerprint::{Fingerprint, same_content};
use crate::types::{ImageFormat, ImageInfo, ImageRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Name of the index file within the store root.
const INDEX_FILENAME: &str = "index.json";

/// Directory holding payload blobs.
const BLOB_DIR: &str = "blobs";

/// Version of the index format. Bump when the entry layout changes.
const INDEX_VERSION: u32 = 1;

/// Metadata for one stored record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct IndexEntry {
    file_name: String,
    format: ImageFormat,
    width: u32,
    height: u32,
    fingerprint: Fingerprint,
    created_at: DateTime<Utc>,
    /// Payload length in bytes, checked against the blob on every read.
    size: u64,
}

impl IndexEntry {
    fn from_record(record: &ImageRecord) -> Self {
        Self {
            file_name: record.file_name.clone(),
            format: record.format,
            width: record.width,
            height: record.height,
            fingerprint: record.fingerprint.clone(),
            created_at: record.created_at,
            size: record.payload.len() as u64,
        }
    }

    fn into_record(self, id: Uuid, payload: Vec<u8>) -> ImageRecord {
        ImageRecord {
            id,
            payload,
            file_name: self.file_name,
            format: self.format,
            width: self.width,
            height: self.height,
            fingerprint: self.fingerprint,
            created_at: self.created_at,
        }
    }

    fn to_info(&self, id: Uuid) -> ImageInfo {
        ImageInfo {
            id,
            file_name: self.file_name.clone(),
            format: self.format,
            created_at: self.created_at,
            width: self.width,
            height: self.height,
            size: self.size,
        }
    }

    /// False when the blob was truncated or replaced after the insert.
    fn matches_blob(&self, id: Uuid, blob_len: u64) -> bool {
        if blob_len == self.size {
            return true;
        }
        tracing::warn!(
            %id,
            expected = self.size,
            actual = blob_len,
            "blob size does not match index, treating record as absent"
        );
        false
    }
}

/// On-disk index mapping record ids to their metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Index {
    version: u32,
    records: BTreeMap<Uuid, IndexEntry>,
    /// Runtime reverse index: fingerprint → ids. Built at load time,
    /// maintained on insert. Never serialized.
    #[serde(skip)]
    by_fingerprint: HashMap<Fingerprint, Vec<Uuid>>,
}

impl Index {
    fn empty() -> Self {
        Self {
            version: INDEX_VERSION,
            records: BTreeMap::new(),
            by_fingerprint: HashMap::new(),
        }
    }

    fn load(path: &Path) -> Result<Self, StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(e) => return Err(e.into()),
        };
        let mut index: Self = serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if index.version != INDEX_VERSION {
            return Err(StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "index version {} is not supported (expected {})",
                    index.version, INDEX_VERSION
                ),
            });
        }
        index.by_fingerprint = build_fingerprint_index(&index.records);
        Ok(index)
    }

    fn insert(&mut self, id: Uuid, entry: IndexEntry) {
        self.by_fingerprint
            .entry(entry.fingerprint.clone())
            .or_default()
            .push(id);
        self.records.insert(id, entry);
    }

    fn remove(&mut self, id: Uuid) {
        if let Some(entry) = self.records.remove(&id)
            && let Some(ids) = self.by_fingerprint.get_mut(&entry.fingerprint)
        {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_fingerprint.remove(&entry.fingerprint);
            }
        }
    }

    fn ids_for(&self, fingerprint: &Fingerprint) -> Vec<Uuid> {
        self.by_fingerprint
            .get(fingerprint)
            .cloned()
            .unwrap_or_default()
    }
}

/// Build the fingerprint reverse map from the records map.
fn build_fingerprint_index(
    records: &BTreeMap<Uuid, IndexEntry>,
) -> HashMap<Fingerprint, Vec<Uuid>> {
    let mut index: HashMap<Fingerprint, Vec<Uuid>> = HashMap::new();
    for (id, entry) in records {
        index.entry(entry.fingerprint.clone()).or_default().push(*id);
    }
    index
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

/// Read a blob, mapping "file missing" to `None`.
fn read_blob(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Directory-backed [`RecordStore`]. See the [module docs](self).
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    index: Mutex<Index>,
}

impl FileStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(BLOB_DIR))?;
        let index = Index::load(&root.join(INDEX_FILENAME))?;
        tracing::debug!(
            root = %root.display(),
            records = index.records.len(),
            "opened file store"
        );
        Ok(Self {
            root,
            index: Mutex::new(index),
        })
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the blob holding a record's payload.
    pub fn blob_path(&self, id: Uuid, format: ImageFormat) -> PathBuf {
        self.root
            .join(BLOB_DIR)
            .join(format!("{id}.{}", format.extension()))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILENAME)
    }

    fn lock(&self) -> MutexGuard<'_, Index> {
        // The in-memory index is only changed after a successful disk write
        // (or rolled back), so a poisoned guard is still consistent.
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, index: &Index) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(index)?;
        write_atomic(&self.index_path(), &json)?;
        Ok(())
    }

    fn load_record(&self, id: Uuid, entry: IndexEntry) -> Result<Option<ImageRecord>, StoreError> {
        let payload = read_blob(&self.blob_path(id, entry.format))?
            .filter(|bytes| entry.matches_blob(id, bytes.len() as u64));
        Ok(payload.map(|bytes| entry.into_record(id, bytes)))
    }
}

impl RecordStore for FileStore {
    fn insert(&self, record: ImageRecord) -> Result<Inserted, StoreError> {
        if record.payload.is_empty() {
            return Err(StoreError::EmptyPayload);
        }
        let mut index = self.lock();
        if index.records.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }

        for id in index.ids_for(&record.fingerprint) {
            let Some(entry) = index.records.get(&id) else {
                continue;
            };
            if let Some(stored) = read_blob(&self.blob_path(id, entry.format))?
                && same_content(&stored, &record.payload)
            {
                return Ok(Inserted::Existing(id));
            }
        }

        let id = record.id;
        let blob = self.blob_path(id, record.format);
        write_atomic(&blob, &record.payload)?;

        index.insert(id, IndexEntry::from_record(&record));
        if let Err(e) = self.save(&index) {
            index.remove(id);
            let _ = fs::remove_file(&blob);
            return Err(e);
        }
        Ok(Inserted::Created(id))
    }

    fn get(&self, id: Uuid) -> Result<Option<ImageRecord>, StoreError> {
        let entry = self.lock().records.get(&id).cloned();
        match entry {
            Some(entry) => self.load_record(id, entry),
            None => Ok(None),
        }
    }

    fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<ImageRecord>, StoreError> {
        let entries: Vec<(Uuid, IndexEntry)> = {
            let index = self.lock();
            index
                .ids_for(fingerprint)
                .into_iter()
                .filter_map(|id| index.records.get(&id).cloned().map(|e| (id, e)))
                .collect()
        };

        let mut found = Vec::with_capacity(entries.len());
        for (id, entry) in entries {
            if let Some(record) = self.load_record(id, entry)? {
                found.push(record);
            }
        }
        Ok(found)
    }

    fn info(&self, id: Uuid) -> Result<Option<ImageInfo>, StoreError> {
        let Some(entry) = self.lock().records.get(&id).cloned() else {
            return Ok(None);
        };
        match fs::metadata(self.blob_path(id, entry.format)) {
            Ok(meta) if entry.matches_blob(id, meta.len()) => Ok(Some(entry.to_info(id))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(payload: &[u8], format: ImageFormat) -> ImageRecord {
        ImageRecord::new(payload.to_vec(), "upload.bin", format, 20, 10)
    }

    // =========================================================================
    // Open / load
    // =========================================================================

    #[test]
    fn open_creates_layout() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("store");
        let store = FileStore::open(&root).unwrap();

        assert!(root.join(BLOB_DIR).is_dir());
        assert!(store.is_empty());
        assert!(!root.join(INDEX_FILENAME).exists());
    }

    #[test]
    fn reopen_preserves_records() {
        let tmp = TempDir::new().unwrap();
        let r = record(b"persist me", ImageFormat::Png);
        let id = r.id;
        {
            let store = FileStore::open(tmp.path()).unwrap();
            store.insert(r.clone()).unwrap();
        }

        let store = FileStore::open(tmp.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap(), Some(r.clone()));
        // Fingerprint index rebuilt on load
        let found = store.find_by_fingerprint(&r.fingerprint).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }

    #[test]
    fn open_corrupt_index_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(INDEX_FILENAME), "not json").unwrap();
        assert!(matches!(
            FileStore::open(tmp.path()),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn open_wrong_version_is_error() {
        let tmp = TempDir::new().unwrap();
        let json = format!(r#"{{"version": {}, "records": {{}}}}"#, INDEX_VERSION + 1);
        fs::write(tmp.path().join(INDEX_FILENAME), json).unwrap();
        assert!(matches!(
            FileStore::open(tmp.path()),
            Err(StoreError::Corrupt { .. })
        ));
    }

    // =========================================================================
    // Insert / read
    // =========================================================================

    #[test]
    fn insert_writes_blob_with_format_extension() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let r = record(b"jpeg bytes", ImageFormat::Jpeg);
        let id = r.id;
        store.insert(r).unwrap();

        let blob = tmp.path().join(BLOB_DIR).join(format!("{id}.jpg"));
        assert_eq!(fs::read(blob).unwrap(), b"jpeg bytes");
        assert!(tmp.path().join(INDEX_FILENAME).exists());
    }

    #[test]
    fn insert_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        store.insert(record(b"abc", ImageFormat::Png)).unwrap();

        let stray: Vec<_> = fs::read_dir(tmp.path().join(BLOB_DIR))
            .unwrap()
            .chain(fs::read_dir(tmp.path()).unwrap())
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(stray.is_empty(), "leftover temp files: {stray:?}");
    }

    #[test]
    fn insert_identical_content_returns_existing() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let first = record(b"dup", ImageFormat::Png);
        let first_id = first.id;
        store.insert(first).unwrap();

        let outcome = store.insert(record(b"dup", ImageFormat::Png)).unwrap();
        assert_eq!(outcome, Inserted::Existing(first_id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn insert_rejects_empty_payload() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        assert!(matches!(
            store.insert(record(b"", ImageFormat::Png)),
            Err(StoreError::EmptyPayload)
        ));
    }

    #[test]
    fn fingerprint_collision_keeps_both_records() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let shared = Fingerprint::from_hex("collide");
        let mut a = record(b"payload a", ImageFormat::Png);
        let mut b = record(b"payload b", ImageFormat::Png);
        a.fingerprint = shared.clone();
        b.fingerprint = shared.clone();

        assert!(matches!(store.insert(a).unwrap(), Inserted::Created(_)));
        assert!(matches!(store.insert(b).unwrap(), Inserted::Created(_)));
        assert_eq!(store.find_by_fingerprint(&shared).unwrap().len(), 2);
    }

    #[test]
    fn missing_blob_reads_as_absent() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let r = record(b"soon gone", ImageFormat::Png);
        let id = r.id;
        store.insert(r).unwrap();
        fs::remove_file(store.blob_path(id, ImageFormat::Png)).unwrap();

        assert!(store.get(id).unwrap().is_none());
        assert!(store.info(id).unwrap().is_none());
    }

    #[test]
    fn resized_blob_reads_as_absent() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let r = record(b"original payload", ImageFormat::Png);
        let id = r.id;
        store.insert(r).unwrap();
        fs::write(store.blob_path(id, ImageFormat::Png), b"short").unwrap();

        assert!(store.get(id).unwrap().is_none());
        assert!(store.info(id).unwrap().is_none());
    }

    #[test]
    fn info_size_comes_from_index() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let r = record(&[3; 40], ImageFormat::Png);
        let id = r.id;
        store.insert(r).unwrap();

        let json = fs::read_to_string(tmp.path().join(INDEX_FILENAME)).unwrap();
        assert!(json.contains("\"size\": 40"));
        assert_eq!(store.info(id).unwrap().unwrap().size, 40);
    }

    #[test]
    fn failed_index_write_rolls_back_insert() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        // A directory squatting on the temp index path makes the save fail.
        let squatter = tmp.path().join(format!(".{INDEX_FILENAME}.tmp"));
        fs::create_dir(&squatter).unwrap();

        let r = record(b"never visible", ImageFormat::Png);
        let (id, fingerprint) = (r.id, r.fingerprint.clone());
        assert!(store.insert(r).is_err());

        assert!(store.is_empty());
        assert!(store.get(id).unwrap().is_none());
        assert!(store.info(id).unwrap().is_none());
        assert!(store.find_by_fingerprint(&fingerprint).unwrap().is_empty());
        assert!(!store.blob_path(id, ImageFormat::Png).exists());
        assert!(!tmp.path().join(INDEX_FILENAME).exists());

        fs::remove_dir(&squatter).unwrap();
        let retry = store
            .insert(record(b"never visible", ImageFormat::Png))
            .unwrap();
        assert!(matches!(retry, Inserted::Created(_)));
        assert_eq!(store.find_by_fingerprint(&fingerprint).unwrap().len(), 1);
    }

    #[test]
    fn info_does_not_need_payload_in_memory() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let r = record(&[7; 128], ImageFormat::Jpeg);
        let id = r.id;
        let created_at = r.created_at;
        store.insert(r).unwrap();

        let info = store.info(id).unwrap().unwrap();
        assert_eq!(info.size, 128);
        assert_eq!(info.format, ImageFormat::Jpeg);
        assert_eq!(info.created_at, created_at);
        assert_eq!((info.width, info.height), (20, 10));
    }

    #[test]
    fn unknown_id_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        assert!(store.get(Uuid::new_v4()).unwrap().is_none());
        assert!(store.info(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn concurrent_identical_inserts_store_once() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(FileStore::open(tmp.path()).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .insert(record(b"racy", ImageFormat::Png))
                        .unwrap()
                })
            })
            .collect();
        let outcomes: Vec<Inserted> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(store.len(), 1);
        let created = outcomes
            .iter()
            .filter(|o| matches!(o, Inserted::Created(_)))
            .count();
        assert_eq!(created, 1);
    }

    #[test]
    fn index_json_has_no_payloads() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        store
            .insert(record(b"SECRET-PAYLOAD", ImageFormat::Png))
            .unwrap();

        let json = fs::read_to_string(tmp.path().join(INDEX_FILENAME)).unwrap();
        assert!(!json.contains("SECRET-PAYLOAD"));
        assert!(json.contains("\"format\": \"png\""));
    }
}
