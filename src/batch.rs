//! Importing every image in a directory tree.
//!
//! All files share one set of resize parameters, which are validated once
//! before the walk. Files are discovered with `walkdir` (sorted, so event
//! order within a run is stable for a single worker) and imported in parallel
//! on the global rayon pool; the CLI sizes that pool from
//! `[processing] max_processes`.
//!
//! A file that fails to read, decode, or store is reported and skipped. Only
//! problems with the batch as a whole (missing directory, bad parameters,
//! walk errors) abort it.

use crate::imaging::{ImageCodec, supported_input_extensions};
use crate::import::{ImportError, ImportOptions, ImportOutcome, ImportRequest, import_image};
use crate::store::RecordStore;
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Invalid(#[from] ImportError),
}

/// Resize parameters applied to every file in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchParams {
    pub target_width: i32,
    pub target_height: i32,
    pub keep_aspect_ratio: bool,
    pub target_format: String,
}

/// Per-file progress, sent as each import finishes.
#[derive(Debug)]
pub struct BatchEvent {
    pub path: PathBuf,
    pub result: Result<ImportOutcome, ImportError>,
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.created + self.existing + self.failed
    }

    fn combine(self, other: Self) -> Self {
        Self {
            created: self.created + other.created,
            existing: self.existing + other.existing,
            failed: self.failed + other.failed,
        }
    }

    fn record(&mut self, result: &Result<ImportOutcome, ImportError>) {
        match result {
            Ok(outcome) if outcome.already_existed => self.existing += 1,
            Ok(_) => self.created += 1,
            Err(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} created, {} already stored", self.created, self.existing)?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, " ({} total)", self.total())
    }
}

/// Files under `dir` with a supported image extension, sorted by path.
pub fn collect_sources(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::DirectoryNotFound(dir.to_path_buf()));
    }
    let mut sources = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            sources.push(entry.into_path());
        }
    }
    Ok(sources)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// Import every supported file under `dir`.
pub fn import_dir(
    codec: &impl ImageCodec,
    store: &impl RecordStore,
    dir: &Path,
    params: &BatchParams,
    options: &ImportOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    crate::import::validate_params(
        params.target_width,
        params.target_height,
        params.keep_aspect_ratio,
        &params.target_format,
        options,
    )?;
    let sources = collect_sources(dir)?;
    info!(dir = %dir.display(), files = sources.len(), "batch import");

    let summary = sources
        .par_iter()
        .map(|path| {
            let result = import_file(codec, store, path, params, options);
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "import failed");
            }
            let mut tally = BatchSummary::default();
            tally.record(&result);
            if let Some(tx) = &events {
                // Receiver gone just means nobody is listening.
                let _ = tx.send(BatchEvent {
                    path: path.clone(),
                    result,
                });
            }
            tally
        })
        .reduce(BatchSummary::default, BatchSummary::combine);

    info!(%summary, "batch finished");
    Ok(summary)
}

fn import_file(
    codec: &impl ImageCodec,
    store: &impl RecordStore,
    path: &Path,
    params: &BatchParams,
    options: &ImportOptions,
) -> Result<ImportOutcome, ImportError> {
    let source = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let request = ImportRequest {
        target_width: params.target_width,
        target_height: params.target_height,
        keep_aspect_ratio: params.keep_aspect_ratio,
        target_format: params.target_format.clone(),
        source,
        file_name,
    };
    import_image(codec, store, &request, options)
}
