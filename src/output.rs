//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! The primary line for every stored image is its **identity**: the record
//! id, whether this run created it, and what was stored. Where the bytes came
//! from is secondary context on indented lines. Import and batch output
//! therefore read as an inventory of the store, not as a list of files.
//!
//! # Output Format
//!
//! ## Import
//!
//! ```text
//! created 4b1d8c1e-0c1f-4a0e-9a57-3f0c2b0b5e71 (100x50 png)
//!     Source: photos/cat.jpg
//! ```
//!
//! A dedup hit reads `exists` instead of `created`.
//!
//! ## Import dir
//!
//! ```text
//! created 4b1d8c1e-... (100x50 png)
//!     Source: cat.jpg
//! failed broken.png
//!     Error: Could not decode source image: ...
//!
//! 1 created, 0 already stored, 1 failed (2 total)
//! ```
//!
//! ## Info
//!
//! ```text
//! 4b1d8c1e-0c1f-4a0e-9a57-3f0c2b0b5e71
//!     File: cat.jpg
//!     Format: png (image/png)
//!     Dimensions: 100x50
//!     Size: 10422 bytes
//!     Created: 2026-10-19T08:30:00Z
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary};
use crate::import::ImportOutcome;
use crate::retrieval::StoredPayload;
use crate::types::ImageInfo;
use chrono::SecondsFormat;
use std::path::Path;
use uuid::Uuid;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Header line for a stored image.
///
/// ```text
/// created 4b1d8c1e-... (100x50 png)
/// exists 4b1d8c1e-... (100x50 png)
/// ```
fn outcome_header(outcome: &ImportOutcome) -> String {
    let status = if outcome.already_existed {
        "exists"
    } else {
        "created"
    };
    format!(
        "{} {} ({}x{} {})",
        status, outcome.id, outcome.width, outcome.height, outcome.format
    )
}

/// Show `path` relative to `root` when it lives under it.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Import
// ============================================================================

/// Format the result of a single import.
pub fn format_import_outcome(outcome: &ImportOutcome, source: &Path) -> Vec<String> {
    vec![
        outcome_header(outcome),
        format!("{}Source: {}", indent(1), source.display()),
    ]
}

/// Print import output to stdout.
pub fn print_import_outcome(outcome: &ImportOutcome, source: &Path) {
    for line in format_import_outcome(outcome, source) {
        println!("{}", line);
    }
}

// ============================================================================
// Import dir
// ============================================================================

/// Format one batch progress event. Paths are shown relative to `root`.
pub fn format_batch_event(event: &BatchEvent, root: &Path) -> Vec<String> {
    let source = display_path(&event.path, root);
    match &event.result {
        Ok(outcome) => vec![
            outcome_header(outcome),
            format!("{}Source: {}", indent(1), source),
        ],
        Err(e) => vec![
            format!("failed {}", source),
            format!("{}Error: {}", indent(1), e),
        ],
    }
}

/// Format the closing summary of a batch.
pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    vec![String::new(), summary.to_string()]
}

/// Print batch summary to stdout.
pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Get / info
// ============================================================================

/// Format the confirmation for a payload written to disk.
pub fn format_payload_written(id: Uuid, payload: &StoredPayload, dest: &Path) -> Vec<String> {
    vec![
        format!("{} → {}", id, dest.display()),
        format!("{}Content-Type: {}", indent(1), payload.content_type()),
        format!("{}Size: {} bytes", indent(1), payload.bytes.len()),
    ]
}

/// Print payload confirmation to stdout.
pub fn print_payload_written(id: Uuid, payload: &StoredPayload, dest: &Path) {
    for line in format_payload_written(id, payload, dest) {
        println!("{}", line);
    }
}

/// Format image metadata for humans.
pub fn format_info(info: &ImageInfo) -> Vec<String> {
    vec![
        info.id.to_string(),
        format!("{}File: {}", indent(1), info.file_name),
        format!(
            "{}Format: {} ({})",
            indent(1),
            info.format,
            info.format.mime_type()
        ),
        format!("{}Dimensions: {}x{}", indent(1), info.width, info.height),
        format!("{}Size: {} bytes", indent(1), info.size),
        format!(
            "{}Created: {}",
            indent(1),
            info.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
    ]
}

/// Format image metadata as pretty JSON.
pub fn format_info_json(info: &ImageInfo) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(info)
}

/// Print metadata to stdout, as text or JSON.
pub fn print_info(info: &ImageInfo, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", format_info_json(info)?);
    } else {
        for line in format_info(info) {
            println!("{}", line);
        }
    }
    Ok(())
}
