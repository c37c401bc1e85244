//! # Image Repo
//!
//! A content-addressed image store. Uploads are resized and re-encoded to PNG
//! or JPEG, then stored once: importing the same content twice hands back the
//! id of the first import instead of a second copy.
//!
//! # Architecture: One Pipeline, Pluggable Edges
//!
//! ```text
//! ImportRequest ─► validate ─► decode/resize/encode ─► fingerprint ─► dedup ─► RecordStore
//!                               (ImageCodec)                                   (MemoryStore,
//!                                                                               FileStore)
//! ```
//!
//! Both edges are traits. Pixels go through [`imaging::ImageCodec`] so the
//! pipeline can be tested against a mock without real encoding. Records go
//! through [`store::RecordStore`]; the pipeline never reaches for a global
//! handle.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`import`] | Request validation and the import pipeline |
//! | [`retrieval`] | Fetch payload or metadata by id |
//! | [`batch`] | Import a whole directory tree in parallel |
//! | [`imaging`] | Geometry resolution, the codec trait, the `image`-crate codec |
//! | [`fingerprint`] | Content fingerprints and byte-equality checks |
//! | [`store`] | The record store contract plus in-memory and on-disk stores |
//! | [`config`] | `config.toml` loading, validation, and merging |
//! | [`types`] | Records, metadata, and output formats shared by every layer |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Dedup on Output, Not Input
//!
//! Fingerprints are taken over the **encoded output**, not the upload. Two
//! different files that resize and encode to the same bytes are one record;
//! the same file imported at two sizes is two records. File names and
//! requested parameters never take part.
//!
//! ## Two-Phase Match
//!
//! A SHA-256 fingerprint narrows the candidates and a full byte comparison
//! decides. A fingerprint collision therefore costs a comparison, never a
//! wrong answer.
//!
//! ## The Store Closes the Race
//!
//! The pipeline looks for an existing record before inserting, but two
//! concurrent imports of the same content can both miss. Every
//! [`store::RecordStore`] repeats the check under its own lock at insert time
//! and answers [`store::Inserted::Existing`] when it loses, so identical
//! content is stored once no matter how imports interleave within a process.
//!
//! ## Deterministic Encoding
//!
//! Output is encoded at [`imaging::Quality::BEST`] with a fixed resampling
//! filter per store. Given the same source and parameters the bytes are
//! identical, which is what makes output-side dedup work at all.

pub mod batch;
pub mod config;
pub mod fingerprint;
pub mod imaging;
pub mod import;
pub mod output;
pub mod retrieval;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
