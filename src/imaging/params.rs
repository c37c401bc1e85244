//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the [`operations`](super::operations) module (which
//! decides the output geometry) and the [`codec`](super::codec) (which does
//! the pixel work), and they carry no dependency on any imaging library.
//!
//! ## Types
//!
//! - [`Quality`]: Encoding quality (1–100). Imports always use [`Quality::BEST`].
//! - [`ResizeFilter`]: Resampling filter, fixed per store so re-imports stay
//!   byte-identical.
//! - [`ResizeTarget`]: Requested geometry: width, height, aspect-ratio flag.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    /// Highest quality. Every import encodes at this setting.
    pub const BEST: Quality = Quality(100);

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::BEST
    }
}

/// Resampling filter used when resizing.
///
/// Lanczos3 is the high-quality, antialiased default. All filters are
/// deterministic for a fixed input and output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

/// Requested output geometry for an import.
///
/// Sides `<= 0` mean "derive" and are only meaningful with
/// `keep_aspect_ratio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeTarget {
    pub width: i32,
    pub height: i32,
    pub keep_aspect_ratio: bool,
    /// Largest allowed output side, applied to derived sides too.
    pub max_side: u32,
}
