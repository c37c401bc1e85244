//! Pure calculation functions for output dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Resolve the stored dimensions for an import.
///
/// # Arguments
/// * `target_width`, `target_height` - Requested size. In aspect-ratio mode a
///   value `<= 0` means "derive this side from the source".
/// * `keep_aspect_ratio` - Derive one side from the other using the source ratio
/// * `source` - Decoded source dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Output dimensions
///
/// In aspect-ratio mode the width wins when both sides are given; request
/// validation makes sure exactly one is. The derived side is truncated toward
/// zero, so it can be `0` for extreme ratios. Callers must check.
///
/// # Examples
/// ```
/// # use image_repo::imaging::resolve_dimensions;
/// // 200x100 source, width 100 → height derived as 50
/// assert_eq!(resolve_dimensions(100, 0, true, (200, 100)), (100, 50));
///
/// // Exact mode ignores the source
/// assert_eq!(resolve_dimensions(64, 48, false, (200, 100)), (64, 48));
/// ```
pub fn resolve_dimensions(
    target_width: i32,
    target_height: i32,
    keep_aspect_ratio: bool,
    source: (u32, u32),
) -> (u32, u32) {
    if !keep_aspect_ratio {
        return (non_negative(target_width), non_negative(target_height));
    }

    let (src_w, src_h) = source;
    let ratio = src_h as f64 / src_w as f64;

    if target_width > 0 {
        let h = (target_width as f64 * ratio) as u32;
        (target_width as u32, h)
    } else {
        let w = (target_height as f64 / ratio) as u32;
        (w, non_negative(target_height))
    }
}

fn non_negative(value: i32) -> u32 {
    value.max(0) as u32
}
