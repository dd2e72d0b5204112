//! Pure calculation functions for rendition dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::types::Ppoi;

/// Calculate output dimensions for a thumbnail that fits inside a box.
///
/// Preserves the source aspect ratio and never upscales: a source already
/// inside the box keeps its own size. Neither edge rounds below 1px.
///
/// ```
/// # use portfolio_media::imaging::calculate_fit_dimensions;
/// // 2000x1000 into 640x480 → width-bound
/// assert_eq!(calculate_fit_dimensions((2000, 1000), (640, 480)), (640, 320));
/// // Smaller than the box → unchanged
/// assert_eq!(calculate_fit_dimensions((300, 200), (640, 480)), (300, 200));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (box_w, box_h) = bounds;
    if src_w == 0 || src_h == 0 {
        return (box_w.max(1), box_h.max(1));
    }

    let scale = (box_w as f64 / src_w as f64)
        .min(box_h as f64 / src_h as f64)
        .min(1.0);
    let w = ((src_w as f64 * scale).round() as u32).max(1);
    let h = ((src_h as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    if src_w == 0 || src_h == 0 {
        return target;
    }

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = ((h as f64 * src_aspect).round() as u32).max(tgt_w);
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = ((w as f64 / src_aspect).round() as u32).max(tgt_h);
        (w, h)
    }
}

/// Offset of a `target`-sized crop window inside a `filled` image.
///
/// The window is centred on the point of interest, then clamped so it stays
/// entirely inside the filled image.
pub fn calculate_crop_offset(filled: (u32, u32), target: (u32, u32), ppoi: Ppoi) -> (u32, u32) {
    (
        axis_offset(filled.0, target.0, ppoi.x),
        axis_offset(filled.1, target.1, ppoi.y),
    )
}

fn axis_offset(filled: u32, target: u32, focus: f32) -> u32 {
    let slack = filled.saturating_sub(target);
    if slack == 0 {
        return 0;
    }
    let centre = filled as f64 * focus.clamp(0.0, 1.0) as f64;
    let start = (centre - target as f64 / 2.0).round();
    start.clamp(0.0, slack as f64) as u32
}
