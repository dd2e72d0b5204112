//! Deterministic names for derived images.
//!
//! Every derivative lives under the sized directory, mirroring the source's
//! own directory, with the operation baked into the filename:
//!
//! ```text
//! projects/featured/site.jpg  + thumbnail__640x480
//!   → __sized__/projects/featured/site-thumbnail-640x480.jpg
//!
//! profile/me.png  + crop__150x150 at ppoi (0.5, 0.3)
//!   → __sized__/profile/me-crop-c0-5__0-3-150x150.png
//! ```
//!
//! Crops carry the point of interest in their name because moving the focal
//! point changes the pixels. Thumbnails don't, so they are shared across
//! point-of-interest edits. The same `(source, op, ppoi)` always maps to the
//! same path, which is what makes generation idempotent.

use crate::registry::RenditionOp;
use crate::types::Ppoi;

/// Storage key of the derivative of `source_path` produced by `op`.
///
/// [`RenditionOp::Identity`] maps to the source path itself.
pub fn derivative_path(sized_dir: &str, source_path: &str, op: RenditionOp, ppoi: Ppoi) -> String {
    let (dir, file) = match source_path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, source_path),
    };
    let (stem, ext) = split_extension(file);

    let suffix = match op {
        RenditionOp::Identity => return source_path.to_string(),
        RenditionOp::Thumbnail { width, height } => format!("thumbnail-{width}x{height}"),
        RenditionOp::Crop { width, height } => {
            format!("crop-{}-{width}x{height}", ppoi_token(ppoi))
        }
    };

    let mut key = String::from(sized_dir.trim_matches('/'));
    if let Some(dir) = dir.filter(|d| !d.is_empty()) {
        key.push('/');
        key.push_str(dir);
    }
    key.push('/');
    key.push_str(stem);
    key.push('-');
    key.push_str(&suffix);
    if let Some(ext) = ext {
        key.push('.');
        key.push_str(ext);
    }
    key
}

/// Filename-safe encoding of a point of interest, e.g. `c0-5__0-3`.
pub fn ppoi_token(ppoi: Ppoi) -> String {
    let ppoi = ppoi.clamped();
    format!(
        "c{}__{}",
        format_unit(ppoi.x).replace('.', "-"),
        format_unit(ppoi.y).replace('.', "-")
    )
}

/// At most three decimals, trailing zeros trimmed.
fn format_unit(v: f32) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() { "0".to_string() } else { s.to_string() }
}

/// Split `name.ext` into `(name, Some(ext))`. Dotfiles have no extension.
fn split_extension(file: &str) -> (&str, Option<&str>) {
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (file, None),
    }
}

/// Swap the extension of the last path segment of `url`.
///
/// A query string or fragment is kept. A URL without an extension gets one
/// appended.
pub fn replace_extension(url: &str, ext: &str) -> String {
    let split_at = url.find(['?', '#']).unwrap_or(url.len());
    let (path, tail) = url.split_at(split_at);
    let segment_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let (dir, file) = path.split_at(segment_start);
    let (stem, _) = split_extension(file);
    format!("{dir}{stem}.{ext}{tail}")
}

/// Join a public URL prefix and a storage key with exactly one slash.
pub fn join_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const THUMB: RenditionOp = RenditionOp::Thumbnail {
        width: 640,
        height: 480,
    };
    const CROP: RenditionOp = RenditionOp::Crop {
        width: 150,
        height: 150,
    };

    #[test]
    fn thumbnail_path_mirrors_source_directory() {
        assert_eq!(
            derivative_path("__sized__", "projects/featured/site.jpg", THUMB, Ppoi::default()),
            "__sized__/projects/featured/site-thumbnail-640x480.jpg"
        );
    }

    #[test]
    fn thumbnail_path_ignores_ppoi() {
        let a = derivative_path("__sized__", "a/b.jpg", THUMB, Ppoi::new(0.1, 0.9));
        let b = derivative_path("__sized__", "a/b.jpg", THUMB, Ppoi::default());
        assert_eq!(a, b);
    }

    #[test]
    fn crop_path_includes_ppoi() {
        assert_eq!(
            derivative_path("__sized__", "profile/me.png", CROP, Ppoi::new(0.5, 0.3)),
            "__sized__/profile/me-crop-c0-5__0-3-150x150.png"
        );
        assert_ne!(
            derivative_path("__sized__", "profile/me.png", CROP, Ppoi::new(0.5, 0.3)),
            derivative_path("__sized__", "profile/me.png", CROP, Ppoi::default())
        );
    }

    #[test]
    fn path_is_deterministic() {
        let first = derivative_path("__sized__", "x/y.jpg", CROP, Ppoi::new(0.25, 0.75));
        let second = derivative_path("__sized__", "x/y.jpg", CROP, Ppoi::new(0.25, 0.75));
        assert_eq!(first, second);
    }

    #[test]
    fn identity_is_source_path() {
        assert_eq!(
            derivative_path("__sized__", "a/b.jpg", RenditionOp::Identity, Ppoi::default()),
            "a/b.jpg"
        );
    }

    #[test]
    fn root_level_source_and_no_extension() {
        assert_eq!(
            derivative_path("/__sized__/", "photo", THUMB, Ppoi::default()),
            "__sized__/photo-thumbnail-640x480"
        );
    }

    #[test]
    fn ppoi_token_formats() {
        assert_eq!(ppoi_token(Ppoi::default()), "c0-5__0-5");
        assert_eq!(ppoi_token(Ppoi::new(0.0, 1.0)), "c0__1");
        assert_eq!(ppoi_token(Ppoi::new(0.125, 0.3333)), "c0-125__0-333");
    }

    #[test]
    fn replace_extension_swaps_last_segment() {
        assert_eq!(
            replace_extension("/media/__sized__/a/b-thumbnail-640x480.jpg", "webp"),
            "/media/__sized__/a/b-thumbnail-640x480.webp"
        );
    }

    #[test]
    fn replace_extension_keeps_query_and_dotted_dirs() {
        assert_eq!(
            replace_extension("https://cdn.example.com/v1.2/img.png?v=3", "webp"),
            "https://cdn.example.com/v1.2/img.webp?v=3"
        );
        assert_eq!(replace_extension("/media/v1.2/img", "webp"), "/media/v1.2/img.webp");
    }

    #[test]
    fn join_url_single_slash() {
        assert_eq!(join_url("/media/", "/a/b.jpg"), "/media/a/b.jpg");
        assert_eq!(join_url("/media", "a/b.jpg"), "/media/a/b.jpg");
    }
}
