//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations) (which maps a
//! rendition operation onto pixel work) and the [`backend`](super::backend)
//! (which does the actual pixel work). Tests swap in a mock backend without
//! changing operation logic.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Parameters for a fit-inside-box resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Final output dimensions (already fitted and never upscaled).
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// Parameters for a fill-then-crop operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Intermediate size the source is scaled to before cropping.
    pub fill_width: u32,
    pub fill_height: u32,
    /// Crop window within the filled image.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}
