//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, thumbnail and crop. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::{CropParams, ThumbnailParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can serve request threads and the parallel warmer.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Resize to the exact (pre-fitted) dimensions in `params`.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;

    /// Resize to the fill size, then cut the crop window.
    fn crop(&self, params: &CropParams) -> Result<(), BackendError>;
}
