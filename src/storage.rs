//! Storage backend contract and the local filesystem implementation.
//!
//! The resolver only talks to [`Storage`]; whether bytes live on local disk,
//! in object storage, or behind a CDN is the implementation's business.
//! Keys are `/`-separated paths relative to the media root.
//!
//! [`LocalStorage`] generates derivatives in-process through an
//! [`ImageBackend`]. With `create_images_on_demand = false` it behaves like
//! immutable object storage: derivatives that already exist are served, and
//! generation reports [`StorageError::Unavailable`].

use crate::config::MediaConfig;
use crate::imaging::{self, BackendError, ImageBackend, Quality, RustBackend};
use crate::naming::join_url;
use crate::registry::RenditionOp;
use crate::types::SourceImage;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rendition unavailable: {0} has not been generated")]
    Unavailable(String),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// The contract every storage backend satisfies.
pub trait Storage: Sync {
    /// Public URL for a key. Does not check existence.
    fn url(&self, key: &str) -> String;

    /// Whether `key` exists.
    fn exists(&self, key: &str) -> bool;

    /// Write `bytes` under `key`, returning its URL.
    fn store(&self, bytes: &[u8], key: &str) -> Result<String, StorageError>;

    /// Pixel dimensions of the image stored under `key`.
    fn identify(&self, key: &str) -> Result<(u32, u32), StorageError>;

    /// Produce the derivative of `source` for `op` under `key`.
    ///
    /// Backends that cannot generate on demand return
    /// [`StorageError::Unavailable`].
    fn generate_derivative(
        &self,
        source: &SourceImage,
        op: RenditionOp,
        key: &str,
    ) -> Result<String, StorageError>;
}

/// Media stored on the local filesystem under `root`.
pub struct LocalStorage<B: ImageBackend = RustBackend> {
    root: PathBuf,
    base_url: String,
    backend: B,
    on_demand: bool,
    quality: Quality,
}

impl LocalStorage<RustBackend> {
    /// Local storage configured from `media.toml`, using the pure Rust backend.
    pub fn from_config(config: &MediaConfig) -> Self {
        LocalStorage::new(&config.media_root, &config.media_url, RustBackend::new())
            .with_on_demand(config.renditions.create_images_on_demand)
            .with_quality(Quality::new(config.renditions.jpeg_quality))
    }
}

impl<B: ImageBackend> LocalStorage<B> {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>, backend: B) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
            backend,
            on_demand: true,
            quality: Quality::default(),
        }
    }

    pub fn with_on_demand(mut self, on_demand: bool) -> Self {
        self.on_demand = on_demand;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key onto the filesystem, refusing anything that escapes the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key.trim_start_matches('/'));
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl<B: ImageBackend> Storage for LocalStorage<B> {
    fn url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }

    fn exists(&self, key: &str) -> bool {
        self.resolve(key).map(|p| p.is_file()).unwrap_or(false)
    }

    fn store(&self, bytes: &[u8], key: &str) -> Result<String, StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(self.url(key))
    }

    fn identify(&self, key: &str) -> Result<(u32, u32), StorageError> {
        let path = self.resolve(key)?;
        Ok(imaging::get_dimensions(&self.backend, &path)?)
    }

    fn generate_derivative(
        &self,
        source: &SourceImage,
        op: RenditionOp,
        key: &str,
    ) -> Result<String, StorageError> {
        if !self.on_demand {
            return Err(StorageError::Unavailable(key.to_string()));
        }
        let source_path = self.resolve(&source.path)?;
        let output_path = self.resolve(key)?;
        imaging::create_derivative(
            &self.backend,
            &source_path,
            &output_path,
            op,
            source.ppoi,
            self.quality,
        )?;
        Ok(self.url(key))
    }
}
