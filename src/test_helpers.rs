//! Shared test utilities for the portfolio-media test suite.
//!
//! Provides stock fixtures (registry, source images, resolvers over mock or
//! real storage) and a synthetic JPEG writer, so module tests don't each
//! rebuild the same scaffolding.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let resolver = mock_resolver(MockStorage::new());
//! let image = featured_image();
//! let r = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");
//! ```

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use crate::config::{MediaConfig, RenditionSettings};
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::storage::LocalStorage;
use crate::storage::tests::MockStorage;
use crate::types::SourceImage;

pub const FEATURED_PATH: &str = "projects/featured/site.jpg";
pub const PROFILE_PATH: &str = "profile/me.jpg";

// =========================================================================
// Fixtures
// =========================================================================

/// Registry built from the stock configuration.
pub fn stock_registry() -> Arc<Registry> {
    Arc::new(Registry::from_config(&MediaConfig::default()).unwrap())
}

/// A 2400×1600 featured project image with cached dimensions.
pub fn featured_image() -> SourceImage {
    SourceImage::new(FEATURED_PATH).with_dimensions(2400, 1600)
}

/// A square profile picture with cached dimensions.
pub fn profile_image() -> SourceImage {
    SourceImage::new(PROFILE_PATH).with_dimensions(800, 800)
}

/// Resolver over the stock registry and default settings.
pub fn mock_resolver(storage: MockStorage) -> Resolver<MockStorage> {
    Resolver::new(stock_registry(), storage, &RenditionSettings::default())
}

/// Resolver over real files in `tmp`, served at `/media/`.
pub fn local_resolver(tmp: &TempDir) -> Resolver<LocalStorage> {
    let mut config = MediaConfig::default();
    config.media_root = tmp.path().to_string_lossy().to_string();
    Resolver::new(
        stock_registry(),
        LocalStorage::from_config(&config),
        &config.renditions,
    )
}

// =========================================================================
// Images on disk
// =========================================================================

/// Write a gradient JPEG of the given size, creating parent directories.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    use image::codecs::jpeg::JpegEncoder;
    use image::{ImageEncoder, RgbImage};

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    JpegEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}
