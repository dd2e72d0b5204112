//! Media configuration module.
//!
//! Handles loading, validating, and merging `media.toml`. Configuration is
//! layered: stock defaults are overridden by the user file, key by key.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! media_root = "media"        # Directory holding uploaded originals
//! media_url = "/media/"       # Public URL prefix for media_root
//!
//! [renditions]
//! cache_length = 2592000      # Seconds a generated rendition is trusted without re-checking storage
//! jpeg_quality = 85           # Encoding quality for derived JPEG/WebP (1-100)
//! create_images_on_demand = true  # false for read-only deployments (pre-warmed derivatives only)
//! sized_directory = "__sized__"   # Subdirectory of media_root for derivatives
//!
//! [processing]
//! max_processes = 4           # Max parallel warm workers (omit for auto = CPU cores)
//!
//! [logging]
//! level = "info"              # tracing filter, overridden by RUST_LOG
//! json = false                # Emit JSON log lines
//!
//! [purposes.project_featured]
//! renditions = [["full_size", "url"], ["medium", "thumbnail__640x480"]]
//! srcset = ["medium"]         # Ladder used for srcset, smallest first
//! sizes = "(max-width: 640px) 100vw, 50vw"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! [renditions]
//! create_images_on_demand = false
//! ```
//!
//! Arrays replace their stock value entirely, so overriding a purpose's
//! `renditions` list restates the whole set. Unknown keys are rejected to
//! catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Purpose tag for the profile picture.
pub const PROFILE_IMAGE: &str = "profile_image";
/// Purpose tag for a project's featured image.
pub const PROJECT_FEATURED: &str = "project_featured";
/// Purpose tag for project screenshots and renders.
pub const PROJECT_GALLERY: &str = "project_gallery";
/// Purpose tag for social sharing cards.
pub const SOCIAL_SHARE: &str = "social_share";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Media configuration loaded from `media.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    /// Directory holding uploaded originals and generated derivatives.
    pub media_root: String,
    /// Public URL prefix that maps onto `media_root`.
    pub media_url: String,
    /// Rendition generation and caching settings.
    pub renditions: RenditionSettings,
    /// Parallel warm settings.
    pub processing: ProcessingConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Rendition key sets by purpose tag.
    pub purposes: BTreeMap<String, PurposeConfig>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            media_root: "media".to_string(),
            media_url: "/media/".to_string(),
            renditions: RenditionSettings::default(),
            processing: ProcessingConfig::default(),
            logging: LoggingConfig::default(),
            purposes: stock_purposes(),
        }
    }
}

impl MediaConfig {
    /// Validate config values are within acceptable ranges.
    ///
    /// Structural checks of the rendition sets (descriptor syntax, duplicate
    /// names, ladder references) happen when the registry is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.renditions.jpeg_quality == 0 || self.renditions.jpeg_quality > 100 {
            return Err(ConfigError::Validation(
                "renditions.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.media_url.is_empty() {
            return Err(ConfigError::Validation("media_url must not be empty".into()));
        }
        if self.renditions.sized_directory.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "renditions.sized_directory must not be empty".into(),
            ));
        }
        if self.purposes.is_empty() {
            return Err(ConfigError::Validation(
                "at least one purpose must be configured".into(),
            ));
        }
        Ok(())
    }
}

/// Rendition generation and caching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenditionSettings {
    /// Seconds a recorded rendition is trusted before storage is re-checked.
    /// `0` re-checks storage on every resolution.
    pub cache_length: u64,
    /// Quality for lossy derivative encoding.
    pub jpeg_quality: u32,
    /// Whether missing derivatives may be generated at request time.
    pub create_images_on_demand: bool,
    /// Directory (under the media root) holding derivatives.
    pub sized_directory: String,
}

impl Default for RenditionSettings {
    fn default() -> Self {
        Self {
            cache_length: 2_592_000,
            jpeg_quality: 85,
            create_images_on_demand: true,
            sized_directory: "__sized__".to_string(),
        }
    }
}

/// Parallel processing settings for the warm command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel warm workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter (e.g. `"info"`, `"portfolio_media=debug,warn"`).
    pub level: String,
    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// One purpose's rendition key set as written in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PurposeConfig {
    /// Ordered `[name, descriptor]` pairs, e.g. `["medium", "thumbnail__640x480"]`.
    pub renditions: Vec<[String; 2]>,
    /// Rendition names used for srcset candidates, smallest first.
    pub srcset: Vec<String>,
    /// Static `sizes` attribute value for this purpose.
    pub sizes: String,
}

impl PurposeConfig {
    fn stock(renditions: &[(&str, &str)], srcset: &[&str], sizes: &str) -> Self {
        Self {
            renditions: renditions
                .iter()
                .map(|(name, op)| [name.to_string(), op.to_string()])
                .collect(),
            srcset: srcset.iter().map(|s| s.to_string()).collect(),
            sizes: sizes.to_string(),
        }
    }
}

fn stock_purposes() -> BTreeMap<String, PurposeConfig> {
    let mut purposes = BTreeMap::new();
    purposes.insert(
        PROFILE_IMAGE.to_string(),
        PurposeConfig::stock(
            &[
                ("full_size", "url"),
                ("thumbnail", "thumbnail__100x100"),
                ("small_square_crop", "crop__150x150"),
                ("medium_square_crop", "crop__300x300"),
                ("large_square_crop", "crop__500x500"),
            ],
            &["small_square_crop", "medium_square_crop", "large_square_crop"],
            "(max-width: 640px) 150px, 300px",
        ),
    );
    purposes.insert(
        PROJECT_FEATURED.to_string(),
        PurposeConfig::stock(
            &[
                ("full_size", "url"),
                ("thumbnail", "thumbnail__100x75"),
                ("small", "thumbnail__320x240"),
                ("medium", "thumbnail__640x480"),
                ("large", "thumbnail__1024x768"),
                ("hero", "thumbnail__1600x900"),
                ("square_small", "crop__150x150"),
                ("square_medium", "crop__300x300"),
            ],
            &["small", "medium", "large", "hero"],
            "(max-width: 640px) 100vw, (max-width: 1024px) 50vw, 33vw",
        ),
    );
    purposes.insert(
        PROJECT_GALLERY.to_string(),
        PurposeConfig::stock(
            &[
                ("full_size", "url"),
                ("thumbnail", "thumbnail__100x75"),
                ("card", "thumbnail__400x300"),
                ("gallery", "thumbnail__800x600"),
                ("lightbox", "thumbnail__1200x900"),
            ],
            &["thumbnail", "card", "gallery", "lightbox"],
            "(max-width: 768px) 100vw, 50vw",
        ),
    );
    purposes.insert(
        SOCIAL_SHARE.to_string(),
        PurposeConfig::stock(
            &[
                ("square", "crop__400x400"),
                ("facebook", "crop__1200x630"),
                ("twitter", "crop__1200x600"),
            ],
            &[],
            "",
        ),
    );
    purposes
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(MediaConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<MediaConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: MediaConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the media config file at `path`.
///
/// A missing file yields the stock defaults. A present file is merged on top
/// of the defaults, unknown keys are rejected, and the result is validated.
pub fn load_config(path: &Path) -> Result<MediaConfig, ConfigError> {
    let overlay = if path.exists() {
        let content = fs::read_to_string(path)?;
        Some(toml::from_str::<toml::Value>(&content)?)
    } else {
        None
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `media.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Portfolio Media Configuration
# =============================
# All keys are optional. Values shown are the stock defaults.
# Unknown keys are rejected.

# Directory holding uploaded originals; derivatives are written below it.
media_root = "media"

# Public URL prefix serving media_root.
media_url = "/media/"

[renditions]
# Seconds a generated rendition is trusted without asking storage again.
# 0 re-checks storage on every request. Default: 30 days.
cache_length = 2592000
# Encoding quality for derived images (1-100).
jpeg_quality = 85
# Generate missing derivatives at request time. Set to false for read-only
# deployments where derivatives are produced ahead of time by `warm`.
create_images_on_demand = true
# Subdirectory of media_root that holds derivatives.
sized_directory = "__sized__"

[processing]
# Maximum parallel workers for `warm`. Omit to use all CPU cores.
# max_processes = 4

[logging]
# tracing filter; the RUST_LOG environment variable takes precedence.
level = "info"
json = false

# ---------------------------------------------------------------------------
# Rendition key sets. Descriptors:
#   url            the original image
#   thumbnail__WxH fit inside W x H, aspect preserved
#   crop__WxH      fill W x H exactly, cropped around the point of interest
# `srcset` lists rendition names used as srcset candidates, smallest first.
# ---------------------------------------------------------------------------

[purposes.profile_image]
renditions = [
    ["full_size", "url"],
    ["thumbnail", "thumbnail__100x100"],
    ["small_square_crop", "crop__150x150"],
    ["medium_square_crop", "crop__300x300"],
    ["large_square_crop", "crop__500x500"],
]
srcset = ["small_square_crop", "medium_square_crop", "large_square_crop"]
sizes = "(max-width: 640px) 150px, 300px"

[purposes.project_featured]
renditions = [
    ["full_size", "url"],
    ["thumbnail", "thumbnail__100x75"],
    ["small", "thumbnail__320x240"],
    ["medium", "thumbnail__640x480"],
    ["large", "thumbnail__1024x768"],
    ["hero", "thumbnail__1600x900"],
    ["square_small", "crop__150x150"],
    ["square_medium", "crop__300x300"],
]
srcset = ["small", "medium", "large", "hero"]
sizes = "(max-width: 640px) 100vw, (max-width: 1024px) 50vw, 33vw"

[purposes.project_gallery]
renditions = [
    ["full_size", "url"],
    ["thumbnail", "thumbnail__100x75"],
    ["card", "thumbnail__400x300"],
    ["gallery", "thumbnail__800x600"],
    ["lightbox", "thumbnail__1200x900"],
]
srcset = ["thumbnail", "card", "gallery", "lightbox"]
sizes = "(max-width: 768px) 100vw, 50vw"

[purposes.social_share]
renditions = [
    ["square", "crop__400x400"],
    ["facebook", "crop__1200x630"],
    ["twitter", "crop__1200x600"],
]
srcset = []
sizes = ""
"##
}
