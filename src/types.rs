//! Shared types used across the registry, resolver, tag builder and entities.
//!
//! [`SourceImage`] and [`Ppoi`] are serialized as part of the entity
//! catalog, so their JSON shape is part of the catalog format.

use serde::{Deserialize, Serialize};

/// Primary point of interest: a normalized focal coordinate.
///
/// `(0.0, 0.0)` is the top-left corner, `(1.0, 1.0)` the bottom-right.
/// Crops keep this point as close to the centre of the output as the
/// source allows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ppoi {
    pub x: f32,
    pub y: f32,
}

impl Ppoi {
    /// Build a point of interest, clamping both axes into `[0, 1]`.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Same point, guaranteed within `[0, 1]` even if deserialized out of range.
    pub fn clamped(self) -> Self {
        Self::new(self.x, self.y)
    }
}

impl Default for Ppoi {
    fn default() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) }
}

/// A stored original image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceImage {
    /// Storage key relative to the media root, e.g. `projects/featured/site.jpg`.
    pub path: String,
    #[serde(default)]
    pub ppoi: Ppoi,
    /// Cached pixel width, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Cached pixel height, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl SourceImage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ppoi: Ppoi::default(),
            width: None,
            height: None,
        }
    }

    pub fn with_ppoi(mut self, ppoi: Ppoi) -> Self {
        self.ppoi = ppoi.clamped();
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Cached dimensions when both are present.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}

/// Where a resolved rendition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The un-derived original upload.
    Original,
    /// A fresh entry in the rendition cache; storage was not consulted.
    Cache,
    /// Already present on storage, recorded in the cache.
    Existing,
    /// Generated during this resolution.
    Generated,
}

/// A resolved image URL with its declared dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Unix seconds when the derivative was generated or first seen; 0 for originals.
    pub generated_at: u64,
    /// True when the requested rendition could not be honoured and the
    /// original was substituted.
    pub degraded: bool,
    pub origin: Origin,
}
