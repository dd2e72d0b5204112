//! Rendition registry: named image purposes and their derived sizes.
//!
//! A purpose tag (e.g. `project_featured`) selects an ordered
//! [`RenditionKeySet`]: `(name, operation)` pairs plus the srcset ladder and
//! the static `sizes` policy for that purpose.
//!
//! The registry is built once from [`MediaConfig`] and never mutated. Every
//! descriptor is parsed and every ladder reference checked at build time, so
//! a typo in a rendition name is a startup error rather than a silent
//! fallback at render time. Adding a size means a new config and a restart,
//! which keeps derived URLs stable for caches.
//!
//! ## Descriptors
//!
//! | Descriptor | Operation |
//! |---|---|
//! | `url` | [`RenditionOp::Identity`]: the original upload |
//! | `thumbnail__WxH` | [`RenditionOp::Thumbnail`]: fit inside the box |
//! | `crop__WxH` | [`RenditionOp::Crop`]: fill the box, crop around the point of interest |

use crate::config::MediaConfig;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown image purpose: {0}")]
    UnknownPurpose(String),
    #[error("purpose '{purpose}': invalid rendition descriptor '{descriptor}' for '{name}'")]
    InvalidDescriptor {
        purpose: String,
        name: String,
        descriptor: String,
    },
    #[error("purpose '{purpose}': rendition name '{name}' declared more than once")]
    DuplicateName { purpose: String, name: String },
    #[error("purpose '{purpose}': srcset entry '{name}' is not a declared rendition")]
    UnknownLadderEntry { purpose: String, name: String },
    #[error("purpose '{0}' declares no renditions")]
    EmptySet(String),
}

/// How a rendition is derived from its source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenditionOp {
    /// The original upload, untouched.
    Identity,
    /// Resize to fit inside `width` × `height`, preserving aspect ratio.
    Thumbnail { width: u32, height: u32 },
    /// Resize to fill `width` × `height` exactly, cropping around the point of interest.
    Crop { width: u32, height: u32 },
}

impl RenditionOp {
    /// Target box dimensions, `None` for the original.
    pub fn target(&self) -> Option<(u32, u32)> {
        match *self {
            RenditionOp::Identity => None,
            RenditionOp::Thumbnail { width, height } | RenditionOp::Crop { width, height } => {
                Some((width, height))
            }
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, RenditionOp::Identity)
    }
}

/// Error returned when a descriptor string is malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid rendition descriptor: {0}")]
pub struct ParseOpError(String);

impl FromStr for RenditionOp {
    type Err = ParseOpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "url" {
            return Ok(RenditionOp::Identity);
        }
        let (kind, size) = s.split_once("__").ok_or_else(|| ParseOpError(s.to_string()))?;
        let (w, h) = size.split_once('x').ok_or_else(|| ParseOpError(s.to_string()))?;
        let width: u32 = w.parse().map_err(|_| ParseOpError(s.to_string()))?;
        let height: u32 = h.parse().map_err(|_| ParseOpError(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(ParseOpError(s.to_string()));
        }
        match kind {
            "thumbnail" => Ok(RenditionOp::Thumbnail { width, height }),
            "crop" => Ok(RenditionOp::Crop { width, height }),
            _ => Err(ParseOpError(s.to_string())),
        }
    }
}

impl fmt::Display for RenditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenditionOp::Identity => write!(f, "url"),
            RenditionOp::Thumbnail { width, height } => write!(f, "thumbnail__{width}x{height}"),
            RenditionOp::Crop { width, height } => write!(f, "crop__{width}x{height}"),
        }
    }
}

/// A named rendition within a key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionKey {
    pub name: String,
    pub op: RenditionOp,
}

/// Ordered, name-unique rendition set for one purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionKeySet {
    purpose: String,
    keys: Vec<RenditionKey>,
    /// Indices into `keys`, smallest candidate first.
    ladder: Vec<usize>,
    sizes: String,
}

impl RenditionKeySet {
    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// Look up a rendition by name.
    pub fn get(&self, name: &str) -> Option<&RenditionKey> {
        self.keys.iter().find(|k| k.name == name)
    }

    /// All renditions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RenditionKey> {
        self.keys.iter()
    }

    /// Renditions used as srcset candidates, smallest first.
    pub fn ladder(&self) -> impl Iterator<Item = &RenditionKey> {
        self.ladder.iter().map(|&i| &self.keys[i])
    }

    /// The static `sizes` attribute value for this purpose.
    pub fn sizes(&self) -> &str {
        &self.sizes
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Immutable purpose → key set mapping.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    sets: BTreeMap<String, RenditionKeySet>,
}

impl Registry {
    /// Build and validate the registry from configuration.
    pub fn from_config(config: &MediaConfig) -> Result<Self, RegistryError> {
        let mut sets = BTreeMap::new();
        for (purpose, purpose_config) in &config.purposes {
            if purpose_config.renditions.is_empty() {
                return Err(RegistryError::EmptySet(purpose.clone()));
            }

            let mut seen = HashSet::new();
            let mut keys = Vec::with_capacity(purpose_config.renditions.len());
            for [name, descriptor] in &purpose_config.renditions {
                if !seen.insert(name.as_str()) {
                    return Err(RegistryError::DuplicateName {
                        purpose: purpose.clone(),
                        name: name.clone(),
                    });
                }
                let op = descriptor
                    .parse::<RenditionOp>()
                    .map_err(|_| RegistryError::InvalidDescriptor {
                        purpose: purpose.clone(),
                        name: name.clone(),
                        descriptor: descriptor.clone(),
                    })?;
                keys.push(RenditionKey {
                    name: name.clone(),
                    op,
                });
            }

            let ladder = purpose_config
                .srcset
                .iter()
                .map(|name| {
                    keys.iter().position(|k| &k.name == name).ok_or_else(|| {
                        RegistryError::UnknownLadderEntry {
                            purpose: purpose.clone(),
                            name: name.clone(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            sets.insert(
                purpose.clone(),
                RenditionKeySet {
                    purpose: purpose.clone(),
                    keys,
                    ladder,
                    sizes: purpose_config.sizes.clone(),
                },
            );
        }
        Ok(Self { sets })
    }

    /// Look up the key set for a purpose tag.
    pub fn lookup(&self, purpose: &str) -> Result<&RenditionKeySet, RegistryError> {
        self.sets
            .get(purpose)
            .ok_or_else(|| RegistryError::UnknownPurpose(purpose.to_string()))
    }

    /// Fail fast if any of `purposes` is not registered.
    ///
    /// Called at startup with every purpose the entity layer binds, so a
    /// missing purpose never reaches request handling.
    pub fn require<'a>(
        &self,
        purposes: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), RegistryError> {
        for purpose in purposes {
            self.lookup(purpose)?;
        }
        Ok(())
    }

    /// Registered purpose tags in sorted order.
    pub fn purposes(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PROJECT_FEATURED, PurposeConfig};

    fn config_with(purpose: &str, renditions: &[(&str, &str)], srcset: &[&str]) -> MediaConfig {
        let mut config = MediaConfig::default();
        config.purposes.clear();
        config.purposes.insert(
            purpose.to_string(),
            PurposeConfig {
                renditions: renditions
                    .iter()
                    .map(|(n, o)| [n.to_string(), o.to_string()])
                    .collect(),
                srcset: srcset.iter().map(|s| s.to_string()).collect(),
                sizes: "100vw".to_string(),
            },
        );
        config
    }

    // =========================================================================
    // Descriptor parsing
    // =========================================================================

    #[test]
    fn parse_identity() {
        assert_eq!("url".parse::<RenditionOp>(), Ok(RenditionOp::Identity));
    }

    #[test]
    fn parse_thumbnail() {
        assert_eq!(
            "thumbnail__640x480".parse::<RenditionOp>(),
            Ok(RenditionOp::Thumbnail {
                width: 640,
                height: 480
            })
        );
    }

    #[test]
    fn parse_crop() {
        assert_eq!(
            "crop__150x150".parse::<RenditionOp>(),
            Ok(RenditionOp::Crop {
                width: 150,
                height: 150
            })
        );
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in [
            "",
            "thumbnail",
            "thumbnail__640",
            "thumbnail__x480",
            "thumbnail__640x",
            "resize__640x480",
            "crop__0x150",
            "crop__-1x150",
            "URL",
        ] {
            assert!(bad.parse::<RenditionOp>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn display_matches_descriptor() {
        for d in ["url", "thumbnail__100x75", "crop__1200x630"] {
            assert_eq!(d.parse::<RenditionOp>().unwrap().to_string(), d);
        }
    }

    #[test]
    fn target_dimensions() {
        assert_eq!(RenditionOp::Identity.target(), None);
        assert_eq!(
            RenditionOp::Crop {
                width: 300,
                height: 200
            }
            .target(),
            Some((300, 200))
        );
    }

    // =========================================================================
    // Registry construction
    // =========================================================================

    #[test]
    fn stock_registry_builds() {
        let registry = Registry::from_config(&MediaConfig::default()).unwrap();
        let set = registry.lookup(PROJECT_FEATURED).unwrap();
        assert_eq!(set.len(), 8);
        assert_eq!(
            set.get("medium").unwrap().op,
            RenditionOp::Thumbnail {
                width: 640,
                height: 480
            }
        );
        let ladder: Vec<&str> = set.ladder().map(|k| k.name.as_str()).collect();
        assert_eq!(ladder, vec!["small", "medium", "large", "hero"]);
    }

    #[test]
    fn lookup_unknown_purpose() {
        let registry = Registry::from_config(&MediaConfig::default()).unwrap();
        assert_eq!(
            registry.lookup("banner"),
            Err(RegistryError::UnknownPurpose("banner".to_string()))
        );
    }

    #[test]
    fn require_reports_first_missing_purpose() {
        let registry = Registry::from_config(&MediaConfig::default()).unwrap();
        assert!(registry.require([PROJECT_FEATURED]).is_ok());
        assert_eq!(
            registry.require([PROJECT_FEATURED, "avatar"]),
            Err(RegistryError::UnknownPurpose("avatar".to_string()))
        );
    }

    #[test]
    fn duplicate_names_rejected() {
        let config = config_with(
            "p",
            &[("small", "thumbnail__10x10"), ("small", "crop__20x20")],
            &[],
        );
        assert!(matches!(
            Registry::from_config(&config),
            Err(RegistryError::DuplicateName { name, .. }) if name == "small"
        ));
    }

    #[test]
    fn invalid_descriptor_rejected() {
        let config = config_with("p", &[("small", "thumbnial__10x10")], &[]);
        assert!(matches!(
            Registry::from_config(&config),
            Err(RegistryError::InvalidDescriptor { descriptor, .. }) if descriptor == "thumbnial__10x10"
        ));
    }

    #[test]
    fn unknown_ladder_entry_rejected() {
        let config = config_with("p", &[("small", "thumbnail__10x10")], &["smal"]);
        assert!(matches!(
            Registry::from_config(&config),
            Err(RegistryError::UnknownLadderEntry { name, .. }) if name == "smal"
        ));
    }

    #[test]
    fn empty_set_rejected() {
        let config = config_with("p", &[], &[]);
        assert_eq!(
            Registry::from_config(&config).unwrap_err(),
            RegistryError::EmptySet("p".to_string())
        );
    }

    #[test]
    fn ladder_follows_srcset_order_not_declaration_order() {
        let config = config_with(
            "p",
            &[("big", "thumbnail__800x600"), ("tiny", "thumbnail__80x60")],
            &["tiny", "big"],
        );
        let registry = Registry::from_config(&config).unwrap();
        let ladder: Vec<&str> = registry
            .lookup("p")
            .unwrap()
            .ladder()
            .map(|k| k.name.as_str())
            .collect();
        assert_eq!(ladder, vec!["tiny", "big"]);
    }
}
