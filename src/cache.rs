//! Rendition cache: which derivatives are known to exist, and since when.
//!
//! Checking storage for every rendition on every page render is wasteful
//! (and on object storage, slow). The resolver records each derivative it
//! has generated or found here, and trusts a record for `cache_length`
//! seconds before asking storage again.
//!
//! ## Cache keys
//!
//! Entries are **content-addressed** by a SHA-256 of the rendition identity:
//! source path, operation descriptor, and (for crops) the point of interest.
//! This is the same triple that determines the derivative's storage key, so a
//! given id always refers to the same file.
//!
//! A record is *fresh* while `now - verified_at < cache_length`. A
//! `cache_length` of `0` disables trust entirely: storage is re-checked on
//! every resolution. Stale records are never deleted eagerly; the next
//! resolution re-verifies and refreshes them.
//!
//! ## Storage
//!
//! The cache is a JSON file at `<media_root>/.rendition-cache.json`, written
//! by the `warm` command so request-time resolution starts warm. A missing,
//! corrupt, or wrong-version file loads as an empty cache.

use crate::naming::ppoi_token;
use crate::registry::RenditionOp;
use crate::types::Ppoi;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of the cache file within the media root.
const CACHE_FILENAME: &str = ".rendition-cache.json";

/// Version of the cache file format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const CACHE_VERSION: u32 = 1;

/// A derivative known to exist on storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    /// Storage key of the derivative.
    pub key: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Unix seconds when the derivative was generated or first found.
    pub generated_at: u64,
    /// Unix seconds when storage last confirmed the derivative.
    pub verified_at: u64,
}

impl CacheEntry {
    /// Whether this record can be trusted at `now` without asking storage.
    pub fn is_fresh(&self, now: u64, cache_length: u64) -> bool {
        cache_length > 0 && now.saturating_sub(self.verified_at) < cache_length
    }
}

/// On-disk rendition cache keyed by [`rendition_id`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenditionCache {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
}

impl Default for RenditionCache {
    fn default() -> Self {
        Self::empty()
    }
}

impl RenditionCache {
    /// Create an empty cache (used for `--no-cache` or first run).
    pub fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the media root. Returns an empty cache if the file doesn't
    /// exist or can't be parsed (version mismatch, corruption).
    pub fn load(media_root: &Path) -> Self {
        let content = match std::fs::read_to_string(cache_path(media_root)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let cache: Self = match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        if cache.version != CACHE_VERSION {
            return Self::empty();
        }
        cache
    }

    /// Save to the media root.
    pub fn save(&self, media_root: &Path) -> io::Result<()> {
        std::fs::create_dir_all(media_root)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(cache_path(media_root), json)
    }

    /// Record only if still trusted at `now`.
    pub fn fresh(&self, id: &str, now: u64, cache_length: u64) -> Option<&CacheEntry> {
        self.entries
            .get(id)
            .filter(|entry| entry.is_fresh(now, cache_length))
    }

    pub fn get(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    pub fn insert(&mut self, id: String, entry: CacheEntry) {
        self.entries.insert(id, entry);
    }

    pub fn remove(&mut self, id: &str) -> Option<CacheEntry> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SHA-256 identity of a rendition, returned as a hex string.
///
/// Thumbnails ignore the point of interest, matching their storage key.
pub fn rendition_id(source_path: &str, op: RenditionOp, ppoi: Ppoi) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_path.as_bytes());
    hasher.update(b"\0");
    hasher.update(op.to_string().as_bytes());
    if let RenditionOp::Crop { .. } = op {
        hasher.update(b"\0");
        hasher.update(ppoi_token(ppoi).as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Current time in unix seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Resolve the cache file path for a media root.
pub fn cache_path(media_root: &Path) -> PathBuf {
    media_root.join(CACHE_FILENAME)
}

/// How derived renditions were satisfied during a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Fresh cache record, storage not consulted.
    pub hits: u32,
    /// Found on storage and recorded.
    pub existing: u32,
    /// Generated.
    pub generated: u32,
    /// Could not be served.
    pub unavailable: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn existing(&mut self) {
        self.existing += 1;
    }

    pub fn generated(&mut self) {
        self.generated += 1;
    }

    pub fn unavailable(&mut self) {
        self.unavailable += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.existing + self.generated + self.unavailable
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 || self.existing > 0 {
            write!(
                f,
                "{} cached, {} existing, {} generated",
                self.hits, self.existing, self.generated
            )?;
        } else {
            write!(f, "{} generated", self.generated)?;
        }
        if self.unavailable > 0 {
            write!(f, ", {} unavailable", self.unavailable)?;
        }
        if self.hits > 0 || self.existing > 0 || self.unavailable > 0 {
            write!(f, " ({} total)", self.total())?;
        }
        Ok(())
    }
}
