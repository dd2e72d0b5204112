//! Rendition resolution: `(image, purpose, rendition)` → URL and dimensions.
//!
//! Every outcome is an explicit [`Resolution`] value. Nothing here returns an
//! error to the caller:
//!
//! | Situation | Result |
//! |---|---|
//! | No image set on the field | [`Resolution::Absent`] |
//! | Unknown purpose or rendition name | original URL, `degraded = true` |
//! | `url` (identity) rendition | original URL |
//! | Fresh cache record | recorded URL, storage untouched |
//! | Derivative already on storage | recorded, then returned |
//! | Derivative missing | generated through [`Storage::generate_derivative`] |
//! | Generation refused or failed | [`Resolution::Unavailable`] |
//!
//! Declared width/height of a derived rendition are the operation's target
//! box, so callers can rely on them for layout whether or not the pixels were
//! produced in this request.
//!
//! ## Concurrency
//!
//! The cache and stats sit behind mutexes that are never held while storage
//! generates. Two threads resolving the same new derivative may both
//! generate it; both write the same key, so the result converges.

use crate::cache::{CacheEntry, CacheStats, RenditionCache, now_unix, rendition_id};
use crate::config::RenditionSettings;
use crate::naming::derivative_path;
use crate::registry::{Registry, RenditionOp};
use crate::storage::{Storage, StorageError};
use crate::types::{Origin, Rendition, SourceImage};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Outcome of resolving one rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The image field is empty.
    Absent,
    /// A URL to serve, possibly the degraded original.
    Ready(Rendition),
    /// The derivative does not exist and could not be generated.
    Unavailable { key: String },
}

impl Resolution {
    pub fn rendition(&self) -> Option<&Rendition> {
        match self {
            Resolution::Ready(r) => Some(r),
            _ => None,
        }
    }

    /// The rendition, only if it is exactly what was asked for.
    pub fn usable(&self) -> Option<&Rendition> {
        self.rendition().filter(|r| !r.degraded)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Resolution::Absent)
    }
}

/// One srcset ladder entry and how it resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub resolution: Resolution,
}

/// Join usable candidates as `"<url> <width>w"` with `", "`.
///
/// Degraded and unavailable candidates are dropped.
pub fn srcset(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .filter_map(|c| c.resolution.usable())
        .map(|r| format!("{} {}w", r.url, r.width))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves renditions against a registry and a storage backend.
pub struct Resolver<S: Storage> {
    registry: Arc<Registry>,
    storage: S,
    sized_directory: String,
    cache_length: u64,
    cache: Mutex<RenditionCache>,
    stats: Mutex<CacheStats>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: Storage> Resolver<S> {
    pub fn new(registry: Arc<Registry>, storage: S, settings: &RenditionSettings) -> Self {
        Self {
            registry,
            storage,
            sized_directory: settings.sized_directory.clone(),
            cache_length: settings.cache_length,
            cache: Mutex::new(RenditionCache::empty()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Start from a previously saved cache.
    pub fn with_cache(self, cache: RenditionCache) -> Self {
        *lock(&self.cache) = cache;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Resolve `rendition` of `purpose` for an optional image.
    pub fn resolve(
        &self,
        image: Option<&SourceImage>,
        purpose: &str,
        rendition: &str,
    ) -> Resolution {
        let Some(image) = image else {
            return Resolution::Absent;
        };

        let set = match self.registry.lookup(purpose) {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, image = %image.path, "serving original");
                return Resolution::Ready(self.original(image, true));
            }
        };

        match set.get(rendition) {
            Some(key) => self.resolve_op(image, key.op),
            None => {
                warn!(
                    purpose,
                    rendition,
                    image = %image.path,
                    "unknown rendition, serving original"
                );
                Resolution::Ready(self.original(image, true))
            }
        }
    }

    /// Resolve a single operation on a present image.
    pub fn resolve_op(&self, image: &SourceImage, op: RenditionOp) -> Resolution {
        let Some((width, height)) = op.target() else {
            return Resolution::Ready(self.original(image, false));
        };

        let key = derivative_path(&self.sized_directory, &image.path, op, image.ppoi);
        let id = rendition_id(&image.path, op, image.ppoi);
        let now = now_unix();

        // Records for another key (renamed sized directory) are ignored.
        let (known, previous) = {
            let cache = lock(&self.cache);
            (
                cache
                    .fresh(&id, now, self.cache_length)
                    .filter(|e| e.key == key)
                    .cloned(),
                cache
                    .get(&id)
                    .filter(|e| e.key == key)
                    .map(|e| e.generated_at),
            )
        };
        if let Some(entry) = known {
            lock(&self.stats).hit();
            // URLs are rebuilt so a changed media_url takes effect at once.
            return Resolution::Ready(Rendition {
                url: self.storage.url(&entry.key),
                width,
                height,
                generated_at: entry.generated_at,
                degraded: false,
                origin: Origin::Cache,
            });
        }

        let (url, generated_at, origin) = if self.storage.exists(&key) {
            lock(&self.stats).existing();
            (self.storage.url(&key), previous.unwrap_or(now), Origin::Existing)
        } else {
            match self.storage.generate_derivative(image, op, &key) {
                Ok(url) => {
                    debug!(key = %key, "generated rendition");
                    lock(&self.stats).generated();
                    (url, now, Origin::Generated)
                }
                Err(e) => {
                    match &e {
                        StorageError::Unavailable(_) => debug!(key = %key, "rendition unavailable"),
                        _ => warn!(key = %key, error = %e, "rendition generation failed"),
                    }
                    lock(&self.cache).remove(&id);
                    lock(&self.stats).unavailable();
                    return Resolution::Unavailable { key };
                }
            }
        };

        lock(&self.cache).insert(
            id,
            CacheEntry {
                key,
                url: url.clone(),
                width,
                height,
                generated_at,
                verified_at: now,
            },
        );
        Resolution::Ready(Rendition {
            url,
            width,
            height,
            generated_at,
            degraded: false,
            origin,
        })
    }

    /// The un-derived original as a rendition.
    pub fn original(&self, image: &SourceImage, degraded: bool) -> Rendition {
        let (width, height) = self.source_dimensions(image);
        Rendition {
            url: self.storage.url(&image.path),
            width,
            height,
            generated_at: 0,
            degraded,
            origin: Origin::Original,
        }
    }

    /// Source pixel size: cached on the image, else read from storage, else `(0, 0)`.
    pub fn source_dimensions(&self, image: &SourceImage) -> (u32, u32) {
        image.dimensions().unwrap_or_else(|| {
            self.storage.identify(&image.path).unwrap_or_else(|e| {
                debug!(image = %image.path, error = %e, "could not read source dimensions");
                (0, 0)
            })
        })
    }

    /// URL of a rendition; empty for an absent image, the original when the
    /// rendition cannot be served.
    pub fn rendition_url(&self, image: Option<&SourceImage>, purpose: &str, rendition: &str) -> String {
        match (image, self.resolve(image, purpose, rendition)) {
            (_, Resolution::Ready(r)) => r.url,
            (Some(image), Resolution::Unavailable { .. }) => self.storage.url(&image.path),
            _ => String::new(),
        }
    }

    /// Dimensions of a rendition; `(0, 0)` for an absent image, the source
    /// size when the rendition cannot be served.
    pub fn dimensions(
        &self,
        image: Option<&SourceImage>,
        purpose: &str,
        rendition: &str,
    ) -> (u32, u32) {
        match (image, self.resolve(image, purpose, rendition)) {
            (_, Resolution::Ready(r)) => (r.width, r.height),
            (Some(image), Resolution::Unavailable { .. }) => self.source_dimensions(image),
            _ => (0, 0),
        }
    }

    /// Resolve every srcset ladder entry of `purpose`, smallest first.
    ///
    /// Empty for an absent image or an unknown purpose.
    pub fn candidates(&self, image: Option<&SourceImage>, purpose: &str) -> Vec<Candidate> {
        let Some(image) = image else {
            return Vec::new();
        };
        let Ok(set) = self.registry.lookup(purpose) else {
            warn!(purpose, "unknown purpose, no srcset candidates");
            return Vec::new();
        };
        set.ladder()
            .map(|key| Candidate {
                name: key.name.clone(),
                resolution: self.resolve_op(image, key.op),
            })
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        *lock(&self.stats)
    }

    pub fn cache_len(&self) -> usize {
        lock(&self.cache).len()
    }

    /// Persist the rendition cache under `media_root`.
    pub fn save_cache(&self, media_root: &Path) -> io::Result<()> {
        lock(&self.cache).save(media_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PROFILE_IMAGE, PROJECT_FEATURED, PROJECT_GALLERY};
    use crate::storage::tests::MockStorage;
    use crate::test_helpers::*;
    use crate::types::Ppoi;

    const MEDIUM: RenditionOp = RenditionOp::Thumbnail {
        width: 640,
        height: 480,
    };
    const MEDIUM_KEY: &str = "__sized__/projects/featured/site-thumbnail-640x480.jpg";

    // =========================================================================
    // Basic outcomes
    // =========================================================================

    #[test]
    fn absent_image_is_absent() {
        let resolver = mock_resolver(MockStorage::new());
        for (purpose, rendition) in [
            (PROJECT_FEATURED, "medium"),
            (PROJECT_FEATURED, "nonexistent_size"),
            ("no_such_purpose", "medium"),
        ] {
            assert_eq!(resolver.resolve(None, purpose, rendition), Resolution::Absent);
        }
        assert!(resolver.storage().generated().is_empty());
    }

    #[test]
    fn featured_medium_resolves_to_target_size() {
        let resolver = mock_resolver(MockStorage::new());
        let image = featured_image();

        let resolution = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");
        let r = resolution.rendition().unwrap();
        assert_eq!(r.url, format!("/media/{MEDIUM_KEY}"));
        assert_eq!((r.width, r.height), (640, 480));
        assert!(!r.degraded);
        assert_eq!(r.origin, Origin::Generated);
    }

    #[test]
    fn unknown_rendition_serves_degraded_original() {
        let resolver = mock_resolver(MockStorage::new().with_image(FEATURED_PATH, 2400, 1600));
        let image = SourceImage::new(FEATURED_PATH);

        let r = resolver
            .resolve(Some(&image), PROJECT_FEATURED, "nonexistent_size")
            .rendition()
            .cloned()
            .unwrap();
        assert_eq!(r.url, format!("/media/{FEATURED_PATH}"));
        assert!(r.degraded);
        assert_eq!(r.origin, Origin::Original);
        assert_eq!((r.width, r.height), (2400, 1600));
    }

    #[test]
    fn unknown_purpose_at_request_time_degrades() {
        let resolver = mock_resolver(MockStorage::new());
        let image = featured_image();
        let r = resolver.resolve(Some(&image), "banner", "medium");
        assert!(r.rendition().unwrap().degraded);
    }

    #[test]
    fn identity_rendition_is_original_not_degraded() {
        let resolver = mock_resolver(MockStorage::new());
        let image = featured_image();
        let r = resolver
            .resolve(Some(&image), PROJECT_FEATURED, "full_size")
            .rendition()
            .cloned()
            .unwrap();
        assert!(!r.degraded);
        assert_eq!(r.origin, Origin::Original);
        assert_eq!((r.width, r.height), (2400, 1600));
        assert!(resolver.storage().generated().is_empty());
    }

    #[test]
    fn every_registered_rendition_declares_target_size() {
        let resolver = mock_resolver(MockStorage::new());
        let image = featured_image();
        let registry = stock_registry();

        for purpose in registry.purposes() {
            for key in registry.lookup(purpose).unwrap().iter() {
                let Some(target) = key.op.target() else {
                    continue;
                };
                let r = resolver.resolve(Some(&image), purpose, &key.name);
                let r = r.rendition().unwrap();
                assert_eq!((r.width, r.height), target, "{purpose}/{}", key.name);
                assert!(!r.degraded);
            }
        }
    }

    // =========================================================================
    // Idempotence and caching
    // =========================================================================

    #[test]
    fn repeated_resolution_is_identical_and_generates_once() {
        let resolver = mock_resolver(MockStorage::new());
        let image = featured_image();

        let first = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");
        let second = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");

        assert_eq!(
            first.rendition().unwrap().url,
            second.rendition().unwrap().url
        );
        assert_eq!(second.rendition().unwrap().origin, Origin::Cache);
        assert_eq!(resolver.storage().generated(), vec![MEDIUM_KEY.to_string()]);

        let stats = resolver.stats();
        assert_eq!((stats.generated, stats.hits), (1, 1));
    }

    #[test]
    fn existing_derivative_is_not_regenerated() {
        let resolver = mock_resolver(MockStorage::new().with_key(MEDIUM_KEY));
        let image = featured_image();

        let r = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");
        assert_eq!(r.rendition().unwrap().origin, Origin::Existing);
        assert!(resolver.storage().generated().is_empty());
        assert_eq!(resolver.stats().existing, 1);
    }

    #[test]
    fn zero_cache_length_rechecks_storage() {
        let mut settings = RenditionSettings::default();
        settings.cache_length = 0;
        let resolver = Resolver::new(stock_registry(), MockStorage::new(), &settings);
        let image = featured_image();

        resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");
        let second = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");

        assert_eq!(second.rendition().unwrap().origin, Origin::Existing);
        assert_eq!(resolver.storage().generated().len(), 1);
    }

    #[test]
    fn stale_entry_regenerates_when_storage_lost_the_file() {
        let resolver = mock_resolver(MockStorage::new());
        let image = featured_image();
        let id = rendition_id(&image.path, MEDIUM, image.ppoi);

        let mut cache = RenditionCache::empty();
        cache.insert(
            id,
            CacheEntry {
                key: MEDIUM_KEY.into(),
                url: format!("/media/{MEDIUM_KEY}"),
                width: 640,
                height: 480,
                generated_at: 1,
                verified_at: 1,
            },
        );
        let resolver = resolver.with_cache(cache);

        let r = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");
        assert_eq!(r.rendition().unwrap().origin, Origin::Generated);
    }

    #[test]
    fn stale_entry_keeps_generated_at_when_file_still_exists() {
        let resolver = mock_resolver(MockStorage::new().with_key(MEDIUM_KEY));
        let image = featured_image();
        let mut cache = RenditionCache::empty();
        cache.insert(
            rendition_id(&image.path, MEDIUM, image.ppoi),
            CacheEntry {
                key: MEDIUM_KEY.into(),
                url: format!("/media/{MEDIUM_KEY}"),
                width: 640,
                height: 480,
                generated_at: 42,
                verified_at: 42,
            },
        );
        let resolver = resolver.with_cache(cache);

        let r = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");
        let r = r.rendition().unwrap();
        assert_eq!(r.origin, Origin::Existing);
        assert_eq!(r.generated_at, 42);
    }

    #[test]
    fn cache_hit_url_follows_current_media_url() {
        let resolver = mock_resolver(MockStorage::new());
        let image = featured_image();
        let mut cache = RenditionCache::empty();
        cache.insert(
            rendition_id(&image.path, MEDIUM, image.ppoi),
            CacheEntry {
                key: MEDIUM_KEY.into(),
                url: format!("https://old-cdn.example/{MEDIUM_KEY}"),
                width: 640,
                height: 480,
                generated_at: 7,
                verified_at: now_unix(),
            },
        );
        let resolver = resolver.with_cache(cache);

        let r = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");
        let r = r.rendition().unwrap();
        assert_eq!(r.origin, Origin::Cache);
        assert_eq!(r.url, format!("/media/{MEDIUM_KEY}"));
        assert_eq!(r.generated_at, 7);
        assert!(resolver.storage().generated().is_empty());
    }

    #[test]
    fn cache_entry_for_another_key_is_not_trusted() {
        let resolver = mock_resolver(MockStorage::new());
        let image = featured_image();
        let mut cache = RenditionCache::empty();
        cache.insert(
            rendition_id(&image.path, MEDIUM, image.ppoi),
            CacheEntry {
                key: "old_sized/projects/featured/site-thumbnail-640x480.jpg".into(),
                url: "/media/old_sized/projects/featured/site-thumbnail-640x480.jpg".into(),
                width: 640,
                height: 480,
                generated_at: 7,
                verified_at: now_unix(),
            },
        );
        let resolver = resolver.with_cache(cache);

        let r = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");
        let r = r.rendition().unwrap();
        assert_eq!(r.origin, Origin::Generated);
        assert_eq!(r.url, format!("/media/{MEDIUM_KEY}"));
        assert_eq!(resolver.storage().generated(), vec![MEDIUM_KEY.to_string()]);
    }

    #[test]
    fn local_storage_generates_once_then_finds_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_test_jpeg(&tmp.path().join(FEATURED_PATH), 2400, 1600);
        let image = SourceImage::new(FEATURED_PATH);

        let first = local_resolver(&tmp);
        let r = first.resolve(Some(&image), PROJECT_FEATURED, "medium");
        assert_eq!(r.rendition().unwrap().origin, Origin::Generated);
        assert!(tmp.path().join(MEDIUM_KEY).is_file());

        // Fresh resolver, empty cache: the file on disk is reused.
        let second = local_resolver(&tmp);
        let r = second.resolve(Some(&image), PROJECT_FEATURED, "medium");
        assert_eq!(r.rendition().unwrap().origin, Origin::Existing);
        assert_eq!(second.stats().generated, 0);
    }

    #[test]
    fn crop_path_follows_ppoi() {
        let resolver = mock_resolver(MockStorage::new());
        let centred = profile_image();
        let shifted = profile_image().with_ppoi(Ppoi::new(0.5, 0.2));

        let a = resolver.rendition_url(Some(&centred), PROFILE_IMAGE, "small_square_crop");
        let b = resolver.rendition_url(Some(&shifted), PROFILE_IMAGE, "small_square_crop");
        assert_ne!(a, b);
        assert!(b.contains("c0-5__0-2"));
    }

    // =========================================================================
    // Unavailable derivatives
    // =========================================================================

    #[test]
    fn read_only_storage_serves_existing_and_refuses_new() {
        let resolver = mock_resolver(MockStorage::read_only().with_key(MEDIUM_KEY));
        let image = featured_image();

        assert!(matches!(
            resolver.resolve(Some(&image), PROJECT_FEATURED, "medium"),
            Resolution::Ready(_)
        ));
        assert_eq!(
            resolver.resolve(Some(&image), PROJECT_FEATURED, "large"),
            Resolution::Unavailable {
                key: "__sized__/projects/featured/site-thumbnail-1024x768.jpg".into()
            }
        );
        assert_eq!(resolver.stats().unavailable, 1);
    }

    #[test]
    fn backend_failure_is_unavailable_not_error() {
        let resolver = mock_resolver(MockStorage::failing());
        let image = featured_image();
        assert!(matches!(
            resolver.resolve(Some(&image), PROJECT_GALLERY, "card"),
            Resolution::Unavailable { .. }
        ));
        assert_eq!(resolver.cache_len(), 0);
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn rendition_url_fallbacks() {
        let resolver = mock_resolver(MockStorage::read_only());
        let image = featured_image();

        assert_eq!(resolver.rendition_url(None, PROJECT_FEATURED, "medium"), "");
        assert_eq!(
            resolver.rendition_url(Some(&image), PROJECT_FEATURED, "medium"),
            format!("/media/{FEATURED_PATH}")
        );
    }

    #[test]
    fn dimensions_fallbacks() {
        let resolver = mock_resolver(MockStorage::read_only());
        let image = featured_image();

        assert_eq!(resolver.dimensions(None, PROJECT_FEATURED, "medium"), (0, 0));
        assert_eq!(
            resolver.dimensions(Some(&image), PROJECT_FEATURED, "medium"),
            (2400, 1600)
        );
    }

    #[test]
    fn source_dimensions_unknown_is_zero() {
        let resolver = mock_resolver(MockStorage::new());
        assert_eq!(
            resolver.source_dimensions(&SourceImage::new("nowhere.jpg")),
            (0, 0)
        );
    }

    #[test]
    fn candidates_follow_ladder_and_srcset_drops_unavailable() {
        let resolver = mock_resolver(
            MockStorage::read_only()
                .with_key("__sized__/projects/featured/site-thumbnail-320x240.jpg")
                .with_key(MEDIUM_KEY),
        );
        let image = featured_image();

        let candidates = resolver.candidates(Some(&image), PROJECT_FEATURED);
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["small", "medium", "large", "hero"]);
        assert!(matches!(
            candidates[3].resolution,
            Resolution::Unavailable { .. }
        ));

        assert_eq!(
            srcset(&candidates),
            format!(
                "/media/__sized__/projects/featured/site-thumbnail-320x240.jpg 320w, /media/{MEDIUM_KEY} 640w"
            )
        );
    }

    #[test]
    fn candidates_empty_for_absent_or_unknown_purpose() {
        let resolver = mock_resolver(MockStorage::new());
        let image = featured_image();
        assert!(resolver.candidates(None, PROJECT_FEATURED).is_empty());
        assert!(resolver.candidates(Some(&image), "banner").is_empty());
    }

    #[test]
    fn save_cache_persists_records() {
        let tmp = tempfile::TempDir::new().unwrap();
        let resolver = mock_resolver(MockStorage::new());
        resolver.resolve(Some(&featured_image()), PROJECT_FEATURED, "medium");
        resolver.save_cache(tmp.path()).unwrap();

        assert_eq!(RenditionCache::load(tmp.path()).len(), 1);
    }

    #[test]
    fn resolver_is_shareable_across_threads() {
        let resolver = mock_resolver(MockStorage::new());
        let image = featured_image();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let r = resolver.resolve(Some(&image), PROJECT_FEATURED, "medium");
                    assert_eq!(r.rendition().unwrap().url, format!("/media/{MEDIUM_KEY}"));
                });
            }
        });
    }
}
