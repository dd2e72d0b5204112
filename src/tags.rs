//! Responsive `<img>` and `<picture>` fragments.
//!
//! Builders never fail. Whatever goes wrong while resolving renditions, a
//! present image always yields markup that shows *something*: at worst a
//! plain `<img>` pointing at the original upload. An absent image yields an
//! empty fragment.
//!
//! ## Lazy loading
//!
//! Lazy tags put the real URLs under `data-src` / `data-srcset` for the
//! page's IntersectionObserver to swap in, and a cheap placeholder under
//! `src`:
//!
//! ```html
//! <img alt="Site" class="w-full lazy" width="640" height="480"
//!      src="/media/__sized__/projects/featured/site-thumbnail-320x240.jpg"
//!      data-src="/media/__sized__/projects/featured/site-thumbnail-640x480.jpg"
//!      loading="lazy" data-srcset="... 320w, ... 640w" sizes="...">
//! ```
//!
//! The placeholder is the smallest ladder rendition that resolves and is
//! narrower than the requested one, else a 1×1 transparent GIF. It is never
//! the full-size original and never the requested image itself.

use crate::naming::replace_extension;
use crate::resolver::{Candidate, Resolution, Resolver, srcset};
use crate::storage::Storage;
use crate::types::{Rendition, SourceImage};
use maud::{Escaper, Markup, Render, html};
use std::fmt::Write;

/// 1×1 transparent GIF used when no small rendition can be served.
pub const TRANSPARENT_GIF: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///ywAAAAAAQABAAACAUwAOw==";

/// Marker class for client-side progressive loading.
pub const LAZY_CLASS: &str = "lazy";

/// Presentation options for a single image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOptions {
    pub alt: String,
    pub class: String,
    /// Defer loading until the image scrolls into view. On by default.
    pub lazy: bool,
    /// Extra attributes, applied last. A name matching a built-in attribute
    /// replaces it.
    pub attrs: Vec<(String, String)>,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            alt: String::new(),
            class: String::new(),
            lazy: true,
            attrs: Vec::new(),
        }
    }
}

impl ImageOptions {
    pub fn new(alt: impl Into<String>) -> Self {
        Self {
            alt: alt.into(),
            ..Self::default()
        }
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn eager(self) -> Self {
        self.lazy(false)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }
}

/// Builds image markup from resolved renditions.
pub struct TagBuilder<'a, S: Storage> {
    resolver: &'a Resolver<S>,
}

impl<'a, S: Storage> TagBuilder<'a, S> {
    pub fn new(resolver: &'a Resolver<S>) -> Self {
        Self { resolver }
    }

    /// A single adaptive `<img>` for `rendition` of `purpose`.
    pub fn responsive_image(
        &self,
        image: Option<&SourceImage>,
        purpose: &str,
        rendition: &str,
        options: &ImageOptions,
    ) -> Markup {
        let Some(source) = image else {
            return html! {};
        };
        let primary = match self.resolver.resolve(image, purpose, rendition) {
            Resolution::Ready(r) => r,
            Resolution::Unavailable { .. } | Resolution::Absent => {
                return self.fallback_image(source, options, true);
            }
        };

        let candidates = self.resolver.candidates(image, purpose);
        let srcset = srcset(&candidates);
        let sizes = self.sizes(purpose);

        let mut tag = Element::new("img");
        tag.set("alt", &options.alt);
        tag.set("class", &options.class);
        if primary.width > 0 {
            tag.set("width", primary.width.to_string());
        }
        if primary.height > 0 {
            tag.set("height", primary.height.to_string());
        }

        if options.lazy {
            tag.set("src", placeholder(&candidates, &primary));
            tag.set("data-src", &primary.url);
            tag.set("loading", "lazy");
            tag.set("class", with_lazy_class(&options.class));
            tag.set("data-srcset", srcset);
        } else {
            tag.set("src", &primary.url);
            tag.set("loading", "eager");
            tag.set("srcset", srcset);
        }
        tag.set("sizes", sizes);

        for (name, value) in &options.attrs {
            if is_valid_attr_name(name) {
                tag.set(name, value);
            }
        }

        html! { (tag) }
    }

    /// A `<picture>` with a WebP source, a source in the stored format, and a
    /// final `<img>` pointing at the original.
    ///
    /// WebP URLs are the stored URLs with the extension swapped. Nothing
    /// checks that those files exist; browsers fall through to the next
    /// source on a 404.
    pub fn picture_element(
        &self,
        image: Option<&SourceImage>,
        purpose: &str,
        options: &ImageOptions,
    ) -> Markup {
        let Some(source) = image else {
            return html! {};
        };

        let candidates = self.resolver.candidates(image, purpose);
        let ready: Vec<&Rendition> = candidates
            .iter()
            .filter_map(|c| c.resolution.usable())
            .collect();

        let webp_srcset = ready
            .iter()
            .map(|r| format!("{} {}w", replace_extension(&r.url, "webp"), r.width))
            .collect::<Vec<_>>()
            .join(", ");
        let native_srcset = srcset(&candidates);
        let sizes = self.sizes(purpose);
        let sizes = Some(sizes.as_str()).filter(|s| !s.is_empty());

        html! {
            picture {
                @if !ready.is_empty() {
                    source type="image/webp" srcset=(webp_srcset) sizes=[sizes];
                    source srcset=(native_srcset) sizes=[sizes];
                }
                (self.fallback_image(source, options, false))
            }
        }
    }

    /// Plain `<img>` of the original upload.
    ///
    /// `always_lazy` matches the last-resort tag, which is lazy regardless of
    /// the requested mode.
    fn fallback_image(
        &self,
        source: &SourceImage,
        options: &ImageOptions,
        always_lazy: bool,
    ) -> Markup {
        let url = self.resolver.storage().url(&source.path);
        let class = Some(options.class.as_str()).filter(|c| !c.is_empty());
        let loading = (always_lazy || options.lazy).then_some("lazy");
        html! {
            img src=(url) alt=(options.alt) class=[class] loading=[loading];
        }
    }

    fn sizes(&self, purpose: &str) -> String {
        self.resolver
            .registry()
            .lookup(purpose)
            .map(|set| set.sizes().to_string())
            .unwrap_or_default()
    }
}

/// Smallest usable ladder rendition that is narrower than `primary`, else
/// the transparent GIF. The placeholder must never be the real image.
fn placeholder(candidates: &[Candidate], primary: &Rendition) -> String {
    candidates
        .iter()
        .filter_map(|c| c.resolution.usable())
        .find(|r| r.url != primary.url && r.width < primary.width)
        .map(|r| r.url.clone())
        .unwrap_or_else(|| TRANSPARENT_GIF.to_string())
}

fn with_lazy_class(class: &str) -> String {
    if class.split_whitespace().any(|c| c == LAZY_CLASS) {
        class.trim().to_string()
    } else {
        format!("{} {}", class.trim(), LAZY_CLASS).trim().to_string()
    }
}

/// Attribute names that can be emitted without escaping.
fn is_valid_attr_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// A void element with dynamic attributes in insertion order.
///
/// Setting an existing name replaces its value in place. Empty values are
/// skipped at render time, except `alt`.
struct Element {
    name: &'static str,
    attrs: Vec<(String, String)>,
}

impl Element {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            attrs: Vec::new(),
        }
    }

    fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }
}

impl Render for Element {
    fn render_to(&self, buffer: &mut String) {
        buffer.push('<');
        buffer.push_str(self.name);
        for (name, value) in &self.attrs {
            if value.is_empty() && name != "alt" {
                continue;
            }
            buffer.push(' ');
            buffer.push_str(name);
            buffer.push_str("=\"");
            // Writing into a String cannot fail.
            let _ = Escaper::new(buffer).write_str(value);
            buffer.push('"');
        }
        buffer.push('>');
    }
}
