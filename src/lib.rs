//! # Portfolio Media
//!
//! Responsive image renditions for a portfolio site. Profiles, projects and
//! project renders each carry image fields; every field is bound to a
//! *purpose* (`profile_image`, `project_featured`, `project_gallery`) whose
//! named renditions are generated on demand and exposed as srcsets and
//! lazy-loading markup.
//!
//! # Architecture
//!
//! ```text
//! media.toml ──► Registry            purpose → ordered (name, op) set + srcset ladder
//!                   │
//! SourceImage ──► Resolver ──► Storage (exists / generate / url)
//!                   │   └────► RenditionCache (.rendition-cache.json)
//!                   ▼
//!              Resolution: Absent | Ready(Rendition) | Unavailable
//!                   │
//!        ┌──────────┴───────────┐
//!        ▼                      ▼
//!   TagBuilder             ImageField::srcset / sizes
//!   <img> / <picture>      (entity layer)
//! ```
//!
//! Nothing on the request path returns an error. A rendition that cannot be
//! produced degrades to the original image, a missing image renders nothing,
//! and markup always contains a plain `<img>` fallback.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `media.toml` loading, stock defaults, validation |
//! | [`registry`] | Purpose tags → validated rendition key sets |
//! | [`types`] | Source images, points of interest, resolved renditions |
//! | [`naming`] | Deterministic derivative paths and URL helpers |
//! | [`imaging`] | Pure-Rust thumbnail and crop generation |
//! | [`storage`] | Where originals and derivatives live |
//! | [`cache`] | Persistent record of known renditions |
//! | [`resolver`] | Rendition resolution with degraded fallback |
//! | [`tags`] | `<img>` and `<picture>` markup via Maud |
//! | [`entities`] | Profile, Project, ProjectRender and their image fields |
//! | [`catalog`] | Read-only entity store backed by a JSON file |
//! | [`warm`] | Eager generation of every rendition |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | Tracing subscriber setup |
//!
//! # Design Decisions
//!
//! ## Deterministic Derivative Paths
//!
//! A derivative's storage key is a pure function of the source path, the
//! operation and (for crops) the point of interest:
//!
//! ```text
//! projects/featured/site.jpg + thumbnail__640x480
//!   → __sized__/projects/featured/site-thumbnail-640x480.jpg
//! ```
//!
//! Request-time resolution and the warm command therefore always agree on
//! where a file lives, and moving the point of interest produces new crops
//! instead of serving stale ones.
//!
//! ## Maud for Markup
//!
//! Tags are built with [Maud](https://maud.lambda.xyz/). Every attribute
//! value is escaped, including caller-supplied extras.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod entities;
pub mod imaging;
pub mod logging;
pub mod naming;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod storage;
pub mod tags;
pub mod types;
pub mod warm;

#[cfg(test)]
pub(crate) mod test_helpers;
