//! Portfolio entities and their image fields.
//!
//! Three kinds of records own images:
//!
//! | Entity | Field | Purpose |
//! |---|---|---|
//! | [`Profile`] (singleton) | `profile_image` | `profile_image` |
//! | [`Project`] | `featured_image` | `project_featured` |
//! | [`ProjectRender`] | `image` | `project_gallery` |
//!
//! Each field is exposed as an [`ImageField`], whose `srcset`/`sizes` are
//! read-only views computed from the resolver and registry. Nothing here
//! writes back to an entity.

use crate::config::{PROFILE_IMAGE, PROJECT_FEATURED, PROJECT_GALLERY};
use crate::registry::Registry;
use crate::resolver::{Resolver, srcset};
use crate::storage::Storage;
use crate::types::SourceImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque record identifier assigned by the persistence layer.
pub type EntityId = u64;

/// Every purpose an entity field binds; checked against the registry at startup.
pub const IMAGE_PURPOSES: [&str; 3] = [PROFILE_IMAGE, PROJECT_FEATURED, PROJECT_GALLERY];

/// The kinds of entity that own images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Profile,
    Project,
    ProjectRender,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Profile,
        EntityKind::Project,
        EntityKind::ProjectRender,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Profile => "Profile",
            EntityKind::Project => "Project",
            EntityKind::ProjectRender => "ProjectRender",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Case-insensitive; `_` and `-` are ignored, so `project_render` works.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "profile" => Ok(EntityKind::Profile),
            "project" => Ok(EntityKind::Project),
            "projectrender" | "render" => Ok(EntityKind::ProjectRender),
            _ => Err(format!(
                "unknown model '{s}' (expected Profile, Project or ProjectRender)"
            )),
        }
    }
}

/// One image slot on an entity, bound to a purpose.
#[derive(Debug, Clone, Copy)]
pub struct ImageField<'a> {
    pub name: &'static str,
    pub purpose: &'static str,
    pub image: Option<&'a SourceImage>,
}

impl<'a> ImageField<'a> {
    /// `"<url> <width>w"` for each servable ladder rendition, joined with `", "`.
    /// Empty when no image is set.
    pub fn srcset<S: Storage>(&self, resolver: &Resolver<S>) -> String {
        srcset(&resolver.candidates(self.image, self.purpose))
    }

    /// The purpose's static `sizes` policy; empty if the purpose is unknown.
    pub fn sizes(&self, registry: &Registry) -> String {
        registry
            .lookup(self.purpose)
            .map(|set| set.sizes().to_string())
            .unwrap_or_default()
    }

    /// URL of one rendition of this field.
    pub fn url<S: Storage>(&self, resolver: &Resolver<S>, rendition: &str) -> String {
        resolver.rendition_url(self.image, self.purpose, rendition)
    }
}

/// Anything that owns image fields.
///
/// `Sync` so owners can be warmed in parallel.
pub trait ImageOwner: Sync {
    fn kind(&self) -> EntityKind;

    fn id(&self) -> EntityId;

    /// Human-readable name for CLI output.
    fn label(&self) -> String;

    fn image_fields(&self) -> Vec<ImageField<'_>>;

    /// Look up a field by name.
    fn field(&self, name: &str) -> Option<ImageField<'_>> {
        self.image_fields().into_iter().find(|f| f.name == name)
    }
}

/// The portfolio owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: EntityId,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub twitter: String,
    #[serde(default)]
    pub personal_website: String,
    #[serde(default)]
    pub profile_image: Option<SourceImage>,
    /// Storage key of the uploaded CV.
    #[serde(default)]
    pub resume: Option<String>,
}

impl Profile {
    pub fn profile_image_field(&self) -> ImageField<'_> {
        ImageField {
            name: "profile_image",
            purpose: PROFILE_IMAGE,
            image: self.profile_image.as_ref(),
        }
    }
}

impl ImageOwner for Profile {
    fn kind(&self) -> EntityKind {
        EntityKind::Profile
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> String {
        format!("{} - {}", self.name, self.title)
    }

    fn image_fields(&self) -> Vec<ImageField<'_>> {
        vec![self.profile_image_field()]
    }
}

/// Project category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    #[default]
    Web,
    Mobile,
    Desktop,
    Data,
    Ml,
    Other,
}

impl ProjectType {
    pub fn label(self) -> &'static str {
        match self {
            ProjectType::Web => "Web Application",
            ProjectType::Mobile => "Mobile App",
            ProjectType::Desktop => "Desktop Software",
            ProjectType::Data => "Data Science",
            ProjectType::Ml => "Machine Learning",
            ProjectType::Other => "Other",
        }
    }
}

fn published_default() -> bool {
    true
}

/// A portfolio project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: EntityId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub project_type: ProjectType,
    /// Comma-separated technology names.
    #[serde(default)]
    pub technologies: String,
    #[serde(default)]
    pub github_url: String,
    #[serde(default)]
    pub live_url: String,
    #[serde(default)]
    pub featured_image: Option<SourceImage>,
    /// ISO date, e.g. `2024-03-01`.
    pub start_date: String,
    /// `None` while the project is ongoing.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Higher numbers are listed first.
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "published_default")]
    pub is_published: bool,
    /// Unix seconds.
    #[serde(default)]
    pub created_at: u64,
}

impl Project {
    pub fn is_ongoing(&self) -> bool {
        self.end_date.is_none()
    }

    /// Technologies split on commas, trimmed, blanks dropped.
    pub fn technologies_list(&self) -> Vec<&str> {
        self.technologies
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn featured_image_field(&self) -> ImageField<'_> {
        ImageField {
            name: "featured_image",
            purpose: PROJECT_FEATURED,
            image: self.featured_image.as_ref(),
        }
    }

    pub fn featured_srcset<S: Storage>(&self, resolver: &Resolver<S>) -> String {
        self.featured_image_field().srcset(resolver)
    }

    pub fn featured_sizes(&self, registry: &Registry) -> String {
        self.featured_image_field().sizes(registry)
    }
}

impl ImageOwner for Project {
    fn kind(&self) -> EntityKind {
        EntityKind::Project
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn image_fields(&self) -> Vec<ImageField<'_>> {
        vec![self.featured_image_field()]
    }
}

/// A screenshot or render attached to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRender {
    pub id: EntityId,
    pub project_id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: Option<SourceImage>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub created_at: u64,
}

impl ProjectRender {
    pub fn image_field(&self) -> ImageField<'_> {
        ImageField {
            name: "image",
            purpose: PROJECT_GALLERY,
            image: self.image.as_ref(),
        }
    }

    pub fn gallery_srcset<S: Storage>(&self, resolver: &Resolver<S>) -> String {
        self.image_field().srcset(resolver)
    }

    pub fn gallery_sizes(&self, registry: &Registry) -> String {
        self.image_field().sizes(registry)
    }
}

impl ImageOwner for ProjectRender {
    fn kind(&self) -> EntityKind {
        EntityKind::ProjectRender
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> String {
        if self.title.is_empty() {
            format!("Render {}", self.id)
        } else {
            self.title.clone()
        }
    }

    fn image_fields(&self) -> Vec<ImageField<'_>> {
        vec![self.image_field()]
    }
}

/// Whether `url` is an http(s) URL on github.com.
pub fn is_github_url(url: &str) -> bool {
    let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    else {
        return false;
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    host == "github.com" || host == "www.github.com"
}
