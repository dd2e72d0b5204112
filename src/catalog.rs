//! Read-only entity persistence.
//!
//! The site's database is an external collaborator; this crate only reads
//! image references through [`EntityStore`]. [`Catalog`] is the JSON-file
//! implementation used by the CLI:
//!
//! ```json
//! {
//!   "profiles": [{"id": 1, "name": "Ada", "title": "Engineer",
//!                 "profile_image": {"path": "profile/ada.jpg"}}],
//!   "projects": [{"id": 1, "title": "Site", "slug": "site", "start_date": "2024-01-01",
//!                 "featured_image": {"path": "projects/featured/site.jpg"}}],
//!   "renders":  [{"id": 1, "project_id": 1,
//!                 "image": {"path": "projects/renders/home.png", "ppoi": {"x": 0.5, "y": 0.2}}}]
//! }
//! ```

use crate::entities::{
    EntityId, EntityKind, ImageOwner, Profile, Project, ProjectRender, is_github_url,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Catalog validation error: {0}")]
    Validation(String),
}

/// Read access to the entities that own images.
pub trait EntityStore: Sync {
    fn profiles(&self) -> &[Profile];
    fn projects(&self) -> &[Project];
    fn renders(&self) -> &[ProjectRender];

    /// The singleton profile, if one exists.
    fn profile(&self) -> Option<&Profile> {
        self.profiles().first()
    }

    fn project(&self, id: EntityId) -> Option<&Project> {
        self.projects().iter().find(|p| p.id == id)
    }

    fn project_by_slug(&self, slug: &str) -> Option<&Project> {
        self.projects().iter().find(|p| p.slug == slug)
    }

    fn render(&self, id: EntityId) -> Option<&ProjectRender> {
        self.renders().iter().find(|r| r.id == id)
    }

    /// A project's renders in gallery order.
    fn renders_for(&self, project_id: EntityId) -> Vec<&ProjectRender> {
        let mut renders: Vec<&ProjectRender> = self
            .renders()
            .iter()
            .filter(|r| r.project_id == project_id)
            .collect();
        renders.sort_by_key(|r| (r.display_order, r.created_at));
        renders
    }

    /// Published projects: highest `display_order` first, featured before
    /// non-featured, newest first.
    fn published_projects(&self) -> Vec<&Project> {
        let mut projects: Vec<&Project> =
            self.projects().iter().filter(|p| p.is_published).collect();
        projects.sort_by(|a, b| {
            b.display_order
                .cmp(&a.display_order)
                .then(b.is_featured.cmp(&a.is_featured))
                .then(b.created_at.cmp(&a.created_at))
        });
        projects
    }

    /// All image owners of one kind, as trait objects.
    fn owners(&self, kind: EntityKind) -> Vec<&dyn ImageOwner> {
        match kind {
            EntityKind::Profile => self.profiles().iter().map(|p| p as &dyn ImageOwner).collect(),
            EntityKind::Project => self.projects().iter().map(|p| p as &dyn ImageOwner).collect(),
            EntityKind::ProjectRender => {
                self.renders().iter().map(|r| r as &dyn ImageOwner).collect()
            }
        }
    }

    /// One image owner by kind and id.
    fn owner(&self, kind: EntityKind, id: EntityId) -> Option<&dyn ImageOwner> {
        self.owners(kind).into_iter().find(|o| o.id() == id)
    }
}

/// Entities loaded from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Catalog {
    pub profiles: Vec<Profile>,
    pub projects: Vec<Project>,
    pub renders: Vec<ProjectRender>,
}

impl Catalog {
    /// Load and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate catalog JSON.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check the invariants the database would otherwise enforce.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.profiles.len() > 1 {
            return Err(CatalogError::Validation(format!(
                "at most one profile is allowed, found {}",
                self.profiles.len()
            )));
        }

        let mut ids = HashSet::new();
        let mut slugs = HashSet::new();
        for project in &self.projects {
            if !ids.insert(project.id) {
                return Err(CatalogError::Validation(format!(
                    "duplicate project id {}",
                    project.id
                )));
            }
            if project.slug.is_empty() || !slugs.insert(project.slug.as_str()) {
                return Err(CatalogError::Validation(format!(
                    "project {} has an empty or duplicate slug '{}'",
                    project.id, project.slug
                )));
            }
            if !project.github_url.is_empty() && !is_github_url(&project.github_url) {
                return Err(CatalogError::Validation(format!(
                    "project '{}': github_url is not a GitHub URL",
                    project.slug
                )));
            }
        }

        for profile in &self.profiles {
            if !profile.github.is_empty() && !is_github_url(&profile.github) {
                return Err(CatalogError::Validation(
                    "profile github is not a GitHub URL".into(),
                ));
            }
        }

        let mut render_ids = HashSet::new();
        for render in &self.renders {
            if !render_ids.insert(render.id) {
                return Err(CatalogError::Validation(format!(
                    "duplicate render id {}",
                    render.id
                )));
            }
            if !ids.contains(&render.project_id) {
                return Err(CatalogError::Validation(format!(
                    "render {} references missing project {}",
                    render.id, render.project_id
                )));
            }
        }
        Ok(())
    }
}

impl EntityStore for Catalog {
    fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    fn projects(&self) -> &[Project] {
        &self.projects
    }

    fn renders(&self) -> &[ProjectRender] {
        &self.renders
    }
}
