//! CLI output formatting for all commands.
//!
//! # Information-First Display
//!
//! Every entity leads with its kind, zero-padded id and label; details are
//! indented context lines underneath. The same header is used by `warm`,
//! `srcset` and `check`, so an entity reads the same everywhere.
//!
//! # Output Format
//!
//! ## Warm
//!
//! ```text
//! Project 001 Site
//!     featured_image/thumbnail: created
//!     featured_image/medium: cached
//!     featured_image/hero: failed
//! Project 002 Draft
//!     no image
//!
//! Profile: 1 instance, 4 created, 0 cached, 0 failed
//! Project: 1 instance, 6 created, 0 cached, 1 failed, 1 without image
//! Renditions: 10 generated (11 total)
//! ```
//!
//! ## Srcset
//!
//! ```text
//! Project 001 Site
//!     featured_image (project_featured)
//!         srcset: /media/__sized__/…-320x240.jpg 320w, …
//!         sizes: (max-width: 640px) 100vw, 33vw
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::CacheStats;
use crate::catalog::EntityStore;
use crate::entities::{EntityId, EntityKind};
use crate::registry::Registry;
use crate::warm::{WarmCounts, WarmEvent, WarmReport, WarmStatus};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format an id as 3-digit zero-padded.
fn format_index(id: EntityId) -> String {
    format!("{:0>3}", id)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Entity header: kind, padded id, label.
///
/// ```text
/// Project 001 Site
/// ```
fn entity_header(kind: EntityKind, id: EntityId, label: &str) -> String {
    format!("{} {} {}", kind, format_index(id), label)
}

/// `1 instance`, `2 instances`.
fn plural(n: u32, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Warm
// ============================================================================

/// Format one warm progress event.
pub fn format_warm_event(event: &WarmEvent) -> Vec<String> {
    let mut lines = vec![entity_header(event.kind, event.id, &event.label)];
    if event.outcomes.is_empty() {
        lines.push(format!("{}no image", indent(1)));
        return lines;
    }
    for outcome in &event.outcomes {
        let status = match outcome.status {
            WarmStatus::Created => "created",
            WarmStatus::Cached => "cached",
            WarmStatus::Failed => "failed",
        };
        lines.push(format!(
            "{}{}/{}: {}",
            indent(1),
            outcome.field,
            outcome.rendition,
            status
        ));
    }
    lines
}

fn counts_line(kind: EntityKind, counts: &WarmCounts) -> String {
    let mut line = format!(
        "{}: {}, {} created, {} cached, {} failed",
        kind,
        plural(counts.instances, "instance"),
        counts.created,
        counts.cached,
        counts.failed
    );
    if counts.skipped > 0 {
        line.push_str(&format!(", {} without image", counts.skipped));
    }
    line
}

/// Format the end-of-run summary of a warm.
pub fn format_warm_summary(report: &WarmReport, stats: &CacheStats) -> Vec<String> {
    let mut lines: Vec<String> = report
        .per_kind
        .iter()
        .map(|(kind, counts)| counts_line(*kind, counts))
        .collect();
    lines.push(format!("Renditions: {}", stats));
    lines
}

pub fn print_warm_event(event: &WarmEvent) {
    for line in format_warm_event(event) {
        println!("{}", line);
    }
}

pub fn print_warm_summary(report: &WarmReport, stats: &CacheStats) {
    println!();
    for line in format_warm_summary(report, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Srcset
// ============================================================================

/// Derived views of one image field, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub name: String,
    pub purpose: String,
    pub srcset: String,
    pub sizes: String,
}

/// Format the srcset/sizes of every image field on one entity.
pub fn format_srcset_output(
    kind: EntityKind,
    id: EntityId,
    label: &str,
    fields: &[FieldView],
) -> Vec<String> {
    let mut lines = vec![entity_header(kind, id, label)];
    for field in fields {
        lines.push(format!("{}{} ({})", indent(1), field.name, field.purpose));
        let srcset = if field.srcset.is_empty() {
            "(none)"
        } else {
            field.srcset.as_str()
        };
        lines.push(format!("{}srcset: {}", indent(2), srcset));
        if !field.sizes.is_empty() {
            lines.push(format!("{}sizes: {}", indent(2), field.sizes));
        }
    }
    lines
}

pub fn print_srcset_output(kind: EntityKind, id: EntityId, label: &str, fields: &[FieldView]) {
    for line in format_srcset_output(kind, id, label, fields) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the `check` summary: registered purposes and catalog contents.
pub fn format_check_output(registry: &Registry, store: Option<&dyn EntityStore>) -> Vec<String> {
    let mut lines = vec!["Purposes".to_string()];
    for purpose in registry.purposes() {
        let Ok(set) = registry.lookup(purpose) else {
            continue;
        };
        let ladder: Vec<&str> = set.ladder().map(|k| k.name.as_str()).collect();
        let mut line = format!(
            "{}{} ({})",
            indent(1),
            purpose,
            plural(set.len() as u32, "rendition")
        );
        if !ladder.is_empty() {
            line.push_str(&format!(", srcset: {}", ladder.join(" < ")));
        }
        lines.push(line);
    }

    if let Some(store) = store {
        let published = store.published_projects().len();
        lines.push(String::new());
        lines.push("Catalog".to_string());
        lines.push(format!(
            "{}{}, {} ({} published), {}",
            indent(1),
            plural(store.profiles().len() as u32, "profile"),
            plural(store.projects().len() as u32, "project"),
            published,
            plural(store.renders().len() as u32, "render")
        ));
    }
    lines
}

pub fn print_check_output(registry: &Registry, store: Option<&dyn EntityStore>) {
    for line in format_check_output(registry, store) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
