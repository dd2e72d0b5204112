//! Eager rendition generation for every entity with an image.
//!
//! Request-time resolution generates derivatives lazily; warming does the
//! same work up front so read-only deployments have everything they need.
//! It goes through the same [`Resolver`], so derivative paths are identical
//! and a warm can run alongside live traffic: at worst both sides generate
//! the same file.
//!
//! Instances are processed in parallel on the rayon pool. Each finished
//! instance is reported over an optional `mpsc` channel so the CLI can print
//! progress while work continues.

use crate::catalog::EntityStore;
use crate::entities::{EntityId, EntityKind, ImageOwner};
use crate::resolver::{Resolution, Resolver};
use crate::storage::Storage;
use crate::types::Origin;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use tracing::{error, info};

/// What happened to one rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmStatus {
    /// Generated by this run.
    Created,
    /// Already cached or present on storage.
    Cached,
    /// Could not be generated.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionOutcome {
    pub field: &'static str,
    pub rendition: String,
    pub status: WarmStatus,
}

/// Progress event, one per entity instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmEvent {
    pub kind: EntityKind,
    pub id: EntityId,
    pub label: String,
    /// Empty when the instance has no image set.
    pub outcomes: Vec<RenditionOutcome>,
}

impl WarmEvent {
    pub fn count(&self, status: WarmStatus) -> u32 {
        self.outcomes.iter().filter(|o| o.status == status).count() as u32
    }
}

/// Totals for one entity kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WarmCounts {
    /// Instances with at least one image.
    pub instances: u32,
    /// Instances without any image.
    pub skipped: u32,
    pub created: u32,
    pub cached: u32,
    pub failed: u32,
}

impl WarmCounts {
    fn add_event(&mut self, event: &WarmEvent) {
        if event.outcomes.is_empty() {
            self.skipped += 1;
            return;
        }
        self.instances += 1;
        self.created += event.count(WarmStatus::Created);
        self.cached += event.count(WarmStatus::Cached);
        self.failed += event.count(WarmStatus::Failed);
    }

    fn merge(&mut self, other: &WarmCounts) {
        self.instances += other.instances;
        self.skipped += other.skipped;
        self.created += other.created;
        self.cached += other.cached;
        self.failed += other.failed;
    }
}

/// Result of a warm run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WarmReport {
    pub per_kind: BTreeMap<EntityKind, WarmCounts>,
}

impl WarmReport {
    pub fn total(&self) -> WarmCounts {
        let mut total = WarmCounts::default();
        for counts in self.per_kind.values() {
            total.merge(counts);
        }
        total
    }

    pub fn has_failures(&self) -> bool {
        self.total().failed > 0
    }
}

/// Generate every derived rendition for all instances of `only`, or of every
/// kind when `None`.
pub fn warm<S: Storage>(
    resolver: &Resolver<S>,
    store: &dyn EntityStore,
    only: Option<EntityKind>,
    events: Option<Sender<WarmEvent>>,
) -> WarmReport {
    let mut report = WarmReport::default();

    for kind in EntityKind::ALL {
        if only.is_some_and(|k| k != kind) {
            continue;
        }
        let owners = store.owners(kind);
        info!(kind = %kind, instances = owners.len(), "warming renditions");

        let results: Vec<WarmEvent> = owners
            .par_iter()
            .map(|owner| {
                let event = warm_owner(resolver, *owner);
                if let Some(tx) = &events {
                    tx.send(event.clone()).ok();
                }
                event
            })
            .collect();

        let counts = report.per_kind.entry(kind).or_default();
        for event in &results {
            counts.add_event(event);
        }
    }
    report
}

fn warm_owner<S: Storage>(resolver: &Resolver<S>, owner: &dyn ImageOwner) -> WarmEvent {
    let mut outcomes = Vec::new();

    for field in owner.image_fields() {
        let Some(image) = field.image else {
            continue;
        };
        let set = match resolver.registry().lookup(field.purpose) {
            Ok(set) => set,
            Err(e) => {
                error!(kind = %owner.kind(), id = owner.id(), error = %e, "cannot warm field");
                outcomes.push(RenditionOutcome {
                    field: field.name,
                    rendition: field.purpose.to_string(),
                    status: WarmStatus::Failed,
                });
                continue;
            }
        };

        for key in set.iter().filter(|k| !k.op.is_identity()) {
            let status = match resolver.resolve_op(image, key.op) {
                Resolution::Ready(r) if r.origin == Origin::Generated => WarmStatus::Created,
                Resolution::Ready(_) => WarmStatus::Cached,
                Resolution::Unavailable { .. } | Resolution::Absent => WarmStatus::Failed,
            };
            outcomes.push(RenditionOutcome {
                field: field.name,
                rendition: key.name.clone(),
                status,
            });
        }
    }

    WarmEvent {
        kind: owner.kind(),
        id: owner.id(),
        label: owner.label(),
        outcomes,
    }
}
