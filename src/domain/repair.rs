//! Deterministic dependency repair
//!
//! Removes every violation the validator can report, touching nothing but
//! dependency lists. Passes run in a fixed order on a working copy:
//! self-references, then references that do not resolve, then repeated
//! entries (first occurrence kept), then cycles. A cycle is broken by
//! dropping the edge that leaves its highest ref; the cycle scan repeats
//! until none remain. Running the repair again on its own output is a no-op.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use super::collection::TaskCollection;
use super::graph::DependencyGraph;
use super::id::TaskRef;

/// Why a dependency was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairReason {
    SelfDependency,
    NotFound,
    Duplicate,
    Cycle,
}

impl RepairReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairReason::SelfDependency => "self-dependency",
            RepairReason::NotFound => "not-found",
            RepairReason::Duplicate => "duplicate",
            RepairReason::Cycle => "cycle",
        }
    }
}

/// One dependency entry removed by the repair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairAction {
    #[serde(serialize_with = "as_string")]
    pub entity: TaskRef,
    #[serde(serialize_with = "as_string")]
    pub removed: TaskRef,
    pub reason: RepairReason,
}

fn as_string<S>(task_ref: &TaskRef, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(task_ref)
}

impl fmt::Display for RepairAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: removed dependency {} ({})",
            self.entity,
            self.removed,
            self.reason.as_str()
        )
    }
}

/// Repairs a copy of the collection, returning it with the actions taken
pub fn fix(collection: &TaskCollection) -> (TaskCollection, Vec<RepairAction>) {
    let mut fixed = collection.clone();
    let actions = repair(&mut fixed);
    (fixed, actions)
}

/// Repairs the collection in place
pub fn repair(collection: &mut TaskCollection) -> Vec<RepairAction> {
    let mut actions = Vec::new();
    let refs = collection.entity_refs();

    // (a) self-dependencies
    for entity in &refs {
        if let Some(deps) = collection.dependencies_mut(entity) {
            let removed = deps.retain_with(|d| d != entity);
            record(&mut actions, *entity, removed, RepairReason::SelfDependency);
        }
    }

    // (b) references that do not resolve
    let existing: HashSet<TaskRef> = refs.iter().copied().collect();
    for entity in &refs {
        if let Some(deps) = collection.dependencies_mut(entity) {
            let removed = deps.retain_with(|d| existing.contains(d));
            record(&mut actions, *entity, removed, RepairReason::NotFound);
        }
    }

    // (c) repeated entries, first occurrence wins
    for entity in &refs {
        if let Some(deps) = collection.dependencies_mut(entity) {
            let mut seen = HashSet::new();
            let removed = deps.retain_with(|d| seen.insert(*d));
            record(&mut actions, *entity, removed, RepairReason::Duplicate);
        }
    }

    // (d) cycles
    while let Some(cycle) = DependencyGraph::from_collection(collection).first_cycle() {
        let Some((from, to)) = cycle.edges().max_by_key(|(from, _)| *from) else {
            break;
        };

        let removed = collection
            .dependencies_mut(&from)
            .map_or(0, |deps| deps.remove(&to));
        // The edge came from this collection, so this cannot happen
        if removed == 0 {
            break;
        }
        actions.push(RepairAction {
            entity: from,
            removed: to,
            reason: RepairReason::Cycle,
        });
    }

    actions
}

fn record(
    actions: &mut Vec<RepairAction>,
    entity: TaskRef,
    removed: Vec<TaskRef>,
    reason: RepairReason,
) {
    actions.extend(removed.into_iter().map(|dep| RepairAction {
        entity,
        removed: dep,
        reason,
    }));
}
