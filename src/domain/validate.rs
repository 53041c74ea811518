//! Dependency validation
//!
//! Finds every broken invariant in a collection without touching it.
//! Node-local checks run first, entity by entity in document order:
//! self-dependency, then repeated entries, then references that do not
//! resolve. A global cycle scan over the dependency graph follows.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use super::collection::TaskCollection;
use super::graph::{Cycle, DependencyGraph};
use super::id::TaskRef;

/// A broken dependency invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// An entity lists itself as a dependency
    SelfDependency {
        #[serde(serialize_with = "as_string")]
        entity: TaskRef,
    },

    /// The same ref appears more than once in one dependency list
    DuplicateDependency {
        #[serde(serialize_with = "as_string")]
        entity: TaskRef,
        #[serde(serialize_with = "as_string")]
        dependency: TaskRef,
        occurrences: usize,
    },

    /// A dependency does not resolve to any task or subtask
    NotFound {
        #[serde(serialize_with = "as_string")]
        entity: TaskRef,
        #[serde(serialize_with = "as_string")]
        dependency: TaskRef,
    },

    /// A closed dependency path
    Cycle { path: Cycle },
}

fn as_string<S>(task_ref: &TaskRef, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(task_ref)
}

impl Violation {
    /// Short label for reports
    pub fn label(&self) -> &'static str {
        match self {
            Violation::SelfDependency { .. } => "self-dependency",
            Violation::DuplicateDependency { .. } => "duplicate",
            Violation::NotFound { .. } => "not-found",
            Violation::Cycle { .. } => "cycle",
        }
    }

    /// The entity whose dependency list holds the problem (None for cycles)
    pub fn entity(&self) -> Option<TaskRef> {
        match self {
            Violation::SelfDependency { entity }
            | Violation::DuplicateDependency { entity, .. }
            | Violation::NotFound { entity, .. } => Some(*entity),
            Violation::Cycle { .. } => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::SelfDependency { entity } => {
                write!(f, "{} depends on itself", entity)
            }
            Violation::DuplicateDependency {
                entity,
                dependency,
                occurrences,
            } => write!(
                f,
                "{} lists dependency {} {} times",
                entity, dependency, occurrences
            ),
            Violation::NotFound { entity, dependency } => {
                write!(f, "{} depends on missing {}", entity, dependency)
            }
            Violation::Cycle { path } => write!(f, "circular dependency {}", path),
        }
    }
}

/// Counts per violation kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub self_dependencies: usize,
    pub duplicates: usize,
    pub not_found: usize,
    pub cycles: usize,
}

impl ValidationSummary {
    pub fn from_violations(violations: &[Violation]) -> Self {
        let mut summary = Self::default();
        for violation in violations {
            match violation {
                Violation::SelfDependency { .. } => summary.self_dependencies += 1,
                Violation::DuplicateDependency { .. } => summary.duplicates += 1,
                Violation::NotFound { .. } => summary.not_found += 1,
                Violation::Cycle { .. } => summary.cycles += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.self_dependencies + self.duplicates + self.not_found + self.cycles
    }
}

/// Reports every violation in the collection
///
/// Duplicate and missing refs are reported once per distinct ref within an
/// entity's list. Cycles are reported once each, starting at their lowest
/// ref.
pub fn validate(collection: &TaskCollection) -> Vec<Violation> {
    let mut violations = Vec::new();

    for entity in collection.entities() {
        let this = entity.task_ref();
        let deps = entity.dependencies();

        if deps.contains(&this) {
            violations.push(Violation::SelfDependency { entity: this });
        }

        let mut counted = HashSet::new();
        for dep in deps {
            if counted.insert(*dep) {
                let occurrences = deps.iter().filter(|d| *d == dep).count();
                if occurrences > 1 {
                    violations.push(Violation::DuplicateDependency {
                        entity: this,
                        dependency: *dep,
                        occurrences,
                    });
                }
            }
        }

        let mut missing = HashSet::new();
        for dep in deps {
            if !collection.contains(dep) && missing.insert(*dep) {
                violations.push(Violation::NotFound {
                    entity: this,
                    dependency: *dep,
                });
            }
        }
    }

    let graph = DependencyGraph::from_collection(collection);
    violations.extend(
        graph
            .find_cycles()
            .into_iter()
            .map(|path| Violation::Cycle { path }),
    );

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{Subtask, Task};

    fn t(id: u32) -> TaskRef {
        TaskRef::task(id)
    }

    #[test]
    fn clean_collection_has_no_violations() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One"),
            Task::new(2, "Two").with_dependencies(vec![t(1)]),
        ]);

        assert!(validate(&collection).is_empty());
    }

    #[test]
    fn duplicate_and_missing_reported_once_each() {
        let collection = TaskCollection::new(vec![
            Task::new(2, "Two"),
            Task::new(5, "Five").with_dependencies(vec![t(2), t(2), t(99)]),
        ]);

        let violations = validate(&collection);

        assert_eq!(
            violations,
            vec![
                Violation::DuplicateDependency {
                    entity: t(5),
                    dependency: t(2),
                    occurrences: 2,
                },
                Violation::NotFound {
                    entity: t(5),
                    dependency: t(99),
                },
            ]
        );
    }

    #[test]
    fn subtask_self_dependency() {
        let collection = TaskCollection::new(vec![Task::new(4, "Four").with_subtask(
            Subtask::new(1, "Sub").with_dependencies(vec![TaskRef::subtask(4, 1)]),
        )]);

        let violations = validate(&collection);
        assert_eq!(
            violations,
            vec![Violation::SelfDependency {
                entity: TaskRef::subtask(4, 1)
            }]
        );
    }

    #[test]
    fn node_local_checks_run_in_order() {
        // Self, duplicate and missing on one entity, reported in that order
        let collection = TaskCollection::new(vec![
            Task::new(1, "One").with_dependencies(vec![t(8), t(1), t(8)]),
        ]);

        let labels: Vec<_> = validate(&collection).iter().map(|v| v.label()).collect();
        assert_eq!(labels, vec!["self-dependency", "duplicate", "not-found"]);
    }

    #[test]
    fn subtask_ref_to_missing_parent_is_not_found() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One").with_dependencies(vec![TaskRef::subtask(7, 1)]),
        ]);

        assert_eq!(
            validate(&collection),
            vec![Violation::NotFound {
                entity: t(1),
                dependency: TaskRef::subtask(7, 1),
            }]
        );
    }

    #[test]
    fn plain_ref_does_not_resolve_to_subtask() {
        // Task 3 has subtask 3.1 but no task 1 exists
        let collection = TaskCollection::new(vec![Task::new(3, "Three")
            .with_dependencies(vec![t(1)])
            .with_subtask(Subtask::new(1, "Sub"))]);

        let violations = validate(&collection);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].label(), "not-found");
    }

    #[test]
    fn cycles_reported_after_node_checks() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One").with_dependencies(vec![t(2)]),
            Task::new(2, "Two").with_dependencies(vec![t(3), t(42)]),
            Task::new(3, "Three").with_dependencies(vec![t(1)]),
        ]);

        let violations = validate(&collection);

        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].label(), "not-found");
        match &violations[1] {
            Violation::Cycle { path } => assert_eq!(path.path(), &[t(1), t(2), t(3), t(1)]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn validate_does_not_mutate() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One").with_dependencies(vec![t(1), t(1), t(9)]),
        ]);
        let before = collection.clone();

        let _ = validate(&collection);
        let _ = validate(&collection);

        assert_eq!(collection, before);
    }

    #[test]
    fn summary_counts_by_kind() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One").with_dependencies(vec![t(1), t(2)]),
            Task::new(2, "Two").with_dependencies(vec![t(1), t(9), t(9)]),
        ]);

        let summary = ValidationSummary::from_violations(&validate(&collection));
        assert_eq!(summary.self_dependencies, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn violation_json_shape() {
        let violation = Violation::NotFound {
            entity: TaskRef::subtask(2, 1),
            dependency: t(9),
        };

        assert_eq!(
            serde_json::to_value(&violation).unwrap(),
            serde_json::json!({"kind": "not_found", "entity": "2.1", "dependency": "9"})
        );
    }
}
