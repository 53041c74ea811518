//! Dependency core
//!
//! Identifiers, the task model, and the graph algorithms that keep
//! dependency lists consistent. Nothing in here touches the filesystem.

mod collection;
mod graph;
mod id;
mod next;
mod ops;
mod repair;
mod task;
mod validate;

pub use collection::{DocumentMeta, Entity, TaskCollection};
pub use graph::{Cycle, DependencyGraph, GraphError};
pub use id::{parse_list, IdError, TaskRef};
pub use next::{
    blocked_entities, is_eligible, next_task, select_next, unsatisfied, Blocked, Granularity,
    NextOutcome,
};
pub use ops::{Conversion, DependencyEdit, Removal, RemovedEntity, TaskError};
pub use repair::{fix, repair, RepairAction, RepairReason};
pub use task::{Dependencies, Priority, Subtask, Task, TaskMeta, TaskStatus};
pub use validate::{validate, ValidationSummary, Violation};
