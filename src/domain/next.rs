//! Eligibility selection
//!
//! Picks the next entity to work on. An entity is eligible when it is not
//! done or cancelled and every dependency resolves to something done.

use serde::Serialize;

use super::collection::{Entity, TaskCollection};
use super::id::TaskRef;
use super::task::Task;

/// Which entities the selector may offer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    /// Only top-level tasks
    #[default]
    Task,
    /// Open subtasks stand in for their parent task
    Subtask,
}

/// Result of asking for the next entity
#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome<'a> {
    Ready(Entity<'a>),
    /// Nothing left to do
    AllComplete,
    /// Work remains but none of it can start
    AllBlocked { blocked: Vec<TaskRef> },
}

impl<'a> NextOutcome<'a> {
    /// The selected entity, if any
    pub fn entity(&self) -> Option<Entity<'a>> {
        match self {
            NextOutcome::Ready(entity) => Some(*entity),
            _ => None,
        }
    }
}

/// An open entity waiting on unfinished dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blocked {
    #[serde(serialize_with = "as_string")]
    pub entity: TaskRef,
    #[serde(serialize_with = "as_strings")]
    pub waiting_on: Vec<TaskRef>,
}

fn as_string<S>(task_ref: &TaskRef, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(task_ref)
}

fn as_strings<S>(refs: &[TaskRef], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(refs.iter().map(|r| r.to_string()))
}

/// Dependencies of an entity that are not done yet, missing ones included
pub fn unsatisfied(collection: &TaskCollection, entity: &Entity<'_>) -> Vec<TaskRef> {
    entity
        .dependencies()
        .iter()
        .filter(|dep| !collection.status_of(dep).is_some_and(|s| s.is_done()))
        .copied()
        .collect()
}

/// Returns true if the entity is open and all its dependencies are done
pub fn is_eligible(collection: &TaskCollection, entity: &Entity<'_>) -> bool {
    !entity.status().is_terminal() && unsatisfied(collection, entity).is_empty()
}

/// Open entities the selector considers at this granularity, in document order
fn open_entities(
    collection: &TaskCollection,
    granularity: Granularity,
) -> impl Iterator<Item = Entity<'_>> {
    collection
        .tasks
        .iter()
        .filter(|task| !task.status.is_terminal())
        .flat_map(move |task| {
            let subtasks = match granularity {
                Granularity::Task => None,
                Granularity::Subtask => Some(open_subtasks(task)),
            };
            std::iter::once(Entity::Task(task)).chain(subtasks.into_iter().flatten())
        })
}

fn open_subtasks(task: &Task) -> impl Iterator<Item = Entity<'_>> {
    task.subtasks
        .iter()
        .filter(|sub| !sub.status.is_terminal())
        .map(move |sub| Entity::Subtask(task, sub))
}

/// Picks the next entity at the given granularity
pub fn select_next(collection: &TaskCollection, granularity: Granularity) -> NextOutcome<'_> {
    let mut candidates: Vec<Entity<'_>> = Vec::new();

    for task in &collection.tasks {
        let entity = Entity::Task(task);
        if !is_eligible(collection, &entity) {
            continue;
        }
        if granularity == Granularity::Subtask && task.has_open_subtasks() {
            candidates.extend(open_subtasks(task).filter(|sub| is_eligible(collection, sub)));
        } else {
            candidates.push(entity);
        }
    }

    let best = candidates
        .into_iter()
        .min_by_key(|e| (e.priority().rank(), e.task_ref()));

    match best {
        Some(entity) => NextOutcome::Ready(entity),
        None if open_entities(collection, granularity).next().is_none() => {
            NextOutcome::AllComplete
        }
        None => NextOutcome::AllBlocked {
            blocked: blocked_entities(collection, granularity)
                .into_iter()
                .map(|b| b.entity)
                .collect(),
        },
    }
}

/// Picks the next top-level task
pub fn next_task(collection: &TaskCollection) -> NextOutcome<'_> {
    select_next(collection, Granularity::Task)
}

/// Lists every open entity with unfinished dependencies
///
/// At subtask granularity the open subtasks of open tasks are included.
pub fn blocked_entities(collection: &TaskCollection, granularity: Granularity) -> Vec<Blocked> {
    open_entities(collection, granularity)
        .filter_map(|entity| {
            let waiting_on = unsatisfied(collection, &entity);
            (!waiting_on.is_empty()).then(|| Blocked {
                entity: entity.task_ref(),
                waiting_on,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{Priority, Subtask, TaskStatus};

    fn t(id: u32) -> TaskRef {
        TaskRef::task(id)
    }

    fn chain() -> TaskCollection {
        TaskCollection::new(vec![
            Task::new(1, "One").with_status(TaskStatus::Done),
            Task::new(2, "Two").with_dependencies(vec![t(1)]),
            Task::new(3, "Three").with_dependencies(vec![t(2)]),
        ])
    }

    fn picked(outcome: &NextOutcome<'_>) -> TaskRef {
        outcome.entity().expect("expected a ready entity").task_ref()
    }

    #[test]
    fn next_follows_completed_dependency() {
        assert_eq!(picked(&next_task(&chain())), t(2));
    }

    #[test]
    fn priority_beats_id() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One").with_priority(Priority::Low),
            Task::new(2, "Two"),
            Task::new(3, "Three").with_priority(Priority::High),
            Task::new(4, "Four").with_priority(Priority::High),
        ]);

        assert_eq!(picked(&next_task(&collection)), t(3));
    }

    #[test]
    fn cancelled_dependency_does_not_satisfy() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One").with_status(TaskStatus::Cancelled),
            Task::new(2, "Two").with_dependencies(vec![t(1)]),
        ]);

        assert_eq!(
            next_task(&collection),
            NextOutcome::AllBlocked { blocked: vec![t(2)] }
        );
    }

    #[test]
    fn in_progress_task_is_still_eligible() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One").with_status(TaskStatus::InProgress),
        ]);
        assert_eq!(picked(&next_task(&collection)), t(1));
    }

    #[test]
    fn all_complete_distinguished_from_all_blocked() {
        let done = TaskCollection::new(vec![
            Task::new(1, "One").with_status(TaskStatus::Done),
            Task::new(2, "Two").with_status(TaskStatus::Cancelled),
        ]);
        assert_eq!(next_task(&done), NextOutcome::AllComplete);
        assert_eq!(next_task(&TaskCollection::default()), NextOutcome::AllComplete);

        // Waiting on a missing task and on each other
        let stuck = TaskCollection::new(vec![
            Task::new(1, "One").with_dependencies(vec![t(9)]),
            Task::new(2, "Two").with_dependencies(vec![t(1)]),
        ]);
        assert_eq!(
            next_task(&stuck),
            NextOutcome::AllBlocked {
                blocked: vec![t(1), t(2)]
            }
        );
    }

    #[test]
    fn task_granularity_returns_owning_task() {
        let collection = TaskCollection::new(vec![Task::new(1, "One")
            .with_subtask(Subtask::new(1, "A"))
            .with_subtask(Subtask::new(2, "B"))]);

        assert_eq!(picked(&next_task(&collection)), t(1));
    }

    #[test]
    fn subtask_granularity_offers_eligible_subtask() {
        let collection = TaskCollection::new(vec![Task::new(1, "One")
            .with_subtask(Subtask::new(1, "A").with_status(TaskStatus::Done))
            .with_subtask(Subtask::new(2, "B").with_dependencies(vec![TaskRef::subtask(1, 3)]))
            .with_subtask(Subtask::new(3, "C").with_dependencies(vec![TaskRef::subtask(1, 1)]))]);

        let outcome = select_next(&collection, Granularity::Subtask);
        assert_eq!(picked(&outcome), TaskRef::subtask(1, 3));
        assert!(outcome.entity().unwrap().is_subtask());
    }

    #[test]
    fn subtask_granularity_falls_back_to_task_without_open_subtasks() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One").with_subtask(Subtask::new(1, "A").with_status(TaskStatus::Done)),
            Task::new(2, "Two").with_priority(Priority::Low),
        ]);

        assert_eq!(picked(&select_next(&collection, Granularity::Subtask)), t(1));
    }

    #[test]
    fn subtasks_of_blocked_task_are_not_offered() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One"),
            Task::new(2, "Two")
                .with_priority(Priority::High)
                .with_dependencies(vec![t(1)])
                .with_subtask(Subtask::new(1, "A").with_priority(Priority::High)),
        ]);

        assert_eq!(picked(&select_next(&collection, Granularity::Subtask)), t(1));
    }

    #[test]
    fn subtask_priority_competes_across_tasks() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One").with_subtask(Subtask::new(1, "A").with_priority(Priority::Low)),
            Task::new(2, "Two").with_subtask(Subtask::new(1, "B").with_priority(Priority::High)),
        ]);

        assert_eq!(
            picked(&select_next(&collection, Granularity::Subtask)),
            TaskRef::subtask(2, 1)
        );
    }

    #[test]
    fn blocked_subtasks_count_at_subtask_granularity() {
        let collection = TaskCollection::new(vec![Task::new(1, "One")
            .with_subtask(Subtask::new(1, "A").with_dependencies(vec![TaskRef::subtask(1, 2)]))
            .with_subtask(Subtask::new(2, "B").with_dependencies(vec![TaskRef::subtask(1, 1)]))]);

        assert_eq!(picked(&next_task(&collection)), t(1));
        assert_eq!(
            select_next(&collection, Granularity::Subtask),
            NextOutcome::AllBlocked {
                blocked: vec![TaskRef::subtask(1, 1), TaskRef::subtask(1, 2)]
            }
        );
    }

    #[test]
    fn blocked_entities_lists_waiting_refs() {
        let collection = TaskCollection::new(vec![
            Task::new(1, "One"),
            Task::new(2, "Two").with_dependencies(vec![t(1), t(7)]),
            Task::new(3, "Three")
                .with_status(TaskStatus::Done)
                .with_dependencies(vec![t(1)]),
        ]);

        assert_eq!(
            blocked_entities(&collection, Granularity::Task),
            vec![Blocked {
                entity: t(2),
                waiting_on: vec![t(1), t(7)],
            }]
        );
    }
}
