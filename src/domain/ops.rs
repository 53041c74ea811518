//! Mutation operations
//!
//! Every edit that can affect dependency edges goes through here. Each one
//! checks everything it needs before touching the collection, so a failed
//! call leaves the collection exactly as it was.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use super::collection::{Entity, TaskCollection};
use super::graph::{Cycle, DependencyGraph};
use super::id::{IdError, TaskRef};
use super::task::{Subtask, Task, TaskStatus};

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error(transparent)]
    InvalidIdFormat(#[from] IdError),

    #[error("Task not found: {0}")]
    NotFound(TaskRef),

    #[error("Parent task not found: {0}")]
    ParentNotFound(u32),

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(TaskRef),

    #[error("{task} already depends on {depends_on}")]
    DuplicateDependency { task: TaskRef, depends_on: TaskRef },

    #[error("Adding dependency would create a cycle: {0}")]
    WouldCreateCycle(Cycle),

    #[error("{0} is not a subtask")]
    NotASubtask(TaskRef),

    #[error("No unused top-level task id left")]
    IdsExhausted,
}

/// What a removal took out of the collection
#[derive(Debug, Clone, PartialEq)]
pub enum RemovedEntity {
    Task(Task),
    Subtask { parent: u32, subtask: Subtask },
}

impl RemovedEntity {
    pub fn task_ref(&self) -> TaskRef {
        match self {
            RemovedEntity::Task(task) => TaskRef::task(task.id),
            RemovedEntity::Subtask { parent, subtask } => TaskRef::subtask(*parent, subtask.id),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            RemovedEntity::Task(task) => &task.title,
            RemovedEntity::Subtask { subtask, .. } => &subtask.title,
        }
    }
}

/// Dependency entries stripped from one entity by a cascade
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdit {
    #[serde(serialize_with = "as_string")]
    pub entity: TaskRef,
    #[serde(serialize_with = "as_strings")]
    pub removed: Vec<TaskRef>,
}

/// Result of removing a task or subtask
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub removed: RemovedEntity,
    /// Every ref that no longer exists: the entity plus any subtasks it owned
    pub deleted_refs: Vec<TaskRef>,
    /// Other entities whose dependency lists lost entries
    pub edits: Vec<DependencyEdit>,
}

/// Result of promoting a subtask to a top-level task
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub previous: TaskRef,
    pub task: Task,
    /// Entities whose dependency lists were rewritten to the new ref
    pub rewritten: Vec<TaskRef>,
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

impl TaskCollection {
    /// Resolves a ref, telling a missing parent apart from a missing entity
    pub fn resolve(&self, task_ref: &TaskRef) -> Result<Entity<'_>, TaskError> {
        if let TaskRef::Subtask(parent, _) = task_ref {
            if self.task(*parent).is_none() {
                return Err(TaskError::ParentNotFound(*parent));
            }
        }
        self.get(task_ref).ok_or(TaskError::NotFound(*task_ref))
    }

    /// Parses a textual id and resolves it
    pub fn resolve_token(&self, token: &str) -> Result<Entity<'_>, TaskError> {
        let task_ref: TaskRef = token.parse()?;
        self.resolve(&task_ref)
    }

    /// Makes `task` depend on `depends_on`
    ///
    /// Fails without changing anything if either ref is missing, the refs are
    /// equal, the edge already exists, or the edge would close a cycle.
    pub fn add_dependency(&mut self, task: TaskRef, depends_on: TaskRef) -> Result<(), TaskError> {
        self.resolve(&task)?;
        self.resolve(&depends_on)?;

        if task == depends_on {
            return Err(TaskError::SelfDependency(task));
        }

        if self
            .get(&task)
            .is_some_and(|e| e.dependencies().contains(&depends_on))
        {
            return Err(TaskError::DuplicateDependency { task, depends_on });
        }

        // Simulate the insertion before committing it
        let mut graph = DependencyGraph::from_collection(self);
        graph.add_edge(&task, &depends_on);
        if let Some(cycle) = graph.cycle_through(&task, &depends_on) {
            return Err(TaskError::WouldCreateCycle(cycle));
        }

        if let Some(deps) = self.dependencies_mut(&task) {
            deps.add(depends_on);
        }
        Ok(())
    }

    /// Removes `depends_on` from `task`'s dependencies
    ///
    /// Returns false when there was nothing to remove. `depends_on` does not
    /// have to exist, so dangling entries can be cleared this way.
    pub fn remove_dependency(
        &mut self,
        task: TaskRef,
        depends_on: TaskRef,
    ) -> Result<bool, TaskError> {
        self.resolve(&task)?;
        Ok(self
            .dependencies_mut(&task)
            .map(|deps| deps.remove(&depends_on) > 0)
            .unwrap_or(false))
    }

    /// Removes a task or subtask and every edge pointing at it
    pub fn remove_task(&mut self, target: TaskRef) -> Result<Removal, TaskError> {
        let id = match target {
            TaskRef::Task(id) => id,
            TaskRef::Subtask(..) => return self.remove_subtask(target),
        };

        let pos = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskError::NotFound(target))?;

        let task = self.tasks.remove(pos);
        let deleted_refs: Vec<TaskRef> = std::iter::once(target)
            .chain(task.subtasks.iter().map(|s| TaskRef::subtask(id, s.id)))
            .collect();
        let edits = self.strip_refs(&deleted_refs);

        Ok(Removal {
            removed: RemovedEntity::Task(task),
            deleted_refs,
            edits,
        })
    }

    /// Removes a subtask and every edge pointing at it
    pub fn remove_subtask(&mut self, target: TaskRef) -> Result<Removal, TaskError> {
        let subtask = self.remove_subtask_only(target)?;
        let deleted_refs = vec![target];
        let edits = self.strip_refs(&deleted_refs);

        Ok(Removal {
            removed: RemovedEntity::Subtask {
                parent: target.task_id(),
                subtask,
            },
            deleted_refs,
            edits,
        })
    }

    /// Removes several tasks and subtasks, all or nothing
    ///
    /// Repeated refs collapse, and a subtask whose parent is also listed is
    /// removed as part of the parent.
    pub fn remove_tasks(&mut self, targets: &[TaskRef]) -> Result<Vec<Removal>, TaskError> {
        let parents: HashSet<u32> = targets
            .iter()
            .filter_map(|r| match r {
                TaskRef::Task(id) => Some(*id),
                TaskRef::Subtask(..) => None,
            })
            .collect();

        let mut seen = HashSet::new();
        let mut working = self.clone();
        let mut removals = Vec::new();

        for target in targets {
            if !seen.insert(*target) {
                continue;
            }
            if let TaskRef::Subtask(parent, _) = target {
                if parents.contains(parent) {
                    // The parent may already be gone from the working copy
                    self.resolve(target)?;
                    continue;
                }
            }
            removals.push(working.remove_task(*target)?);
        }

        *self = working;
        Ok(removals)
    }

    /// Promotes a subtask to a new top-level task
    ///
    /// The new task takes the next unused id and every reference to the old
    /// subtask ref is rewritten to point at it.
    pub fn convert_subtask_to_task(&mut self, target: TaskRef) -> Result<Conversion, TaskError> {
        if !target.is_subtask() {
            return Err(TaskError::NotASubtask(target));
        }
        self.resolve(&target)?;

        let new_id = self.next_task_id().ok_or(TaskError::IdsExhausted)?;
        let removal = self.remove_subtask_only(target)?;

        let mut task = Task::from_subtask(new_id, removal);
        task.meta.remove("parentTaskId");
        let new_ref = TaskRef::task(new_id);
        self.tasks.push(task);

        let mut rewritten = Vec::new();
        for entity in self.entity_refs() {
            if let Some(deps) = self.dependencies_mut(&entity) {
                if deps.replace(&target, new_ref) {
                    rewritten.push(entity);
                }
            }
        }

        let task = self
            .task(new_id)
            .cloned()
            .ok_or(TaskError::NotFound(new_ref))?;

        Ok(Conversion {
            previous: target,
            task,
            rewritten,
        })
    }

    /// Detaches a subtask without touching any dependency lists
    fn remove_subtask_only(&mut self, target: TaskRef) -> Result<Subtask, TaskError> {
        let (parent_id, sub_id) = match target {
            TaskRef::Subtask(parent, sub) => (parent, sub),
            TaskRef::Task(_) => return Err(TaskError::NotASubtask(target)),
        };
        let parent = self
            .task_mut(parent_id)
            .ok_or(TaskError::ParentNotFound(parent_id))?;
        let pos = parent
            .subtasks
            .iter()
            .position(|s| s.id == sub_id)
            .ok_or(TaskError::NotFound(target))?;
        Ok(parent.subtasks.remove(pos))
    }

    /// Sets the status of a task or subtask
    ///
    /// Closing a task (done or cancelled) closes its open subtasks with the
    /// same status. Returns every entity whose status changed.
    pub fn set_status(
        &mut self,
        target: TaskRef,
        status: TaskStatus,
    ) -> Result<Vec<TaskRef>, TaskError> {
        self.resolve(&target)?;
        let mut changed = Vec::new();

        match target {
            TaskRef::Task(id) => {
                if let Some(task) = self.task_mut(id) {
                    if task.status != status {
                        task.status = status;
                        changed.push(target);
                    }
                    if status.is_terminal() {
                        for sub in task.subtasks.iter_mut().filter(|s| !s.status.is_terminal()) {
                            sub.status = status;
                            changed.push(TaskRef::subtask(id, sub.id));
                        }
                    }
                }
            }
            TaskRef::Subtask(parent, sub_id) => {
                if let Some(sub) = self.task_mut(parent).and_then(|t| t.subtask_mut(sub_id)) {
                    if sub.status != status {
                        sub.status = status;
                        changed.push(target);
                    }
                }
            }
        }

        Ok(changed)
    }

    /// Strips every dependency on the given refs, reporting what changed
    fn strip_refs(&mut self, deleted: &[TaskRef]) -> Vec<DependencyEdit> {
        let mut edits = Vec::new();
        for entity in self.entity_refs() {
            if let Some(deps) = self.dependencies_mut(&entity) {
                let removed = deps.retain_with(|d| !deleted.contains(d));
                if !removed.is_empty() {
                    edits.push(DependencyEdit { entity, removed });
                }
            }
        }
        edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validate::{validate, Violation};
    use proptest::prelude::*;

    fn t(id: u32) -> TaskRef {
        TaskRef::task(id)
    }

    fn s(parent: u32, sub: u32) -> TaskRef {
        TaskRef::subtask(parent, sub)
    }

    fn deps_of(collection: &TaskCollection, task_ref: TaskRef) -> Vec<TaskRef> {
        collection
            .get(&task_ref)
            .unwrap()
            .dependencies()
            .as_slice()
            .to_vec()
    }

    fn project() -> TaskCollection {
        TaskCollection::new(vec![
            Task::new(1, "Schema"),
            Task::new(2, "API")
                .with_dependencies(vec![t(1)])
                .with_subtask(Subtask::new(1, "Routes"))
                .with_subtask(Subtask::new(2, "Handlers").with_dependencies(vec![s(2, 1)])),
            Task::new(3, "UI").with_dependencies(vec![t(2), s(2, 2)]),
        ])
    }

    // =========================================================================
    // resolve
    // =========================================================================

    #[test]
    fn resolve_token_errors() {
        let collection = project();

        assert!(matches!(
            collection.resolve_token("x"),
            Err(TaskError::InvalidIdFormat(_))
        ));
        assert_eq!(
            collection.resolve_token("9").unwrap_err(),
            TaskError::NotFound(t(9))
        );
        assert_eq!(
            collection.resolve_token("9.1").unwrap_err(),
            TaskError::ParentNotFound(9)
        );
        assert_eq!(
            collection.resolve_token("2.7").unwrap_err(),
            TaskError::NotFound(s(2, 7))
        );
        assert_eq!(collection.resolve_token("2.2").unwrap().title(), "Handlers");
    }

    // =========================================================================
    // add_dependency
    // =========================================================================

    #[test]
    fn add_dependency_appends() {
        let mut collection = project();
        collection.add_dependency(t(3), t(1)).unwrap();
        assert_eq!(deps_of(&collection, t(3)), vec![t(2), s(2, 2), t(1)]);
    }

    #[test]
    fn add_dependency_between_subtasks() {
        let mut collection = project();
        collection.add_dependency(s(2, 1), t(1)).unwrap();
        assert_eq!(deps_of(&collection, s(2, 1)), vec![t(1)]);
    }

    #[test]
    fn add_dependency_rejects_missing_refs() {
        let mut collection = project();
        let before = collection.clone();

        assert_eq!(
            collection.add_dependency(t(9), t(1)),
            Err(TaskError::NotFound(t(9)))
        );
        assert_eq!(
            collection.add_dependency(t(1), s(5, 1)),
            Err(TaskError::ParentNotFound(5))
        );
        assert_eq!(collection, before);
    }

    #[test]
    fn add_dependency_rejects_self() {
        let mut collection = project();
        assert_eq!(
            collection.add_dependency(s(2, 1), s(2, 1)),
            Err(TaskError::SelfDependency(s(2, 1)))
        );
    }

    #[test]
    fn add_dependency_rejects_duplicate() {
        let mut collection = project();
        let before = collection.clone();

        assert_eq!(
            collection.add_dependency(t(2), t(1)),
            Err(TaskError::DuplicateDependency {
                task: t(2),
                depends_on: t(1)
            })
        );
        assert_eq!(collection, before);
    }

    #[test]
    fn add_dependency_rejects_cycle_with_path() {
        let mut collection = TaskCollection::new(vec![
            Task::new(1, "One").with_dependencies(vec![t(2)]),
            Task::new(2, "Two").with_dependencies(vec![t(3)]),
            Task::new(3, "Three"),
        ]);
        let before = collection.clone();

        let err = collection.add_dependency(t(3), t(1)).unwrap_err();

        match err {
            TaskError::WouldCreateCycle(cycle) => {
                assert_eq!(cycle.path(), &[t(3), t(1), t(2), t(3)]);
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
        assert_eq!(collection, before);
    }

    #[test]
    fn add_dependency_rejects_cycle_through_subtasks() {
        let mut collection = project();
        // 2.1 <- 2.2 <- 3, so 2.1 -> 3 closes a loop
        let err = collection.add_dependency(s(2, 1), t(3)).unwrap_err();
        assert!(matches!(err, TaskError::WouldCreateCycle(_)));
    }

    #[test]
    fn add_dependency_allows_non_cycle_from_example() {
        // 1 done, 2 -> 1, 3 -> 2: 1 -> 3 closes 1 -> 3 -> 2 -> 1
        let mut collection = TaskCollection::new(vec![
            Task::new(1, "One").with_status(TaskStatus::Done),
            Task::new(2, "Two").with_dependencies(vec![t(1)]),
            Task::new(3, "Three").with_dependencies(vec![t(2)]),
        ]);

        let err = collection.add_dependency(t(1), t(3)).unwrap_err();
        assert!(matches!(err, TaskError::WouldCreateCycle(_)));

        // 3 -> 1 is just a shortcut
        collection.add_dependency(t(3), t(1)).unwrap();
        assert!(validate(&collection).is_empty());
    }

    // =========================================================================
    // remove_dependency
    // =========================================================================

    #[test]
    fn remove_dependency_present_and_absent() {
        let mut collection = project();

        assert_eq!(collection.remove_dependency(t(3), s(2, 2)), Ok(true));
        assert_eq!(deps_of(&collection, t(3)), vec![t(2)]);

        assert_eq!(collection.remove_dependency(t(3), t(1)), Ok(false));
        assert_eq!(collection.remove_dependency(t(3), t(77)), Ok(false));
    }

    #[test]
    fn remove_dependency_clears_dangling_entry() {
        let mut collection = TaskCollection::new(vec![
            Task::new(1, "One").with_dependencies(vec![t(40), t(40)]),
        ]);

        assert_eq!(collection.remove_dependency(t(1), t(40)), Ok(true));
        assert!(deps_of(&collection, t(1)).is_empty());
    }

    #[test]
    fn remove_dependency_requires_task() {
        let mut collection = project();
        assert_eq!(
            collection.remove_dependency(t(8), t(1)),
            Err(TaskError::NotFound(t(8)))
        );
    }

    // =========================================================================
    // remove_task / remove_subtask
    // =========================================================================

    #[test]
    fn remove_task_cascades_to_subtasks_and_edges() {
        let mut collection = project();
        let removal = collection.remove_task(t(2)).unwrap();

        assert_eq!(removal.removed.task_ref(), t(2));
        assert_eq!(removal.deleted_refs, vec![t(2), s(2, 1), s(2, 2)]);
        assert_eq!(
            removal.edits,
            vec![DependencyEdit {
                entity: t(3),
                removed: vec![t(2), s(2, 2)],
            }]
        );
        assert!(collection.task(2).is_none());
        assert!(deps_of(&collection, t(3)).is_empty());
        assert!(validate(&collection).is_empty());
    }

    #[test]
    fn remove_subtask_strips_sibling_edges() {
        let mut collection = project();
        let removal = collection.remove_task(s(2, 1)).unwrap();

        assert!(matches!(removal.removed, RemovedEntity::Subtask { parent: 2, .. }));
        assert_eq!(removal.removed.title(), "Routes");
        assert_eq!(
            removal.edits,
            vec![DependencyEdit {
                entity: s(2, 2),
                removed: vec![s(2, 1)],
            }]
        );
        assert_eq!(collection.task(2).unwrap().subtasks.len(), 1);
    }

    #[test]
    fn remove_errors_leave_collection_unchanged() {
        let mut collection = project();
        let before = collection.clone();

        assert_eq!(collection.remove_task(t(9)).unwrap_err(), TaskError::NotFound(t(9)));
        assert_eq!(
            collection.remove_task(s(9, 1)).unwrap_err(),
            TaskError::ParentNotFound(9)
        );
        assert_eq!(
            collection.remove_subtask(t(1)).unwrap_err(),
            TaskError::NotASubtask(t(1))
        );
        assert_eq!(collection, before);
    }

    #[test]
    fn remove_tasks_is_all_or_nothing() {
        let mut collection = project();
        let before = collection.clone();

        let err = collection.remove_tasks(&[t(1), t(9)]).unwrap_err();
        assert_eq!(err, TaskError::NotFound(t(9)));
        assert_eq!(collection, before);
    }

    #[test]
    fn remove_tasks_folds_subtasks_into_parent() {
        let mut collection = project();
        let removals = collection
            .remove_tasks(&[s(2, 1), t(2), t(2)])
            .unwrap();

        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].removed.task_ref(), t(2));
        assert_eq!(collection.tasks.len(), 2);
    }

    #[test]
    fn remove_tasks_accepts_parent_before_subtask() {
        let mut collection = project();
        let removals = collection.remove_tasks(&[t(2), s(2, 1)]).unwrap();

        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].removed.task_ref(), t(2));
        assert!(collection.task(2).is_none());
        assert_eq!(deps_of(&collection, t(3)), Vec::<TaskRef>::new());
    }

    #[test]
    fn remove_tasks_checks_folded_subtasks_exist() {
        let mut collection = project();
        let before = collection.clone();

        let err = collection.remove_tasks(&[t(2), s(2, 9)]).unwrap_err();

        assert_eq!(err, TaskError::NotFound(s(2, 9)));
        assert_eq!(collection, before);
    }

    // =========================================================================
    // convert_subtask_to_task
    // =========================================================================

    #[test]
    fn convert_rewrites_references() {
        let mut collection = project();
        let conversion = collection.convert_subtask_to_task(s(2, 2)).unwrap();

        assert_eq!(conversion.previous, s(2, 2));
        assert_eq!(conversion.task.id, 4);
        assert_eq!(conversion.task.title, "Handlers");
        // Its own dependency on a former sibling is still valid
        assert_eq!(conversion.task.dependencies.as_slice(), &[s(2, 1)]);
        assert_eq!(conversion.rewritten, vec![t(3)]);

        assert_eq!(deps_of(&collection, t(3)), vec![t(2), t(4)]);
        assert_eq!(collection.task(2).unwrap().subtasks.len(), 1);
        assert!(validate(&collection).is_empty());
    }

    #[test]
    fn convert_drops_parent_marker() {
        let mut sub = Subtask::new(1, "Sub");
        sub.meta.set("parentTaskId", 1);
        let mut collection = TaskCollection::new(vec![Task::new(1, "One").with_subtask(sub)]);

        let conversion = collection.convert_subtask_to_task(s(1, 1)).unwrap();
        assert!(conversion.task.meta.get("parentTaskId").is_none());
    }

    #[test]
    fn convert_fails_when_ids_run_out() {
        let mut collection = TaskCollection::new(vec![
            Task::new(u32::MAX, "Last").with_subtask(Subtask::new(1, "Step")),
        ]);
        let before = collection.clone();

        let err = collection
            .convert_subtask_to_task(s(u32::MAX, 1))
            .unwrap_err();

        assert_eq!(err, TaskError::IdsExhausted);
        assert_eq!(collection, before);
    }

    #[test]
    fn convert_requires_subtask() {
        let mut collection = project();
        assert_eq!(
            collection.convert_subtask_to_task(t(1)).unwrap_err(),
            TaskError::NotASubtask(t(1))
        );
        assert_eq!(
            collection.convert_subtask_to_task(s(1, 1)).unwrap_err(),
            TaskError::NotFound(s(1, 1))
        );
    }

    // =========================================================================
    // set_status
    // =========================================================================

    #[test]
    fn closing_task_closes_open_subtasks() {
        let mut collection = project();
        collection
            .set_status(s(2, 1), TaskStatus::Cancelled)
            .unwrap();

        let changed = collection.set_status(t(2), TaskStatus::Done).unwrap();

        assert_eq!(changed, vec![t(2), s(2, 2)]);
        let task = collection.task(2).unwrap();
        assert_eq!(task.subtasks[0].status, TaskStatus::Cancelled);
        assert_eq!(task.subtasks[1].status, TaskStatus::Done);
    }

    #[test]
    fn set_status_unchanged_reports_nothing() {
        let mut collection = project();
        assert!(collection
            .set_status(t(1), TaskStatus::Pending)
            .unwrap()
            .is_empty());
        assert_eq!(
            collection.set_status(t(9), TaskStatus::Done),
            Err(TaskError::NotFound(t(9)))
        );
    }

    // =========================================================================
    // Properties
    // =========================================================================

    fn arb_ref() -> impl Strategy<Value = TaskRef> {
        (1u32..=6, prop::option::of(1u32..=2)).prop_map(|(task, sub)| match sub {
            Some(sub) => TaskRef::subtask(task, sub),
            None => TaskRef::task(task),
        })
    }

    /// Valid acyclic collection built by replaying accepted edges
    fn arb_acyclic() -> impl Strategy<Value = TaskCollection> {
        prop::collection::vec((arb_ref(), arb_ref()), 0..20).prop_map(|edges| {
            let mut collection = TaskCollection::new(
                (1..=6)
                    .map(|id| {
                        Task::new(id, format!("Task {}", id))
                            .with_subtask(Subtask::new(1, "A"))
                            .with_subtask(Subtask::new(2, "B"))
                    })
                    .collect(),
            );
            for (from, to) in edges {
                let _ = collection.add_dependency(from, to);
            }
            collection
        })
    }

    proptest! {
        #[test]
        fn add_dependency_never_creates_cycles(
            collection in arb_acyclic(),
            from in arb_ref(),
            to in arb_ref(),
        ) {
            let mut working = collection.clone();
            match working.add_dependency(from, to) {
                Ok(()) => {
                    let cycles = validate(&working)
                        .into_iter()
                        .filter(|v| matches!(v, Violation::Cycle { .. }))
                        .count();
                    prop_assert_eq!(cycles, 0);
                }
                Err(TaskError::WouldCreateCycle(cycle)) => {
                    prop_assert_eq!(&working, &collection);
                    prop_assert_eq!(cycle.path().first(), Some(&from));
                    prop_assert_eq!(cycle.path().last(), Some(&from));
                }
                Err(_) => {
                    prop_assert_eq!(&working, &collection);
                }
            }
        }

        #[test]
        fn removed_refs_leave_no_trace(collection in arb_acyclic(), target in arb_ref()) {
            let mut working = collection.clone();
            if let Ok(removal) = working.remove_task(target) {
                for entity in working.entities() {
                    for dep in entity.dependencies() {
                        prop_assert!(!removal.deleted_refs.contains(dep));
                    }
                }
                prop_assert!(validate(&working).is_empty());
            }
        }
    }
}
