//! Task collection
//!
//! The whole persisted document as an in-memory value. Every core operation
//! takes the collection explicitly; nothing is cached between calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::TaskRef;
use super::task::{Dependencies, Priority, Subtask, Task, TaskMeta, TaskStatus};

/// Document-level metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    /// When the document was last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: TaskMeta,
}

impl DocumentMeta {
    pub fn is_empty(&self) -> bool {
        self.updated_at.is_none() && self.extra.is_empty()
    }
}

/// Ordered set of top-level tasks, each owning its subtasks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCollection {
    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default, skip_serializing_if = "DocumentMeta::is_empty")]
    pub metadata: DocumentMeta,
}

/// Read-only view of either a task or a subtask
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Task(&'a Task),
    Subtask(&'a Task, &'a Subtask),
}

impl<'a> Entity<'a> {
    /// Canonical ref of this entity
    pub fn task_ref(&self) -> TaskRef {
        match *self {
            Entity::Task(task) => TaskRef::task(task.id),
            Entity::Subtask(parent, sub) => TaskRef::subtask(parent.id, sub.id),
        }
    }

    pub fn title(&self) -> &'a str {
        match *self {
            Entity::Task(task) => &task.title,
            Entity::Subtask(_, sub) => &sub.title,
        }
    }

    pub fn status(&self) -> TaskStatus {
        match *self {
            Entity::Task(task) => task.status,
            Entity::Subtask(_, sub) => sub.status,
        }
    }

    pub fn priority(&self) -> Priority {
        match *self {
            Entity::Task(task) => task.priority,
            Entity::Subtask(_, sub) => sub.priority,
        }
    }

    pub fn dependencies(&self) -> &'a Dependencies {
        match *self {
            Entity::Task(task) => &task.dependencies,
            Entity::Subtask(_, sub) => &sub.dependencies,
        }
    }

    /// The owning task for a subtask, the task itself otherwise
    pub fn owner(&self) -> &'a Task {
        match *self {
            Entity::Task(task) => task,
            Entity::Subtask(parent, _) => parent,
        }
    }

    pub fn is_subtask(&self) -> bool {
        matches!(self, Entity::Subtask(..))
    }
}

/// Two views are equal when they point at the same entity
impl PartialEq for Entity<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.task_ref() == other.task_ref()
    }
}

impl TaskCollection {
    /// Creates a collection from a list of tasks
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            metadata: DocumentMeta::default(),
        }
    }

    /// Returns true if there are no tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Finds a top-level task by id
    pub fn task(&self, id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Finds a top-level task by id (mutable)
    pub fn task_mut(&mut self, id: u32) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Looks up the entity a ref points at
    pub fn get(&self, task_ref: &TaskRef) -> Option<Entity<'_>> {
        match *task_ref {
            TaskRef::Task(id) => self.task(id).map(Entity::Task),
            TaskRef::Subtask(parent, sub) => {
                let task = self.task(parent)?;
                task.subtask(sub).map(|s| Entity::Subtask(task, s))
            }
        }
    }

    /// Returns true if the ref resolves to an existing task or subtask
    pub fn contains(&self, task_ref: &TaskRef) -> bool {
        self.get(task_ref).is_some()
    }

    /// Status of the referenced entity, if it exists
    pub fn status_of(&self, task_ref: &TaskRef) -> Option<TaskStatus> {
        self.get(task_ref).map(|e| e.status())
    }

    /// Dependency list of the referenced entity (mutable)
    pub fn dependencies_mut(&mut self, task_ref: &TaskRef) -> Option<&mut Dependencies> {
        match *task_ref {
            TaskRef::Task(id) => self.task_mut(id).map(|t| &mut t.dependencies),
            TaskRef::Subtask(parent, sub) => self
                .task_mut(parent)?
                .subtask_mut(sub)
                .map(|s| &mut s.dependencies),
        }
    }

    /// Every task and subtask in document order: each task followed by its subtasks
    pub fn entities(&self) -> impl Iterator<Item = Entity<'_>> {
        self.tasks.iter().flat_map(|task| {
            std::iter::once(Entity::Task(task))
                .chain(task.subtasks.iter().map(move |sub| Entity::Subtask(task, sub)))
        })
    }

    /// Refs of every entity, in document order
    pub fn entity_refs(&self) -> Vec<TaskRef> {
        self.entities().map(|e| e.task_ref()).collect()
    }

    /// Next unused top-level id, or None once `u32::MAX` is taken
    pub fn next_task_id(&self) -> Option<u32> {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0).checked_add(1)
    }

    /// Number of tasks plus subtasks
    pub fn entity_count(&self) -> usize {
        self.tasks.iter().map(|t| 1 + t.subtasks.len()).sum()
    }
}
