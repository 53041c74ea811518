//! Task domain model
//!
//! Tasks are the top-level units of work in a document. Each task owns an
//! ordered list of subtasks. Only ids, statuses and dependency lists mean
//! anything to this crate; the free-text fields are carried through untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::id::TaskRef;

/// Status of a task or subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Review,
    Done,
    Deferred,
    Cancelled,
}

impl TaskStatus {
    /// All statuses, in display order
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
        TaskStatus::Deferred,
        TaskStatus::Cancelled,
    ];

    /// Returns true if this status satisfies a dependency on the entity
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    /// Returns true if no further work is expected (done or cancelled)
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
            TaskStatus::Deferred => "deferred",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let valid: Vec<_> = TaskStatus::ALL.iter().map(|st| st.as_str()).collect();
                format!("Unknown status '{}' (expected one of: {})", s, valid.join(", "))
            })
    }
}

/// Priority of a task or subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Lower rank is picked first
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Ordered dependency list of one entity
///
/// Duplicates are kept when loading a document so they can be reported;
/// [`Dependencies::add`] never creates new ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dependencies(Vec<TaskRef>);

impl Dependencies {
    /// Creates an empty dependency list
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a dependency unless it is already present
    pub fn add(&mut self, dep: TaskRef) -> bool {
        if self.0.contains(&dep) {
            false
        } else {
            self.0.push(dep);
            true
        }
    }

    /// Removes every occurrence of a dependency, returning how many were removed
    pub fn remove(&mut self, dep: &TaskRef) -> usize {
        let len_before = self.0.len();
        self.0.retain(|d| d != dep);
        len_before - self.0.len()
    }

    /// Keeps only dependencies matching the predicate, returning the removed ones in order
    pub fn retain_with<F>(&mut self, mut keep: F) -> Vec<TaskRef>
    where
        F: FnMut(&TaskRef) -> bool,
    {
        let mut removed = Vec::new();
        self.0.retain(|d| {
            if keep(d) {
                true
            } else {
                removed.push(*d);
                false
            }
        });
        removed
    }

    /// Replaces every occurrence of `from` with `to`, returning true if anything changed
    pub fn replace(&mut self, from: &TaskRef, to: TaskRef) -> bool {
        let mut changed = false;
        for dep in self.0.iter_mut().filter(|d| *d == from) {
            *dep = to;
            changed = true;
        }
        changed
    }

    /// Checks if a dependency is present
    pub fn contains(&self, dep: &TaskRef) -> bool {
        self.0.contains(dep)
    }

    /// Returns true if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of entries, duplicates included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over dependencies in list order
    pub fn iter(&self) -> impl Iterator<Item = &TaskRef> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[TaskRef] {
        &self.0
    }
}

impl From<Vec<TaskRef>> for Dependencies {
    fn from(deps: Vec<TaskRef>) -> Self {
        Self(deps)
    }
}

impl<'a> IntoIterator for &'a Dependencies {
    type Item = &'a TaskRef;
    type IntoIter = std::slice::Iter<'a, TaskRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Fields this crate does not interpret, kept as-is across load and save
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskMeta(BTreeMap<String, serde_json::Value>);

impl TaskMeta {
    /// Creates empty metadata
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Gets a value by key
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Sets a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Removes a value, returning it if present
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    /// Returns true if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A unit of work owned by exactly one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    /// Unique within the parent's subtask list
    pub id: u32,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub details: String,

    #[serde(default)]
    pub test_strategy: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub dependencies: Dependencies,

    #[serde(flatten)]
    pub meta: TaskMeta,
}

impl Subtask {
    /// Creates a pending subtask with no dependencies
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            details: String::new(),
            test_strategy: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            dependencies: Dependencies::new(),
            meta: TaskMeta::new(),
        }
    }
}

/// A top-level task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique among top-level tasks
    pub id: u32,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub details: String,

    #[serde(default)]
    pub test_strategy: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub dependencies: Dependencies,

    #[serde(default)]
    pub subtasks: Vec<Subtask>,

    #[serde(flatten)]
    pub meta: TaskMeta,
}

impl Task {
    /// Creates a pending task with no dependencies or subtasks
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            details: String::new(),
            test_strategy: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            dependencies: Dependencies::new(),
            subtasks: Vec::new(),
            meta: TaskMeta::new(),
        }
    }

    /// Builds a top-level task out of a detached subtask
    pub fn from_subtask(id: u32, subtask: Subtask) -> Self {
        Self {
            id,
            title: subtask.title,
            description: subtask.description,
            details: subtask.details,
            test_strategy: subtask.test_strategy,
            status: subtask.status,
            priority: subtask.priority,
            dependencies: subtask.dependencies,
            subtasks: Vec::new(),
            meta: subtask.meta,
        }
    }

    /// Returns this task's ref
    pub fn task_ref(&self) -> TaskRef {
        TaskRef::task(self.id)
    }

    /// Finds a subtask by its id
    pub fn subtask(&self, id: u32) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    /// Finds a subtask by its id (mutable)
    pub fn subtask_mut(&mut self, id: u32) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| s.id == id)
    }

    /// Returns true if any subtask still has work left
    pub fn has_open_subtasks(&self) -> bool {
        self.subtasks.iter().any(|s| !s.status.is_terminal())
    }

    /// Adds a dependency, returning false if it was already present
    pub fn add_dependency(&mut self, dep: TaskRef) -> bool {
        self.dependencies.add(dep)
    }

    /// Builder-style helper for setting status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder-style helper for setting priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder-style helper for setting the dependency list verbatim
    pub fn with_dependencies(mut self, deps: Vec<TaskRef>) -> Self {
        self.dependencies = Dependencies::from(deps);
        self
    }

    /// Builder-style helper for appending a subtask
    pub fn with_subtask(mut self, subtask: Subtask) -> Self {
        self.subtasks.push(subtask);
        self
    }
}

impl Subtask {
    /// Builder-style helper for setting status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder-style helper for setting priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder-style helper for setting the dependency list verbatim
    pub fn with_dependencies(mut self, deps: Vec<TaskRef>) -> Self {
        self.dependencies = Dependencies::from(deps);
        self
    }
}
