//! Task and subtask addressing
//!
//! ID Format:
//! - Task refs: `N` (e.g., `7`)
//! - Subtask refs: `N.M` where `N` is the parent task (e.g., `7.2`)
//!
//! A token with a dot always addresses a subtask, even when a task with the
//! same numeric value happens to exist. Parsing and formatting of the textual
//! form live here; everything else works on [`TaskRef`].
//!
//! Inside a persisted document a subtask ref is written as
//! `{"parent": N, "subtask": M}` and a task ref as a bare integer. The legacy
//! string forms are still accepted when reading.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid task ID format: expected 'N' or 'N.M', got '{0}'")]
    InvalidFormat(String),

    #[error("No task IDs given")]
    Empty,
}

/// Reference to a task (`N`) or a subtask (`N.M`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskRef {
    Task(u32),
    Subtask(u32, u32),
}

impl TaskRef {
    /// Creates a reference to a top-level task
    pub fn task(id: u32) -> Self {
        TaskRef::Task(id)
    }

    /// Creates a reference to subtask `subtask` of task `parent`
    pub fn subtask(parent: u32, subtask: u32) -> Self {
        TaskRef::Subtask(parent, subtask)
    }

    /// Returns the id of the top-level task this ref lives under
    ///
    /// For a task ref this is the task itself.
    pub fn task_id(&self) -> u32 {
        match self {
            TaskRef::Task(id) => *id,
            TaskRef::Subtask(parent, _) => *parent,
        }
    }

    /// Returns the subtask id, or None for a task ref
    pub fn subtask_id(&self) -> Option<u32> {
        match self {
            TaskRef::Task(_) => None,
            TaskRef::Subtask(_, sub) => Some(*sub),
        }
    }

    /// Returns true if this addresses a subtask
    pub fn is_subtask(&self) -> bool {
        matches!(self, TaskRef::Subtask(..))
    }

    /// Returns the owning task ref for a subtask, or None for a task
    pub fn parent(&self) -> Option<TaskRef> {
        match self {
            TaskRef::Task(_) => None,
            TaskRef::Subtask(parent, _) => Some(TaskRef::Task(*parent)),
        }
    }

    /// Numeric ordering key: task id first, then subtask id
    ///
    /// A task `N` sorts before all of its subtasks `N.x`.
    pub fn sort_key(&self) -> (u32, Option<u32>) {
        (self.task_id(), self.subtask_id())
    }
}

impl Ord for TaskRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for TaskRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRef::Task(id) => write!(f, "{}", id),
            TaskRef::Subtask(parent, sub) => write!(f, "{}.{}", parent, sub),
        }
    }
}

fn parse_number(part: &str, token: &str) -> Result<u32, IdError> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(IdError::InvalidFormat(token.to_string()));
    }
    part.parse::<u32>()
        .map_err(|_| IdError::InvalidFormat(token.to_string()))
}

impl FromStr for TaskRef {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            None => Ok(TaskRef::Task(parse_number(s, s)?)),
            Some((parent, sub)) => {
                let parent = parse_number(parent, s)?;
                // A second dot lands in `sub` and fails the digit check
                let sub = parse_number(sub, s)?;
                Ok(TaskRef::Subtask(parent, sub))
            }
        }
    }
}

/// Parses a comma-separated list of refs (`"1,2.3, 4"`)
pub fn parse_list(s: &str) -> Result<Vec<TaskRef>, IdError> {
    let refs = s
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<TaskRef>, _>>()?;

    if refs.is_empty() {
        return Err(IdError::Empty);
    }
    Ok(refs)
}

impl Serialize for TaskRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TaskRef::Task(id) => serializer.serialize_u32(*id),
            TaskRef::Subtask(parent, sub) => {
                let mut state = serializer.serialize_struct("TaskRef", 2)?;
                state.serialize_field("parent", parent)?;
                state.serialize_field("subtask", sub)?;
                state.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for TaskRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TaskRefVisitor;

        impl<'de> Visitor<'de> for TaskRefVisitor {
            type Value = TaskRef;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a task id, a {parent, subtask} pair, or an 'N.M' string")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u32::try_from(value)
                    .map(TaskRef::Task)
                    .map_err(|_| E::custom(format!("task id out of range: {}", value)))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u32::try_from(value)
                    .map(TaskRef::Task)
                    .map_err(|_| E::custom(format!("task id out of range: {}", value)))
            }

            // Legacy documents store refs as "N" / "N.M"
            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value.parse().map_err(E::custom)
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut parent = None;
                let mut subtask = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "parent" => parent = Some(map.next_value::<u32>()?),
                        "subtask" => subtask = Some(map.next_value::<u32>()?),
                        _ => {
                            map.next_value::<de::IgnoredAny>()?;
                        }
                    }
                }

                let parent = parent.ok_or_else(|| de::Error::missing_field("parent"))?;
                let subtask = subtask.ok_or_else(|| de::Error::missing_field("subtask"))?;
                Ok(TaskRef::Subtask(parent, subtask))
            }
        }

        deserializer.deserialize_any(TaskRefVisitor)
    }
}
