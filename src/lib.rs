//! tasktree - dependency-aware task tracking
//!
//! Tasks and their subtasks live in one JSON document. The `domain` module
//! validates, repairs and edits the dependency graph between them and picks
//! the next unit of work; `storage` and `cli` load the document, call into
//! the domain and write results back.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{TaskCollection, TaskRef, TaskStatus};
