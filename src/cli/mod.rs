//! # Command-Line Interface
//!
//! Loads the tasks document, calls into the domain and prints the result.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init` |
//! | Task | Inspect and edit tasks | `task list`, `task set-status`, `task remove` |
//! | Dep | Edit dependency edges | `dep add`, `dep remove` |
//! | Check | Graph consistency | `validate`, `fix --dry-run` |
//! | Query | What to do next | `next`, `blocked` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - One JSON value on stdout
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr:
//! ```bash
//! tasktree --verbose next
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod check;
mod deps;
mod output;
mod query;
mod session;
mod task;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
