//! # Storage Layer
//!
//! Loads and persists the task document for the CLI.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSON document | `.tasktree/tasks.json` (configurable) |
//! | Config | TOML | `.tasktree/config.toml` |
//! | Global config | TOML | platform config dir, `tasktree/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`TaskStore`] locks a sidecar `<file>.lock` with `fs2`
//! - Mutating commands hold the exclusive lock from load to save
//! - All writes are atomic (temp file + rename)

mod config;
mod json;
mod project;

pub use config::{
    Config, ConfigError, GlobalConfig, NextConfig, OutputFormat, ProjectConfig, ValidateConfig,
    PROJECT_DIR,
};
pub use json::TaskStore;
pub use project::{Project, ProjectError};
