//! Project management
//!
//! Handles project initialization and locates the tasks document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::PROJECT_DIR;
use super::{Config, TaskStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a tasktree project. Run 'tasktree init' first.")]
    NotInProject,
}

const DEFAULT_CONFIG: &str = r#"# tasktree configuration

# Tasks document, relative to this directory
tasks_file = "tasks.json"

[next]
# Offer subtasks instead of their parent task
include_subtasks = false

[validate]
# Warn about leftover dependency problems after each change
warn_after_write = true
"#;

/// A tasktree project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PROJECT_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    ///
    /// Existing config and tasks files are left alone.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let project_dir = root.join(PROJECT_DIR);

        fs::create_dir_all(&project_dir).with_context(|| {
            format!(
                "Failed to create {} directory: {}",
                PROJECT_DIR,
                project_dir.display()
            )
        })?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = project_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, "*.lock\n*.tmp\n").with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let project = Self::open(root)?;

        let store = project.task_store()?;
        if !store.path().exists() {
            fs::write(store.path(), "{\n  \"tasks\": []\n}\n").with_context(|| {
                format!("Failed to write tasks file: {}", store.path().display())
            })?;
        }

        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .tasktree directory path
    pub fn project_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the task store
    pub fn task_store(&self) -> Result<TaskStore> {
        Ok(TaskStore::new(self.config.tasks_path()?))
    }
}
