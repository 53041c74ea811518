//! Locating the tasks document for a command

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::output::Output;
use crate::domain::{validate, TaskCollection};
use crate::storage::{Project, ProjectConfig, TaskStore};

/// The store a command works on, plus the project settings that apply
pub struct Session {
    store: TaskStore,
    settings: ProjectConfig,
}

impl Session {
    /// Opens `file` directly when given, otherwise the current project
    pub fn open(file: Option<&Path>, output: &Output) -> Result<Self> {
        match file {
            Some(path) => {
                output.verbose_ctx("session", &format!("Using tasks file: {}", path.display()));
                Ok(Self {
                    store: TaskStore::new(PathBuf::from(path)),
                    settings: ProjectConfig::default(),
                })
            }
            None => {
                let project = Project::open_current()?;
                output.verbose_ctx(
                    "session",
                    &format!("Found project at: {}", project.root().display()),
                );

                let store = project.task_store()?;
                output.verbose_ctx(
                    "session",
                    &format!("Using tasks file: {}", store.path().display()),
                );

                Ok(Self {
                    store,
                    settings: project.config().project.clone(),
                })
            }
        }
    }

    pub fn settings(&self) -> &ProjectConfig {
        &self.settings
    }

    /// Reads the current document
    pub fn read(&self) -> Result<TaskCollection> {
        self.store.read()
    }

    /// Runs an edit under the store lock and persists the result
    ///
    /// Warns afterwards about violations the edit left in place, unless
    /// `validate.warn_after_write` is off.
    pub fn modify<T, F>(&self, output: &Output, edit: F) -> Result<T>
    where
        F: FnOnce(&mut TaskCollection) -> Result<T>,
    {
        let check = self.settings.validate.warn_after_write;

        let (value, leftover) = self.store.modify(|collection| {
            let value = edit(collection)?;
            let leftover = if check { validate(collection).len() } else { 0 };
            Ok((value, leftover))
        })?;

        output.verbose_ctx("session", &format!("Edit finished: {}", self.store.path().display()));

        if leftover > 0 {
            output.warn(&format!(
                "{} dependency problem(s) remain; run 'tasktree validate' for details",
                leftover
            ));
        }

        Ok(value)
    }
}
