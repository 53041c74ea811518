//! Dependency CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use super::session::Session;
use crate::domain::TaskRef;

#[derive(Subcommand)]
pub enum DepCommands {
    /// Make a task wait for another
    ///
    /// Examples:
    ///   tasktree dep add 3 2       # 3 depends on 2
    ///   tasktree dep add 2.2 2.1   # subtask on sibling subtask
    Add {
        /// Task that will be blocked
        task: String,

        /// Task that must be done first
        depends_on: String,
    },

    /// Remove a dependency
    Remove {
        /// Task to unblock
        task: String,

        /// Dependency to remove
        depends_on: String,
    },
}

pub fn run(cmd: DepCommands, session: &Session, output: &Output) -> Result<()> {
    match cmd {
        DepCommands::Add { task, depends_on } => add_dependency(session, output, &task, &depends_on),
        DepCommands::Remove { task, depends_on } => {
            remove_dependency(session, output, &task, &depends_on)
        }
    }
}

fn add_dependency(session: &Session, output: &Output, task: &str, depends_on: &str) -> Result<()> {
    let task: TaskRef = task.trim().parse()?;
    let depends_on: TaskRef = depends_on.trim().parse()?;
    output.verbose_ctx("dep", &format!("Adding edge {} -> {}", task, depends_on));

    session.modify(output, |collection| {
        Ok(collection.add_dependency(task, depends_on)?)
    })?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task.to_string(),
            "depends_on": depends_on.to_string(),
        }));
    } else {
        output.success(&format!("{} now depends on {}", task, depends_on));
    }

    Ok(())
}

fn remove_dependency(
    session: &Session,
    output: &Output,
    task: &str,
    depends_on: &str,
) -> Result<()> {
    let task: TaskRef = task.trim().parse()?;
    let depends_on: TaskRef = depends_on.trim().parse()?;

    let removed = session.modify(output, |collection| {
        Ok(collection.remove_dependency(task, depends_on)?)
    })?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task.to_string(),
            "removed_dependency": depends_on.to_string(),
            "removed": removed,
        }));
    } else if removed {
        output.success(&format!(
            "Removed dependency: {} no longer depends on {}",
            task, depends_on
        ));
    } else {
        output.success(&format!("{} does not depend on {}", task, depends_on));
    }

    Ok(())
}
