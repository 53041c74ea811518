//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::session::Session;
use super::{check, deps, query, task};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "tasktree")]
#[command(author, version, about = "Dependency-aware task tracking")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Tasks file to use instead of the project's
    #[arg(long, global = true, env = "TASKTREE_FILE")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new tasktree project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Manage dependencies
    #[command(subcommand)]
    Dep(deps::DepCommands),

    /// Report invalid, duplicate, self and circular dependencies
    Validate,

    /// Remove every invalid dependency
    Fix {
        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the next task to work on
    Next {
        /// Offer subtasks instead of their parent task
        #[arg(long)]
        subtasks: bool,
    },

    /// Show tasks waiting on unfinished dependencies
    Blocked {
        /// Include subtasks
        #[arg(long)]
        subtasks: bool,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()?.default_format.into(),
    };
    let output = Output::new(format, cli.verbose);

    output.verbose("tasktree starting");

    if let Commands::Init { path } = &cli.command {
        output.verbose_ctx("init", &format!("Initializing project at: {}", path));
        let project = Project::init(path)?;
        output.verbose_ctx(
            "init",
            &format!("Created {}", project.project_dir().display()),
        );
        output.success(&format!(
            "Initialized tasktree project at {}",
            project.root().display()
        ));
        return Ok(());
    }

    let session = Session::open(cli.file.as_deref(), &output)?;

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Task(cmd) => task::run(cmd, &session, &output)?,
        Commands::Dep(cmd) => deps::run(cmd, &session, &output)?,
        Commands::Validate => check::run_validate(&session, &output)?,
        Commands::Fix { dry_run } => check::run_fix(&session, &output, dry_run)?,
        Commands::Next { subtasks } => query::next(&session, &output, subtasks)?,
        Commands::Blocked { subtasks } => query::blocked(&session, &output, subtasks)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tasktree", "next", "--subtasks", "--format", "json", "--file", "t.json",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.file, Some(PathBuf::from("t.json")));
        assert!(matches!(cli.command, Commands::Next { subtasks: true }));
    }

    #[test]
    fn parses_set_status() {
        let cli = Cli::try_parse_from(["tasktree", "task", "set-status", "1,2.1", "done"]).unwrap();

        match cli.command {
            Commands::Task(task::TaskCommands::SetStatus { ids, status }) => {
                assert_eq!(ids, "1,2.1");
                assert_eq!(status, "done");
            }
            _ => panic!("expected task set-status"),
        }
    }
}
