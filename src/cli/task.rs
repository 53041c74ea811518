//! Task CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;

use super::output::Output;
use super::session::Session;
use crate::domain::{
    parse_list, unsatisfied, DependencyGraph, Entity, TaskCollection, TaskRef, TaskStatus,
};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// List tasks
    List {
        /// Only show entities with this status
        #[arg(long)]
        status: Option<String>,

        /// Order by dependencies (dependencies first)
        #[arg(long)]
        ordered: bool,

        /// Include subtasks
        #[arg(long)]
        subtasks: bool,
    },

    /// Show task or subtask details
    Show {
        /// Task ID (N or N.M)
        id: String,
    },

    /// Set the status of one or more tasks
    ///
    /// Examples:
    ///   tasktree task set-status 3 done
    ///   tasktree task set-status 2.1,2.2 in-progress
    SetStatus {
        /// Comma-separated IDs
        ids: String,

        /// pending, in-progress, review, done, deferred or cancelled
        status: String,
    },

    /// Remove tasks or subtasks and every dependency on them
    Remove {
        /// Comma-separated IDs
        ids: String,
    },

    /// Turn a subtask into a top-level task
    Convert {
        /// Subtask ID (N.M)
        id: String,
    },
}

pub fn run(cmd: TaskCommands, session: &Session, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::List {
            status,
            ordered,
            subtasks,
        } => list_tasks(session, output, status.as_deref(), ordered, subtasks),
        TaskCommands::Show { id } => show_task(session, output, &id),
        TaskCommands::SetStatus { ids, status } => set_status(session, output, &ids, &status),
        TaskCommands::Remove { ids } => remove_tasks(session, output, &ids),
        TaskCommands::Convert { id } => convert_subtask(session, output, &id),
    }
}

fn parse_status(status: &str) -> Result<TaskStatus> {
    status.parse::<TaskStatus>().map_err(anyhow::Error::msg)
}

fn refs_json(refs: &[TaskRef]) -> Vec<String> {
    refs.iter().map(|r| r.to_string()).collect()
}

/// JSON summary of a task or subtask
pub(super) fn entity_json(entity: &Entity<'_>) -> serde_json::Value {
    serde_json::json!({
        "id": entity.task_ref().to_string(),
        "title": entity.title(),
        "status": entity.status(),
        "priority": entity.priority(),
        "dependencies": refs_json(entity.dependencies().as_slice()),
    })
}

fn list_tasks(
    session: &Session,
    output: &Output,
    status: Option<&str>,
    ordered: bool,
    with_subtasks: bool,
) -> Result<()> {
    let collection = session.read()?;
    let status = status.map(parse_status).transpose()?;

    let refs: Vec<TaskRef> = if ordered {
        let graph = DependencyGraph::from_collection(&collection);
        graph
            .topological_order()
            .context("Cannot order tasks; run 'tasktree fix' to break cycles")?
    } else {
        collection.entity_refs()
    };
    output.verbose_ctx("list", &format!("{} entities, ordered={}", refs.len(), ordered));

    let entities: Vec<Entity<'_>> = refs
        .iter()
        .filter(|r| with_subtasks || !r.is_subtask())
        .filter_map(|r| collection.get(r))
        .filter(|e| status.map_or(true, |s| e.status() == s))
        .collect();

    if output.is_json() {
        let items: Vec<_> = entities.iter().map(entity_json).collect();
        output.data(&items);
    } else if entities.is_empty() {
        println!("No tasks");
    } else {
        println!("{:<8} {:<12} {:<8} TITLE", "ID", "STATUS", "PRIORITY");
        println!("{}", "-".repeat(60));

        for entity in entities {
            let indent = if entity.is_subtask() && !ordered { "  " } else { "" };
            println!(
                "{:<8} {:<12} {:<8} {}{}",
                entity.task_ref().to_string(),
                entity.status(),
                entity.priority(),
                indent,
                entity.title()
            );
        }
    }

    Ok(())
}

fn show_task(session: &Session, output: &Output, id: &str) -> Result<()> {
    let collection = session.read()?;
    let entity = collection.resolve_token(id.trim())?;
    let this = entity.task_ref();

    let graph = DependencyGraph::from_collection(&collection);
    let blocks = graph.dependents(&this);
    let waiting_on = unsatisfied(&collection, &entity);

    let (description, details, test_strategy, subtasks) = match entity {
        Entity::Task(task) => (
            &task.description,
            &task.details,
            &task.test_strategy,
            task.subtasks.as_slice(),
        ),
        Entity::Subtask(_, sub) => (&sub.description, &sub.details, &sub.test_strategy, &[][..]),
    };

    if output.is_json() {
        let mut value = entity_json(&entity);
        value["description"] = serde_json::json!(description);
        value["details"] = serde_json::json!(details);
        value["testStrategy"] = serde_json::json!(test_strategy);
        value["blocks"] = serde_json::json!(refs_json(&blocks));
        value["waitingOn"] = serde_json::json!(refs_json(&waiting_on));
        value["subtasks"] = serde_json::json!(subtasks
            .iter()
            .map(|s| entity_json(&Entity::Subtask(entity.owner(), s)))
            .collect::<Vec<_>>());
        output.data(&value);
        return Ok(());
    }

    println!("{}: {}", if entity.is_subtask() { "Subtask" } else { "Task" }, this);
    println!("Title: {}", entity.title());
    println!("Status: {}", entity.status());
    println!("Priority: {}", entity.priority());

    if !entity.dependencies().is_empty() {
        println!("\nDepends on:");
        for dep in entity.dependencies() {
            let dep_status = collection
                .status_of(dep)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "missing".to_string());
            println!("  {} ({})", dep, dep_status);
        }
    }

    if !blocks.is_empty() {
        println!("\nBlocks:");
        for dependent in &blocks {
            println!("  {}", dependent);
        }
    }

    if !subtasks.is_empty() {
        println!("\nSubtasks:");
        for sub in subtasks {
            println!("  {}.{} [{}] {}", this.task_id(), sub.id, sub.status, sub.title);
        }
    }

    for (label, text) in [
        ("Description", description),
        ("Details", details),
        ("Test strategy", test_strategy),
    ] {
        if !text.is_empty() {
            println!("\n{}:", label);
            println!("{}", text);
        }
    }

    println!();
    if entity.status().is_terminal() {
        println!("State: {}", entity.status());
    } else if waiting_on.is_empty() {
        println!("State: READY (all dependencies done)");
    } else {
        let list: Vec<_> = refs_json(&waiting_on);
        println!("State: BLOCKED (waiting on {})", list.join(", "));
    }

    Ok(())
}

fn set_status(session: &Session, output: &Output, ids: &str, status: &str) -> Result<()> {
    let refs = parse_list(ids)?;
    let status = parse_status(status)?;
    output.verbose_ctx("set-status", &format!("{} ids -> {}", refs.len(), status));

    let changed = session.modify(output, |collection| {
        let mut changed = Vec::new();
        for task_ref in &refs {
            changed.extend(collection.set_status(*task_ref, status)?);
        }
        Ok(changed)
    })?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "status": status,
            "changed": refs_json(&changed),
        }));
    } else if changed.is_empty() {
        output.success(&format!("Nothing to change; already {}", status));
    } else {
        output.success(&format!(
            "Set {} to {}",
            refs_json(&changed).join(", "),
            status
        ));
    }

    Ok(())
}

fn remove_tasks(session: &Session, output: &Output, ids: &str) -> Result<()> {
    let refs = parse_list(ids)?;

    let removals = session.modify(output, |collection: &mut TaskCollection| {
        Ok(collection.remove_tasks(&refs)?)
    })?;

    output.verbose_ctx("remove", &format!("Removed {} entities", removals.len()));

    if output.is_json() {
        let items: Vec<_> = removals
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.removed.task_ref().to_string(),
                    "title": r.removed.title(),
                    "deleted": refs_json(&r.deleted_refs),
                    "edits": r.edits,
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    for removal in &removals {
        output.success(&format!(
            "Removed {}: {}",
            removal.removed.task_ref(),
            removal.removed.title()
        ));
        for edit in &removal.edits {
            println!(
                "  {} no longer depends on {}",
                edit.entity,
                refs_json(&edit.removed).join(", ")
            );
        }
    }

    Ok(())
}

fn convert_subtask(session: &Session, output: &Output, id: &str) -> Result<()> {
    let target: TaskRef = id.trim().parse()?;

    let conversion = session.modify(output, |collection| {
        Ok(collection.convert_subtask_to_task(target)?)
    })?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "previous": conversion.previous.to_string(),
            "id": conversion.task.id,
            "title": conversion.task.title,
            "rewritten": refs_json(&conversion.rewritten),
        }));
    } else {
        output.success(&format!(
            "Converted {} to task {}: {}",
            conversion.previous, conversion.task.id, conversion.task.title
        ));
        for entity in &conversion.rewritten {
            println!("  {} now depends on {}", entity, conversion.task.id);
        }
    }

    Ok(())
}
