//! Query commands (next, blocked)

use anyhow::Result;

use super::output::Output;
use super::session::Session;
use super::task::entity_json;
use crate::domain::{blocked_entities, select_next, Granularity, NextOutcome};

fn granularity(session: &Session, subtasks: bool) -> Granularity {
    if subtasks || session.settings().next.include_subtasks {
        Granularity::Subtask
    } else {
        Granularity::Task
    }
}

/// Show the next task to work on
pub fn next(session: &Session, output: &Output, subtasks: bool) -> Result<()> {
    let collection = session.read()?;
    let granularity = granularity(session, subtasks);
    output.verbose_ctx("next", &format!("Selecting at {:?} granularity", granularity));

    let outcome = select_next(&collection, granularity);

    if output.is_json() {
        let value = match &outcome {
            NextOutcome::Ready(entity) => serde_json::json!({
                "status": "ready",
                "task": entity_json(entity),
            }),
            NextOutcome::AllComplete => serde_json::json!({ "status": "all_complete" }),
            NextOutcome::AllBlocked { blocked } => serde_json::json!({
                "status": "all_blocked",
                "blocked": blocked.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
            }),
        };
        output.data(&value);
        return Ok(());
    }

    match outcome {
        NextOutcome::Ready(entity) => {
            println!("Next: {} {}", entity.task_ref(), entity.title());
            println!("Status: {}  Priority: {}", entity.status(), entity.priority());
            if entity.is_subtask() {
                println!("Part of: {} {}", entity.owner().id, entity.owner().title);
            }
        }
        NextOutcome::AllComplete => println!("All tasks are complete."),
        NextOutcome::AllBlocked { blocked } => {
            println!(
                "No task can start: {} waiting on unfinished dependencies.",
                blocked.len()
            );
            println!("Run 'tasktree blocked' for details.");
        }
    }

    Ok(())
}

/// Show entities waiting on unfinished dependencies
pub fn blocked(session: &Session, output: &Output, subtasks: bool) -> Result<()> {
    let collection = session.read()?;
    let blocked = blocked_entities(&collection, granularity(session, subtasks));

    output.verbose_ctx("blocked", &format!("Found {} blocked entities", blocked.len()));

    if output.is_json() {
        output.data(&blocked);
    } else if blocked.is_empty() {
        println!("No blocked tasks.");
    } else {
        println!("Blocked tasks ({}):", blocked.len());
        for item in &blocked {
            let title = collection.get(&item.entity).map(|e| e.title()).unwrap_or("");
            let waiting: Vec<_> = item.waiting_on.iter().map(|r| r.to_string()).collect();
            println!("  {} {}", item.entity, title);
            println!("    waiting on: {}", waiting.join(", "));
        }
    }

    Ok(())
}
