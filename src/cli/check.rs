//! Validation and repair commands

use anyhow::Result;

use super::output::Output;
use super::session::Session;
use crate::domain::{fix, repair, validate, RepairAction, ValidationSummary};

/// Reports every dependency problem without changing anything
pub fn run_validate(session: &Session, output: &Output) -> Result<()> {
    let collection = session.read()?;
    let violations = validate(&collection);
    let summary = ValidationSummary::from_violations(&violations);

    output.verbose_ctx(
        "validate",
        &format!(
            "Checked {} entities, {} violations",
            collection.entity_count(),
            summary.total()
        ),
    );

    if output.is_json() {
        output.data(&serde_json::json!({
            "valid": violations.is_empty(),
            "violations": violations,
            "summary": summary,
        }));
        return Ok(());
    }

    if violations.is_empty() {
        println!(
            "All dependencies are valid ({} tasks and subtasks checked)",
            collection.entity_count()
        );
        return Ok(());
    }

    println!("Found {} dependency problem(s):", summary.total());
    for violation in &violations {
        println!("  [{}] {}", violation.label(), violation);
    }
    println!();
    println!(
        "self: {}  duplicate: {}  missing: {}  cycles: {}",
        summary.self_dependencies, summary.duplicates, summary.not_found, summary.cycles
    );
    println!("Run 'tasktree fix' to repair.");

    Ok(())
}

/// Repairs the document, or reports what a repair would do
pub fn run_fix(session: &Session, output: &Output, dry_run: bool) -> Result<()> {
    let actions = if dry_run {
        output.verbose_ctx("fix", "Dry run, nothing will be written");
        let (_, actions) = fix(&session.read()?);
        actions
    } else {
        session.modify(output, |collection| Ok(repair(collection)))?
    };

    output.verbose_ctx("fix", &format!("{} repair actions", actions.len()));
    report(output, &actions, dry_run);
    Ok(())
}

fn report(output: &Output, actions: &[RepairAction], dry_run: bool) {
    if output.is_json() {
        output.data(&serde_json::json!({
            "dry_run": dry_run,
            "actions": actions,
        }));
        return;
    }

    if actions.is_empty() {
        println!("Nothing to fix");
        return;
    }

    let verb = if dry_run { "Would remove" } else { "Removed" };
    let noun = if actions.len() == 1 { "entry" } else { "entries" };
    println!("{} {} dependency {}:", verb, actions.len(), noun);
    for action in actions {
        println!("  {}", action);
    }
}
