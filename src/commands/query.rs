//! Repository listings: branches, changesets and locks.

use crate::core::{
    command_init::CommandInit,
    error::Result,
    operation::Operation,
    output::{print_json, print_section_header, print_success},
    state::{Branch, Changeset, Lock},
};
use chrono::{DateTime, Duration, Utc};
use colored::*;

fn since(days: Option<i64>) -> Option<DateTime<Utc>> {
    days.map(|days| Utc::now() - Duration::days(days))
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn execute_branches(days: Option<i64>, json: bool) -> Result<()> {
    let mut context = CommandInit::initialize()?;
    context.require_connection()?;
    let report = context.run(Operation::GetBranches { from_date: since(days) }, &[])?;

    if json {
        return print_json(&report.branches);
    }
    let current = context.provider.branch_name().to_string();
    print_section_header("Branches");
    for branch in &report.branches {
        println!("  {}", format_branch(branch, branch.name == current));
    }
    println!();
    Ok(())
}

fn format_branch(branch: &Branch, is_current: bool) -> String {
    let marker = if is_current { "*".green().bold() } else { " ".normal() };
    let name = if is_current {
        branch.name.green().bold()
    } else {
        branch.name.white()
    };
    format!(
        "{marker} {name}  {} {}",
        format_date(branch.date).bright_black(),
        branch.created_by.bright_black()
    )
}

pub fn execute_changesets(days: Option<i64>, json: bool) -> Result<()> {
    let mut context = CommandInit::initialize()?;
    context.require_connection()?;
    let report = context.run(Operation::GetChangesets { from_date: since(days) }, &[])?;

    if json {
        return print_json(&report.changesets);
    }
    print_section_header("Changesets");
    for changeset in &report.changesets {
        println!("  {}", format_changeset(changeset));
    }
    println!();
    Ok(())
}

fn format_changeset(changeset: &Changeset) -> String {
    let summary = changeset.comment.lines().next().unwrap_or_default();
    format!(
        "{} {} {} {}  {}",
        format!("cs:{:<6}", changeset.changeset_id).yellow(),
        format_date(changeset.date).bright_black(),
        changeset.branch.blue(),
        changeset.created_by.white(),
        summary
    )
}

pub fn execute_locks(json: bool) -> Result<()> {
    let mut context = CommandInit::initialize()?;
    context.require_connection()?;
    let report = context.run(Operation::GetLocks, &[])?;

    if json {
        return print_json(&report.locks);
    }
    print_section_header("Locks");
    if report.locks.is_empty() {
        println!("  {}", "No lock".bright_black());
    }
    for lock in &report.locks {
        println!("  {}", format_lock(lock));
    }
    println!();
    Ok(())
}

fn format_lock(lock: &Lock) -> String {
    let status = if lock.is_locked {
        lock.status.red()
    } else {
        lock.status.yellow()
    };
    format!(
        "{} {status} {} {}  {}",
        format!("#{:<6}", lock.item_id).bright_black(),
        lock.path.white(),
        lock.owner.bright_black(),
        lock.branch.blue()
    )
}

/// Release the given locks, or remove them when `remove` is set.
pub fn execute_unlock(lock_ids: Vec<i32>, remove: bool, files: Vec<String>) -> Result<()> {
    let mut context = CommandInit::initialize()?;
    context.require_connection()?;
    let count = lock_ids.len();
    context.run(Operation::Unlock { lock_ids, remove }, &files)?;

    print_success(&format!(
        "{} {count} lock(s)",
        if remove { "Removed" } else { "Released" }
    ));
    Ok(())
}
