//! Subcommands changing what is pending in the workspace: checkout, add, delete, revert.

use crate::commands::status::{print_states, refresh_status};
use crate::core::{
    command_init::{CommandContext, CommandInit},
    error::Result,
    operation::Operation,
    output::print_success,
};

fn run_on_files(operation: Operation, files: Vec<String>, done: &str) -> Result<()> {
    let mut context = CommandInit::initialize_with_files(&files)?;
    context.run(operation, &files)?;
    print_success(&format!("{done} {} file(s)", files.len()));
    show_files(&mut context, &files)
}

fn show_files(context: &mut CommandContext, files: &[String]) -> Result<()> {
    let states = refresh_status(context, files)?;
    print_states(&states, context.provider.workspace_root().unwrap_or_default());
    Ok(())
}

pub fn execute_checkout(files: Vec<String>) -> Result<()> {
    run_on_files(Operation::CheckOut, files, "Checked out")
}

pub fn execute_add(files: Vec<String>) -> Result<()> {
    run_on_files(Operation::MarkForAdd, files, "Marked for add")
}

pub fn execute_delete(files: Vec<String>) -> Result<()> {
    run_on_files(Operation::Delete, files, "Deleted")
}

/// Which revert the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertMode {
    Files { keep_changes: bool },
    Unchanged,
    All,
}

pub fn execute_revert(mode: RevertMode, files: Vec<String>) -> Result<()> {
    let operation = match mode {
        RevertMode::Files { keep_changes } => {
            return run_on_files(Operation::Revert { keep_changes }, files, "Reverted");
        }
        RevertMode::Unchanged => Operation::RevertUnchanged,
        RevertMode::All => Operation::RevertAll,
    };

    let mut context = CommandInit::initialize()?;
    context.run(operation, &files)?;
    print_success(match mode {
        RevertMode::Unchanged => "Reverted unchanged files",
        _ => "Reverted all pending changes",
    });
    show_files(&mut context, &[])
}
