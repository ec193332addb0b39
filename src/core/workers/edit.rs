//! Workers changing the pending state of files: checkout, add, delete, revert, move
//! and conflict resolution. Each refreshes the status of its files afterwards.

use crate::core::command::{Command, CommandOutput};
use crate::core::operation::Operation;
use crate::core::paths::to_absolute;
use crate::core::queries::run_update_status;
use crate::core::version::UNDO_CHECKOUT_KEEP_CHANGES;
use crate::core::workspace_state::WorkspaceState;
use std::path::Path;

fn refresh(command: &Command, files: &[String], output: &mut CommandOutput) {
    run_update_status(command.runner(), &command.snapshot, files, false, output);
}

fn require_files(command: &Command, output: &mut CommandOutput) -> bool {
    if command.files.is_empty() {
        log::warn!("{}: no files provided", command.operation.name());
        output.errors.push(format!("{}: no files provided", command.operation.name()));
        return false;
    }
    true
}

pub fn execute_checkout(command: &Command, output: &mut CommandOutput) -> bool {
    if !require_files(command, output) {
        return false;
    }
    let verb = command.snapshot.verb("checkout");
    let run = command.runner().run_lines(&verb, &[], &command.files);
    let success = output.absorb(run);

    refresh(command, &command.files, output);
    success
}

pub fn execute_mark_for_add(command: &Command, output: &mut CommandOutput) -> bool {
    if !require_files(command, output) {
        return false;
    }

    let mut parameters = vec!["--parents".to_string()];
    if command.files.iter().all(|file| !Path::new(file).is_dir()) {
        // A wildcard argument makes `cm add` skip ignored files.
        parameters.push("?".to_string());
    } else {
        parameters.push("-R".to_string());
    }
    let verb = command.snapshot.verb("add");
    let run = command.runner().run_lines(&verb, &parameters, &command.files);
    let success = output.absorb(run);

    refresh(command, &command.files, output);
    success
}

pub fn execute_delete(command: &Command, output: &mut CommandOutput) -> bool {
    if !require_files(command, output) {
        return false;
    }
    let verb = command.snapshot.verb("remove");
    let run = command.runner().run_lines(&verb, &[], &command.files);
    let success = output.absorb(run);

    refresh(command, &command.files, output);
    success
}

/// Undo the changes of files changed without a checkout, and the checkout of the others.
///
/// A moved file is reverted together with its origin.
pub fn execute_revert(command: &Command, output: &mut CommandOutput) -> bool {
    let keep_changes = matches!(command.operation, Operation::Revert { keep_changes: true });
    if keep_changes && command.snapshot.cli_version < UNDO_CHECKOUT_KEEP_CHANGES {
        output.errors.push(format!(
            "Keeping changes on revert requires cm {UNDO_CHECKOUT_KEEP_CHANGES} or later"
        ));
        return false;
    }

    let mut changed_files = Vec::new();
    let mut checked_out_files = Vec::new();
    for file in &command.files {
        match command.snapshot.cached_state(file) {
            Some(state) if state.state == WorkspaceState::Changed => changed_files.push(file.clone()),
            Some(state) if state.state == WorkspaceState::Moved && !state.moved_from.is_empty() => {
                checked_out_files.push(file.clone());
                checked_out_files.push(state.moved_from.clone());
            }
            _ => checked_out_files.push(file.clone()),
        }
    }

    let runner = command.runner();
    let mut success = true;
    if !changed_files.is_empty() {
        let run = runner.run_lines("undochange", &[], &changed_files);
        success &= output.absorb(run);
    }
    if !checked_out_files.is_empty() {
        let parameters = if keep_changes {
            vec!["--keepchanges".to_string()]
        } else {
            Vec::new()
        };
        let verb = command.snapshot.verb("undocheckout");
        let run = runner.run_lines(&verb, &parameters, &checked_out_files);
        success &= output.absorb(run);
    }

    let mut reverted = changed_files;
    reverted.extend(checked_out_files);
    refresh(command, &reverted, output);
    success
}

/// Undo the checkout of the files left unchanged, recursively.
pub fn execute_revert_unchanged(command: &Command, output: &mut CommandOutput) -> bool {
    let targets = targets_or_root(command);
    let run = command
        .runner()
        .run_lines("uncounchanged", &["-R".to_string()], &targets);
    let success = output.absorb(run);

    refresh(command, &[command.snapshot.workspace_root.clone()], output);
    success
}

/// Undo every pending change of the workspace.
pub fn execute_revert_all(command: &Command, output: &mut CommandOutput) -> bool {
    let targets = targets_or_root(command);
    let verb = command.snapshot.verb("undocheckout");
    let run = command
        .runner()
        .run_lines(&verb, &["--all".to_string()], &targets);
    let success = output.absorb(run);

    refresh(command, &[command.snapshot.workspace_root.clone()], output);
    success
}

/// Record a move already done on disk, from the single command file to the destination.
pub fn execute_copy(command: &Command, output: &mut CommandOutput) -> bool {
    let Operation::Copy { destination } = &command.operation else {
        return false;
    };
    let [origin] = command.files.as_slice() else {
        log::error!("Copy is working for one file only: {} provided", command.files.len());
        output
            .errors
            .push(format!("Copy is working for one file only: {} provided", command.files.len()));
        return false;
    };
    let destination = to_absolute(&command.snapshot.workspace_root, destination);
    log::info!("Moving {origin} to {destination}...");

    let runner = command.runner();
    let mut success = true;
    // The destination may have been added already; the move replaces that.
    let destination_added = Path::new(&destination).exists()
        && command
            .snapshot
            .cached_state(&destination)
            .is_some_and(|state| state.state == WorkspaceState::Added);
    if destination_added {
        let run = runner.run_lines("undochange", &[], &[destination.clone()]);
        success = output.absorb(run);
    }
    if success {
        let verb = command.snapshot.verb("move");
        let run = runner.run_lines(
            &verb,
            &["--nomoveondisk".to_string()],
            &[origin.clone(), destination.clone()],
        );
        success = output.absorb(run);
    }

    refresh(command, &[origin.clone(), destination], output);
    success
}

/// Resolve conflicts by keeping the workspace version of each file.
pub fn execute_resolve(command: &Command, output: &mut CommandOutput) -> bool {
    let runner = command.runner();
    let mut success = true;

    for file in &command.files {
        let Some(pending) = command
            .snapshot
            .cached_state(file)
            .and_then(|state| state.pending_merge.as_ref())
        else {
            output.errors.push(format!("{file} is not in conflict"));
            success = false;
            continue;
        };

        log::info!("resolve {}", pending.filename);
        let mut parameters = pending.parameters.clone();
        parameters.push("--merge".to_string());
        parameters.push("--keepdestination".to_string());
        let run = runner.run_lines("merge", &parameters, &[pending.filename.clone()]);
        success &= output.absorb(run);
    }

    refresh(command, &command.files, output);
    success
}

fn targets_or_root(command: &Command) -> Vec<String> {
    if command.files.is_empty() {
        vec![command.snapshot.workspace_root.clone()]
    } else {
        command.files.clone()
    }
}
