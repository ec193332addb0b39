//! Pending changelists and their shelves.
//!
//! Every changelist worker ends by listing all changelists again: the cache trusts
//! file to changelist associations only from a fresh listing.

use crate::core::cache::StateCache;
use crate::core::command::{Command, CommandOutput, Snapshot};
use crate::core::operation::Operation;
use crate::core::parsers::changelists::{parse_changelists, parse_shelve_diff, parse_shelves};
use crate::core::runner::Runner;
use crate::core::state::Changelist;

fn list_changelists(runner: &Runner, snapshot: &Snapshot, output: &mut CommandOutput) -> bool {
    let (xml, errors, success) = runner.run_raw(
        "status",
        &[
            "--changelists".to_string(),
            "--controlledchanged".to_string(),
            "--noheader".to_string(),
            "--xml".to_string(),
            "--encoding=\"utf-8\"".to_string(),
        ],
        &[snapshot.workspace_root.clone()],
    );
    output.errors.extend(errors);
    if !success {
        return false;
    }

    let (mut changelists, files) = match parse_changelists(&xml, &snapshot.workspace_root, snapshot.uses_checked_out_changed()) {
        Ok(listing) => listing,
        Err(e) => {
            log::error!("changelists: {e}");
            output.errors.push(e.to_string());
            return false;
        }
    };

    let (xml, errors, success) = runner.run_raw(
        "find",
        &[
            "\"shelves where owner='me'\"".to_string(),
            "--xml".to_string(),
            "--encoding=\"utf-8\"".to_string(),
        ],
        &[],
    );
    let mut shelves_ok = success;
    if success {
        if let Err(e) = parse_shelves(&xml, &mut changelists) {
            log::warn!("shelves: {e}");
            shelves_ok = false;
        }
    } else {
        output.errors.extend(errors);
    }

    for changelist in changelists.iter_mut() {
        let Some(shelve_id) = changelist.shelve_id else {
            continue;
        };
        let run = runner.run_lines(
            "diff",
            &[
                format!("sh:{shelve_id}"),
                "--format=\"{status};{baserevid};{path}\"".to_string(),
            ],
            &[],
        );
        if !run.success || !parse_shelve_diff(&snapshot.workspace_root, &run.lines, changelist) {
            output.errors.extend(run.errors);
            shelves_ok = false;
        }
    }

    output.changelists = Some((changelists, files));
    shelves_ok
}

pub fn execute_get_pending_changelists(command: &Command, output: &mut CommandOutput) -> bool {
    list_changelists(command.runner(), &command.snapshot, output)
}

fn add_to_changelist(
    runner: &Runner,
    changelist: &Changelist,
    files: &[String],
    output: &mut CommandOutput,
) -> bool {
    let run = runner.run_lines(
        "changelist",
        &[format!("\"{}\"", changelist.name), "add".to_string()],
        files,
    );
    output.absorb(run)
}

/// Create the command changelist, then move the command files into it.
pub fn execute_new_changelist(command: &Command, output: &mut CommandOutput) -> bool {
    let Operation::NewChangelist { description } = &command.operation else {
        return false;
    };
    let Some(changelist) = &command.changelist else {
        output.errors.push("NewChangelist: no changelist name".to_string());
        return false;
    };
    let runner = command.runner();

    let run = runner.run_lines(
        "changelist",
        &[
            "add".to_string(),
            format!("\"{}\"", changelist.name),
            format!("\"{}\"", description.replace('"', "'")),
            "--persistent".to_string(),
        ],
        &[],
    );
    let mut success = output.absorb(run);
    if success && !command.files.is_empty() {
        success = add_to_changelist(runner, changelist, &command.files, output);
    }
    if success {
        output.success_message = format!("Created changelist {}", changelist.name);
    }

    list_changelists(runner, &command.snapshot, output) && success
}

/// Delete the command changelist; its files go back to the default changelist.
pub fn execute_delete_changelist(command: &Command, output: &mut CommandOutput) -> bool {
    let Some(changelist) = command.changelist.as_ref().filter(|changelist| !changelist.is_default()) else {
        output
            .errors
            .push("The default changelist cannot be deleted".to_string());
        return false;
    };
    let runner = command.runner();

    let run = runner.run_lines(
        "changelist",
        &["delete".to_string(), format!("\"{}\"", changelist.name)],
        &[],
    );
    let success = output.absorb(run);

    list_changelists(runner, &command.snapshot, output) && success
}

/// Move the command files to the command changelist, the default one if none.
pub fn execute_move_to_changelist(command: &Command, output: &mut CommandOutput) -> bool {
    if command.files.is_empty() {
        output.errors.push("MoveToChangelist: no files provided".to_string());
        return false;
    }
    let changelist = command
        .changelist
        .clone()
        .unwrap_or_else(Changelist::default_changelist);
    let runner = command.runner();

    let success = add_to_changelist(runner, &changelist, &command.files, output);
    list_changelists(runner, &command.snapshot, output) && success
}

pub fn update_changelists(
    _command: &Command,
    output: &mut CommandOutput,
    cache: &mut StateCache,
) -> bool {
    match output.changelists.take() {
        Some((changelists, files)) => cache.apply_changelists(&changelists, &files),
        None => false,
    }
}
