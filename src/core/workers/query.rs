//! Repository queries: branches, changesets and locks.

use crate::core::command::{Command, CommandOutput};
use crate::core::operation::Operation;
use crate::core::parsers::query::{parse_branches, parse_changesets, parse_log};
use crate::core::queries::{list_locks, run_update_status};
use crate::core::version::SMART_LOCKS;
use chrono::{DateTime, Utc};

fn find_query(entity: &str, from_date: Option<DateTime<Utc>>) -> String {
    match from_date {
        Some(date) => format!("\"{entity} where date >= '{}'\"", date.format("%Y/%m/%d")),
        None => entity.to_string(),
    }
}

fn run_xml_query(command: &Command, verb: &str, mut parameters: Vec<String>, output: &mut CommandOutput) -> Option<String> {
    parameters.push("--xml".to_string());
    parameters.push("--encoding=\"utf-8\"".to_string());
    let (xml, errors, success) = command.runner().run_raw(verb, &parameters, &[]);
    output.errors.extend(errors);
    success.then_some(xml)
}

pub fn execute_get_branches(command: &Command, output: &mut CommandOutput) -> bool {
    let Operation::GetBranches { from_date } = &command.operation else {
        return false;
    };
    let Some(xml) = run_xml_query(command, "find", vec![find_query("branches", *from_date)], output) else {
        return false;
    };
    match parse_branches(&xml) {
        Ok(branches) => {
            output.branches = branches;
            true
        }
        Err(e) => {
            output.errors.push(e.to_string());
            false
        }
    }
}

pub fn execute_get_changesets(command: &Command, output: &mut CommandOutput) -> bool {
    let Operation::GetChangesets { from_date } = &command.operation else {
        return false;
    };
    let Some(xml) = run_xml_query(command, "find", vec![find_query("changesets", *from_date)], output) else {
        return false;
    };
    match parse_changesets(&xml) {
        Ok(mut changesets) => {
            // Most recent first
            changesets.sort_by(|a, b| b.changeset_id.cmp(&a.changeset_id));
            output.changesets = changesets;
            true
        }
        Err(e) => {
            output.errors.push(e.to_string());
            false
        }
    }
}

pub fn execute_get_changeset_files(command: &Command, output: &mut CommandOutput) -> bool {
    let Operation::GetChangesetFiles { changeset } = &command.operation else {
        return false;
    };
    let parameters = vec![format!("cs:{}", changeset.changeset_id)];
    let Some(xml) = run_xml_query(command, "log", parameters, output) else {
        return false;
    };
    match parse_log(&xml, changeset, &command.snapshot.root_rep_spec()) {
        Ok(files) => {
            let mut changeset = changeset.clone();
            changeset.files = files;
            output.changesets = vec![changeset];
            true
        }
        Err(e) => {
            output.errors.push(e.to_string());
            false
        }
    }
}

pub fn execute_get_locks(command: &Command, output: &mut CommandOutput) -> bool {
    if command.snapshot.cli_version < SMART_LOCKS {
        output
            .errors
            .push(format!("Listing locks requires cm {SMART_LOCKS} or later"));
        return false;
    }
    let errors_before = output.errors.len();
    let locks = list_locks(command.runner(), &command.snapshot, output);
    output.locks = locks;
    output.errors.len() == errors_before
}

/// Release the locks, or remove them entirely, then refresh the command files.
pub fn execute_unlock(command: &Command, output: &mut CommandOutput) -> bool {
    let Operation::Unlock { lock_ids, remove } = &command.operation else {
        return false;
    };
    if lock_ids.is_empty() {
        output.errors.push("Unlock: no lock provided".to_string());
        return false;
    }

    let mut parameters = vec!["unlock".to_string()];
    parameters.extend(lock_ids.iter().map(|id| format!("itemid:{id}")));
    if *remove {
        parameters.push("--remove".to_string());
    }
    let run = command.runner().run_lines("lock", &parameters, &[]);
    let success = output.absorb(run);

    if !command.files.is_empty() {
        run_update_status(command.runner(), &command.snapshot, &command.files, false, output);
    }
    success
}
