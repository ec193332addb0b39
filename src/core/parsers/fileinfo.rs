//! `cm fileinfo` and `cm lock list` output.

use super::{parse_date, split_fields, user_name_to_display_name};
use crate::core::shell::atoi;
use crate::core::state::{FileState, Lock};

/// Format requested from `cm fileinfo`, one line per file
pub const FILEINFO_FORMAT: &str =
    "--format=\"{RevisionChangeset};{RevisionHeadChangeset};{RepSpec};{LockedBy};{LockedWhere};{ServerPath}\"";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileInfo {
    pub revision_changeset: i32,
    pub head_changeset: i32,
    pub rep_spec: String,
    pub locked_by: String,
    pub locked_where: String,
    pub server_path: String,
}

impl FileInfo {
    /// `40;41;repo@server:port;jane;Workspace_2;/Content/A.uasset`
    pub fn parse(line: &str) -> Option<Self> {
        match split_fields(line).as_slice() {
            [revision, head, rep_spec, locked_by, locked_where, server_path] => Some(Self {
                revision_changeset: atoi(revision),
                head_changeset: atoi(head),
                rep_spec: rep_spec.to_string(),
                locked_by: user_name_to_display_name(locked_by).to_string(),
                locked_where: locked_where.to_string(),
                server_path: server_path.to_string(),
            }),
            _ => None,
        }
    }
}

/// Merge fileinfo lines into the states of the status call they were requested for.
///
/// Lines and states correspond by position. When their counts differ nothing is
/// merged, since any pairing could attribute revisions to the wrong file.
/// `branch_name` is the branch of the workspace: a lock retained on that branch is
/// not worth reporting.
pub fn apply_fileinfo(
    lines: &[String],
    locks: &[Lock],
    branch_name: &str,
    states: &mut [FileState],
) -> bool {
    if lines.len() != states.len() {
        log::error!(
            "The fileinfo command gave {} results for {} file states",
            lines.len(),
            states.len()
        );
        return false;
    }

    for (index, (line, state)) in lines.iter().zip(states.iter_mut()).enumerate() {
        let Some(info) = FileInfo::parse(line) else {
            log::warn!("Unexpected fileinfo line '{line}'");
            continue;
        };

        state.local_revision = info.revision_changeset;
        state.depot_revision = info.head_changeset;
        state.rep_spec = info.rep_spec;

        let matching: Vec<&Lock> = locks
            .iter()
            .filter(|lock| lock.path == info.server_path)
            .collect();
        for lock in &matching {
            let owner = user_name_to_display_name(&lock.owner);
            if lock.is_locked {
                concat(&mut state.locked_by, owner);
            } else if lock.branch != branch_name {
                concat(&mut state.retained_by, owner);
            }
            concat(&mut state.locked_where, &lock.workspace);
            concat(&mut state.locked_branch, &lock.branch);

            // With several destination branches there is no telling which one to unlock.
            if matching.len() == 1 {
                state.locked_id = Some(lock.item_id);
            }
            state.locked_date = lock.date;
        }

        if index < 20 {
            log::trace!(
                "{}: {};{} {} by '{}' ({})",
                state.path,
                state.local_revision,
                state.depot_revision,
                state.rep_spec,
                state.locked_by,
                state.locked_where
            );
        }
    }

    true
}

fn concat(target: &mut String, other: &str) {
    if !target.is_empty() {
        target.push_str(", ");
    }
    target.push_str(other);
}

/// Parse one line of `cm lock list --machinereadable --smartlocks --fieldseparator=";"`.
///
/// ```text
/// 3b2f..;2;MyRepo@server;2024-01-10T10:02:45+01:00;/main;br:/main;/main/task;br:/main/task;Locked;jane@example.com;jane_ws;/Content/A.uasset
/// ```
pub fn parse_lock_line(line: &str) -> Option<Lock> {
    let fields = split_fields(line);
    if fields.len() < 12 {
        log::warn!("Unexpected lock line '{line}'");
        return None;
    }

    let status = fields[8].to_string();
    Some(Lock {
        item_id: atoi(fields[1]),
        date: parse_date(fields[3]),
        destination_branch: fields[4].to_string(),
        branch: fields[6].to_string(),
        is_locked: status == "Locked",
        status,
        owner: fields[9].to_string(),
        workspace: fields[10].to_string(),
        path: fields[11].to_string(),
    })
}

pub fn parse_locks(lines: &[String]) -> Vec<Lock> {
    lines.iter().filter_map(|line| parse_lock_line(line)).collect()
}
