//! Multi-command sequences shared by the workers.
//!
//! Each function issues one or more `cm` commands through the command runner, parses
//! the replies and records states and messages on the [`CommandOutput`].

use crate::core::command::{CommandOutput, Snapshot};
use crate::core::parsers::fileinfo::{apply_fileinfo, parse_locks, FILEINFO_FORMAT};
use crate::core::parsers::history::{history_parameters, parse_history, HistoryContext};
use crate::core::parsers::merge::{apply_merge_conflicts, read_merge_source};
use crate::core::parsers::status::{
    parse_changeset_from_header, parse_directory_status, parse_file_status,
    remove_redundant_errors, without_headers,
};
use crate::core::parsers::workspace::{parse_profile_user, parse_workspace_info, WorkspaceInfo};
use crate::core::paths::{normalize_path, path_to_string};
use crate::core::runner::Runner;
use crate::core::state::{FileState, Lock};
use crate::core::version::{CliVersion, NEW_HISTORY_LIMIT, SMART_LOCKS};
use std::path::Path;

fn strings(parameters: &[&str]) -> Vec<String> {
    parameters.iter().map(|parameter| parameter.to_string()).collect()
}

/// Version of the `cm` client, from `cm version`.
pub fn cli_version(runner: &Runner) -> Option<CliVersion> {
    let output = runner.run_lines("version", &[], &[]);
    if !output.success {
        return None;
    }
    let line = output.lines.first()?;
    match line.parse::<CliVersion>() {
        Ok(version) => Some(version),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    }
}

/// User name of the default profile, from `cm whoami`.
pub fn whoami(runner: &Runner) -> Option<String> {
    let output = runner.run_lines("whoami", &[], &[]);
    output.success.then(|| output.lines.into_iter().next()).flatten()
}

/// User name configured for `server_url`, falling back to the default profile.
pub fn user_name_for_server(runner: &Runner, server_url: &str) -> Option<String> {
    let output = runner.run_lines("profile", &strings(&["list", "--format=\"{server};{user}\""]), &[]);
    if output.success {
        if let Some(user) = parse_profile_user(&output.lines, server_url) {
            return Some(user);
        }
    }
    whoami(runner)
}

pub fn workspace_name(runner: &Runner, workspace_root: &str) -> Option<String> {
    let output = runner.run_lines(
        "getworkspacefrompath",
        &strings(&["--format={0}"]),
        &[workspace_root.to_string()],
    );
    output.success.then(|| output.lines.into_iter().next()).flatten()
}

pub fn workspace_info(runner: &Runner, workspace_root: &str) -> Option<WorkspaceInfo> {
    let output = runner.run_lines(
        "status",
        &strings(&["--wkconfig", "--nochanges", "--nostatus"]),
        &[workspace_root.to_string()],
    );
    if !output.success {
        return None;
    }
    parse_workspace_info(&output.lines)
}

/// Changeset the workspace is on, `-1` in a partial workspace.
pub fn workspace_changeset(runner: &Runner, workspace_root: &str) -> Option<i32> {
    let output = runner.run_lines(
        "status",
        &strings(&["--header", "--machinereadable", "--fieldseparator=\";\""]),
        &[workspace_root.to_string()],
    );
    if !output.success {
        return None;
    }
    parse_changeset_from_header(&output.lines)
}

pub fn check_connection(runner: &Runner, output: &mut CommandOutput) -> bool {
    let run = runner.run_lines("checkconnection", &[], &[]);
    output.absorb(run)
}

/// Smart locks of the repository; empty when the client predates them.
pub fn list_locks(runner: &Runner, snapshot: &Snapshot, output: &mut CommandOutput) -> Vec<Lock> {
    if snapshot.cli_version < SMART_LOCKS {
        return Vec::new();
    }
    let run = runner.run_lines(
        "lock",
        &strings(&[
            "list",
            "--machinereadable",
            "--smartlocks",
            "--anystatus",
            "--fieldseparator=\";\"",
        ]),
        &[],
    );
    if run.success {
        parse_locks(&run.lines)
    } else {
        output.errors.extend(run.errors);
        Vec::new()
    }
}

fn status_parameters(snapshot: &Snapshot, whole_directory: bool) -> Vec<String> {
    let mut parameters = strings(&["--machinereadable", "--fieldseparator=\";\""]);
    if snapshot.uses_checked_out_changed() {
        parameters.push("--iscochanged".to_string());
    }
    if whole_directory {
        // Only the changes: private files of a whole directory are not worth listing.
        parameters.extend(strings(&[
            "--controlledchanged",
            "--changed",
            "--localdeleted",
            "--localmoved",
        ]));
    } else {
        parameters.extend(strings(&["--all", "--ignored"]));
    }
    parameters
}

/// Status of one directory as a whole, or of an explicit list of files.
///
/// The first reply line is the `STATUS;<changeset>;...` header.
fn run_status(
    runner: &Runner,
    snapshot: &Snapshot,
    targets: &[String],
    whole_directory: bool,
    output: &mut CommandOutput,
    states: &mut Vec<FileState>,
) -> bool {
    let run = runner.run_lines("status", &status_parameters(snapshot, whole_directory), targets);
    let mut success = run.success;
    let mut errors = run.errors;
    if !success && remove_redundant_errors(&mut errors, &mut output.infos) {
        success = true;
    }
    output.errors.extend(errors);
    if !success {
        return false;
    }

    if let Some(changeset) = parse_changeset_from_header(&run.lines) {
        output.changeset = Some(changeset);
    }
    let lines = without_headers(&run.lines);
    if whole_directory {
        states.extend(parse_directory_status(&lines, snapshot.uses_checked_out_changed()));
    } else {
        states.extend(parse_file_status(targets, &lines, snapshot.uses_checked_out_changed()));
    }
    true
}

/// Revisions and locks of the source controlled states.
fn run_fileinfo(
    runner: &Runner,
    snapshot: &Snapshot,
    states: &mut [FileState],
    output: &mut CommandOutput,
) -> bool {
    let indices: Vec<usize> = states
        .iter()
        .enumerate()
        .filter(|(_, state)| state.state.is_source_controlled() && !state.state.is_deleted())
        .map(|(index, _)| index)
        .collect();
    if indices.is_empty() {
        return true;
    }

    let files: Vec<String> = indices.iter().map(|&index| states[index].path.clone()).collect();
    let run = runner.run_lines("fileinfo", &[FILEINFO_FORMAT.to_string()], &files);
    output.errors.extend(run.errors);
    if !run.success {
        return false;
    }

    let locks = list_locks(runner, snapshot, output);
    let mut controlled: Vec<FileState> = indices.iter().map(|&index| states[index].clone()).collect();
    if !apply_fileinfo(&run.lines, &locks, &snapshot.branch_name, &mut controlled) {
        return false;
    }
    for (index, state) in indices.into_iter().zip(controlled) {
        states[index] = state;
    }
    true
}

/// Flag the states conflicted by a merge in progress.
fn run_check_merge(runner: &Runner, snapshot: &Snapshot, states: &mut [FileState]) {
    let Some(source) = read_merge_source(Path::new(&snapshot.workspace_root)) else {
        return;
    };
    log::debug!("Merge in progress from {source}");

    let run = runner.run_lines("merge", &[source.clone(), "--machinereadable".to_string()], &[]);
    if run.success {
        apply_merge_conflicts(&run.lines, &source, states);
    }
}

/// Head revision and, with `update_history`, the whole history of the states.
fn run_history(
    runner: &Runner,
    snapshot: &Snapshot,
    update_history: bool,
    states: &mut [FileState],
    output: &mut CommandOutput,
) -> bool {
    let files: Vec<String> = states
        .iter()
        .filter(|state| state.state.is_source_controlled())
        .map(|state| state.path.clone())
        .collect();
    if files.is_empty() {
        return true;
    }

    let xml_file = match tempfile::Builder::new().prefix("plastic-history-").suffix(".xml").tempfile() {
        Ok(file) => file,
        Err(e) => {
            output.errors.push(format!("Failed to create a temporary file: {e}"));
            return false;
        }
    };
    let xml_path = path_to_string(xml_file.path());
    let limit = if snapshot.cli_version >= NEW_HISTORY_LIMIT {
        Some(if update_history { snapshot.history_limit } else { 1 })
    } else {
        None
    };

    let run = runner.run_lines("history", &history_parameters(&xml_path, limit), &files);
    output.errors.extend(run.errors);
    if !run.success {
        return false;
    }

    let xml = match std::fs::read_to_string(xml_file.path()) {
        Ok(xml) => xml,
        Err(e) => {
            output.errors.push(format!("Failed to read '{xml_path}': {e}"));
            return false;
        }
    };
    let context = HistoryContext::new(
        &snapshot.workspace_root,
        &snapshot.repository_name,
        &snapshot.server_url,
        &snapshot.branch_name,
        snapshot.history_limit,
    );
    match parse_history(&xml, &context, update_history, states) {
        Ok(()) => true,
        Err(e) => {
            log::error!("history: {e}");
            output.errors.push(e.to_string());
            false
        }
    }
}

/// Refresh the state of `targets`, files or directories.
///
/// Runs a status, then fileinfo for revisions and locks, the conflicts of a merge in
/// progress, and the history. Directories are queried as a whole and recorded in
/// `output.status_directories` so the cache can reconcile entries they no longer report.
/// When the status fails the connection is checked, to tell a dropped connection from
/// a failed command.
pub fn run_update_status(
    runner: &Runner,
    snapshot: &Snapshot,
    targets: &[String],
    update_history: bool,
    output: &mut CommandOutput,
) -> bool {
    let (directories, files): (Vec<String>, Vec<String>) = targets
        .iter()
        .map(|target| normalize_path(target))
        .partition(|target| Path::new(target).is_dir());

    let mut states: Vec<FileState> = Vec::new();
    let mut success = true;

    for directory in &directories {
        let mut directory_states = Vec::new();
        if run_status(runner, snapshot, std::slice::from_ref(directory), true, output, &mut directory_states) {
            output.status_directories.push(directory.clone());
            states.extend(directory_states);
        } else {
            success = false;
        }
    }
    if !files.is_empty() {
        success &= run_status(runner, snapshot, &files, false, output, &mut states);
    }

    if !success {
        output.connection_dropped = !check_connection(runner, output);
        output.states.extend(states);
        return false;
    }

    if !run_fileinfo(runner, snapshot, &mut states, output) {
        success = false;
    }
    run_check_merge(runner, snapshot, &mut states);
    if (update_history || !files.is_empty()) && !run_history(runner, snapshot, update_history, &mut states, output) {
        success = false;
    }

    output.states.extend(states);
    success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shell::{CommandReply, CommandRequest, Transport};
    use crate::core::workspace_state::WorkspaceState;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Replies by verb, recording every command line.
    struct ScriptedTransport {
        replies: Vec<(&'static str, CommandReply)>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<(&'static str, CommandReply)>) -> Arc<Self> {
            Arc::new(Self {
                replies,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&self, request: &CommandRequest) -> CommandReply {
            self.requests.lock().push(request.to_command_line());
            self.replies
                .iter()
                .find(|(verb, _)| *verb == request.verb)
                .map(|(_, reply)| reply.clone())
                .unwrap_or_else(|| reply("", 1))
        }
    }

    /// Reply shaped like the shell's: a failed command's output is its error text.
    fn reply(output: &str, result_code: i32) -> CommandReply {
        let (output, errors) = if result_code == 0 {
            (output.to_string(), String::new())
        } else {
            (String::new(), output.to_string())
        };
        CommandReply {
            output,
            errors,
            result_code,
            success: result_code == 0,
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            workspace_root: "/nonexistent-ws".to_string(),
            repository_name: "Repo".to_string(),
            server_url: "localhost:8087".to_string(),
            branch_name: "/main".to_string(),
            changeset: 41,
            cli_version: CliVersion::new(9, 0, 16, 4839),
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_cli_version() {
        let transport = ScriptedTransport::new(vec![("version", reply("11.0.16.7709\n", 0))]);
        let runner = Runner::new(transport);
        assert_eq!(cli_version(&runner), Some(CliVersion::new(11, 0, 16, 7709)));

        let transport = ScriptedTransport::new(vec![("version", reply("not a version\n", 0))]);
        assert_eq!(cli_version(&Runner::new(transport)), None);
    }

    #[test]
    fn test_user_name_falls_back_to_whoami() {
        let transport = ScriptedTransport::new(vec![
            ("profile", reply("localhost:8087;jane\n", 0)),
            ("whoami", reply("admin\n", 0)),
        ]);
        let runner = Runner::new(transport);
        assert_eq!(user_name_for_server(&runner, "localhost:8087").as_deref(), Some("jane"));
        assert_eq!(user_name_for_server(&runner, "test@cloud").as_deref(), Some("admin"));
    }

    #[test]
    fn test_update_status_of_files() {
        let transport = ScriptedTransport::new(vec![
            (
                "status",
                reply(
                    "STATUS;41;Repo;localhost:8087\nCO+CH;/nonexistent-ws/A.uasset;False;NO_MERGES\n",
                    0,
                ),
            ),
            ("fileinfo", reply("40;41;Repo@localhost:8087;;;/A.uasset\n", 0)),
        ]);
        let runner = Runner::new(transport.clone());
        let mut output = CommandOutput::default();
        let files = vec![
            "/nonexistent-ws/A.uasset".to_string(),
            "/nonexistent-ws/New.uasset".to_string(),
        ];

        // The history command is not scripted and fails.
        assert!(!run_update_status(&runner, &snapshot(), &files, false, &mut output));
        assert_eq!(output.changeset, Some(41));
        assert_eq!(output.states.len(), 2);
        assert_eq!(output.states[0].state, WorkspaceState::CheckedOutChanged);
        assert_eq!(output.states[0].local_revision, 40);
        assert_eq!(output.states[0].depot_revision, 41);
        assert_eq!(output.states[1].state, WorkspaceState::Private);
        assert!(!output.connection_dropped);

        let requests = transport.requests.lock();
        assert!(requests[0].starts_with("status --machinereadable"));
        assert!(requests[0].contains("--all --ignored"));
        // Only the source controlled file is sent to fileinfo.
        assert!(requests[1].starts_with("fileinfo"));
        assert!(requests[1].ends_with("\"/nonexistent-ws/A.uasset\""));
    }

    #[test]
    fn test_update_status_redundant_errors_are_not_failures() {
        let transport = ScriptedTransport::new(vec![(
            "status",
            CommandReply {
                output: String::new(),
                errors: "/elsewhere/B.uasset is not in a workspace.\n".to_string(),
                result_code: 1,
                success: false,
            },
        )]);
        let runner = Runner::new(transport);
        let mut output = CommandOutput::default();
        let files = vec!["/elsewhere/B.uasset".to_string()];

        run_update_status(&runner, &snapshot(), &files, false, &mut output);
        assert!(output.errors.is_empty());
        assert_eq!(output.infos.len(), 1);
        assert_eq!(output.states.len(), 1);
        assert!(!output.connection_dropped);
    }

    #[test]
    fn test_update_status_detects_dropped_connection() {
        let transport = ScriptedTransport::new(vec![("status", reply("", 1))]);
        let runner = Runner::new(transport);
        let mut output = CommandOutput::default();

        assert!(!run_update_status(&runner, &snapshot(), &["/nonexistent-ws/A.uasset".to_string()], false, &mut output));
        assert!(output.connection_dropped);
    }

    #[test]
    fn test_update_status_of_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = path_to_string(temp.path());
        let transport = ScriptedTransport::new(vec![(
            "status",
            reply(&format!("STATUS;7;Repo;localhost:8087\nLD;{root}/Gone.uasset;False;NO_MERGES\n"), 0),
        )]);
        let runner = Runner::new(transport.clone());
        let mut output = CommandOutput::default();
        let snapshot = Snapshot {
            workspace_root: root.clone(),
            ..snapshot()
        };

        assert!(run_update_status(&runner, &snapshot, &[root.clone()], false, &mut output));
        assert_eq!(output.status_directories, vec![root.clone()]);
        assert_eq!(output.states.len(), 1);
        assert_eq!(output.states[0].state, WorkspaceState::LocallyDeleted);
        assert!(transport.requests.lock()[0].contains("--controlledchanged"));
    }
}
