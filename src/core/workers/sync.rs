use crate::core::command::{Command, CommandOutput};
use crate::core::operation::Operation;
use crate::core::parsers::merge::{parse_partial_update_results, parse_update_results};
use crate::core::paths::{path_to_string, paths_equal_ignore_case};
use crate::core::queries::{run_update_status, workspace_info};

/// Update the workspace, or the given files, to the head of the branch.
///
/// The status of every updated file is refreshed afterwards.
pub fn execute_sync(command: &Command, output: &mut CommandOutput) -> bool {
    let runner = command.runner();
    let snapshot = &command.snapshot;
    let targets = if command.files.is_empty() {
        vec![snapshot.workspace_root.clone()]
    } else {
        command.files.clone()
    };

    let updated_files = if snapshot.is_partial_workspace() {
        let run = runner.run_lines(
            "partial update",
            &["--report".to_string(), "--machinereadable".to_string()],
            &targets,
        );
        let lines = run.lines.clone();
        if !output.absorb(run) {
            return false;
        }
        parse_partial_update_results(&lines)
    } else {
        let xml_file = match tempfile::Builder::new()
            .prefix("plastic-update-")
            .suffix(".xml")
            .tempfile()
        {
            Ok(file) => file,
            Err(e) => {
                output.errors.push(format!("Failed to create a temporary file: {e}"));
                return false;
            }
        };
        let parameters = vec![
            "--last".to_string(),
            "--dontmerge".to_string(),
            format!("--xml=\"{}\"", path_to_string(xml_file.path())),
            "--encoding=\"utf-8\"".to_string(),
        ];
        let run = runner.run_lines("update", &parameters, &targets);
        if !output.absorb(run) {
            return false;
        }
        match std::fs::read_to_string(xml_file.path())
            .map_err(crate::core::error::PlasticError::from)
            .and_then(|xml| parse_update_results(&xml))
        {
            Ok(files) => files,
            Err(e) => {
                log::warn!("update report: {e}");
                Vec::new()
            }
        }
    };
    log::info!("Updated {} file(s)", updated_files.len());

    let syncs_root = targets.len() == 1 && paths_equal_ignore_case(&targets[0], &snapshot.workspace_root);
    if syncs_root {
        run_update_status(runner, snapshot, &targets, false, output);
    } else if !updated_files.is_empty() {
        run_update_status(runner, snapshot, &updated_files, false, output);
    }
    true
}

/// Switch the workspace to another branch, then refresh the whole workspace.
pub fn execute_switch_to_branch(command: &Command, output: &mut CommandOutput) -> bool {
    let Operation::SwitchToBranch { branch_name } = &command.operation else {
        return false;
    };
    let runner = command.runner();
    let snapshot = &command.snapshot;

    let verb = snapshot.verb("switch");
    let run = runner.run_lines(&verb, &[format!("\"br:{branch_name}\"")], &[]);
    if !output.absorb(run) {
        return false;
    }

    let mut switched = snapshot.clone();
    if let Some(info) = workspace_info(runner, &snapshot.workspace_root) {
        switched.branch_name = info.branch_name.clone();
        output.workspace_info = Some(info);
    }
    let root = vec![snapshot.workspace_root.clone()];
    run_update_status(runner, &switched, &root, false, output);
    true
}
