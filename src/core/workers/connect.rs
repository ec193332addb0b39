use crate::core::command::{Command, CommandOutput};
use crate::core::operation::Operation;
use crate::core::queries;

/// Read the workspace configuration and check the server is reachable.
///
/// On a first connection, and if configured, also refresh the whole workspace.
pub fn execute_connect(command: &Command, output: &mut CommandOutput) -> bool {
    let runner = command.runner();
    let snapshot = &command.snapshot;

    let Some(workspace_name) = queries::workspace_name(runner, &snapshot.workspace_root) else {
        output.errors.push(
            "Failed to enable Plastic SCM source control. You need to initialize the project as a Plastic SCM workspace first."
                .to_string(),
        );
        return false;
    };
    let Some(info) = queries::workspace_info(runner, &snapshot.workspace_root) else {
        output
            .errors
            .push(format!("Failed to read the configuration of workspace '{workspace_name}'"));
        return false;
    };
    log::info!(
        "Workspace '{workspace_name}' on {} of {}@{}",
        info.selector,
        info.repository_name,
        info.server_url
    );
    output.workspace_name = Some(workspace_name.clone());
    output.changeset = queries::workspace_changeset(runner, &snapshot.workspace_root);

    if !queries::check_connection(runner, output) {
        output.workspace_info = Some(info);
        return false;
    }
    output.user_name = queries::user_name_for_server(runner, &info.server_url);

    if !snapshot.is_available && snapshot.update_status_at_startup {
        let mut refreshed = snapshot.clone();
        refreshed.workspace_name = workspace_name;
        refreshed.repository_name = info.repository_name.clone();
        refreshed.server_url = info.server_url.clone();
        refreshed.branch_name = info.branch_name.clone();
        if let Some(changeset) = output.changeset {
            refreshed.changeset = changeset;
        }
        let root = vec![refreshed.workspace_root.clone()];
        queries::run_update_status(runner, &refreshed, &root, false, output);
    }

    output.workspace_info = Some(info);
    true
}

/// Create the repository if needed, then a workspace of it in the current directory.
pub fn execute_make_workspace(command: &Command, output: &mut CommandOutput) -> bool {
    let Operation::MakeWorkspace {
        workspace_name,
        repository_name,
        server_url,
    } = &command.operation
    else {
        return false;
    };
    let runner = command.runner();

    // Fails harmlessly when the repository already exists.
    let run = runner.run_lines("makerepository", &[server_url.clone(), repository_name.clone()], &[]);
    output.absorb(run);

    let parameters = vec![
        workspace_name.clone(),
        ".".to_string(),
        format!("--repository=rep:{repository_name}@repserver:{server_url}"),
    ];
    let run = runner.run_lines("makeworkspace", &parameters, &[]);
    output.absorb(run)
}
