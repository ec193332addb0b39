use crate::core::command::{Command, CommandOutput};
use crate::core::operation::Operation;
use crate::core::queries::run_update_status;

/// Refresh the given files, or the whole workspace.
///
/// Without files and without `whole_workspace` there is nothing to do.
pub fn execute_update_status(command: &Command, output: &mut CommandOutput) -> bool {
    let (update_history, whole_workspace) = match &command.operation {
        Operation::UpdateStatus {
            update_history,
            whole_workspace,
        } => (*update_history, *whole_workspace),
        _ => return false,
    };
    log::debug!(
        "status (of {} files, update_history={update_history}, whole_workspace={whole_workspace})",
        command.files.len()
    );

    let targets = if !command.files.is_empty() {
        command.files.clone()
    } else if whole_workspace {
        vec![command.snapshot.workspace_root.clone()]
    } else {
        return true;
    };

    let success = run_update_status(
        command.runner(),
        &command.snapshot,
        &targets,
        update_history,
        output,
    );
    if !success {
        log::error!(
            "UpdateStatus failed with {} error(s){}",
            output.errors.len(),
            if output.connection_dropped {
                ": connection dropped"
            } else {
                ""
            }
        );
    }
    success
}
