use crate::core::command::{Command, CommandOutput};
use crate::core::operation::Operation;
use crate::core::parsers::merge::parse_checkin_results;
use crate::core::paths::path_to_string;
use crate::core::queries::run_update_status;
use std::io::Write;

/// Check in the files with the operation description as comment.
///
/// The comment goes through a temporary file so that it may span several lines.
pub fn execute_checkin(command: &Command, output: &mut CommandOutput) -> bool {
    let Operation::CheckIn { description } = &command.operation else {
        return false;
    };
    if command.files.is_empty() {
        log::warn!("CheckIn: no files provided");
        output.errors.push("CheckIn: no files provided".to_string());
        return false;
    }
    log::debug!(
        "CheckIn: {} file(s) Description: '{description}'",
        command.files.len()
    );

    let mut comments_file = match tempfile::Builder::new()
        .prefix("plastic-comment-")
        .suffix(".txt")
        .tempfile()
    {
        Ok(file) => file,
        Err(e) => {
            output.errors.push(format!("Failed to create a temporary file: {e}"));
            return false;
        }
    };
    if let Err(e) = comments_file
        .write_all(description.as_bytes())
        .and_then(|()| comments_file.flush())
    {
        output.errors.push(format!("Failed to write the checkin comment: {e}"));
        return false;
    }

    let mut parameters = vec![format!(
        "--commentsfile=\"{}\"",
        path_to_string(comments_file.path())
    )];
    // Also check in files changed without checkout, and moved or deleted locally.
    if command.snapshot.is_partial_workspace() {
        parameters.push("--applychanged".to_string());
    } else {
        parameters.push("--all".to_string());
    }

    let verb = command.snapshot.verb("checkin");
    let run = command.runner().run_lines(&verb, &parameters, &command.files);
    let success = output.absorb(run);

    if success {
        // Deleted files are gone from the workspace once checked in.
        output.removed_files.extend(
            command
                .snapshot
                .states
                .iter()
                .filter(|state| state.state.is_deleted())
                .map(|state| state.path.clone()),
        );
        output.success_message = parse_checkin_results(&output.infos);
        log::info!("CheckIn successful: {}", output.success_message);
    }

    let remaining: Vec<String> = command
        .files
        .iter()
        .filter(|file| !output.removed_files.contains(file))
        .cloned()
        .collect();
    if !remaining.is_empty() {
        run_update_status(command.runner(), &command.snapshot, &remaining, false, output);
    }
    success
}
