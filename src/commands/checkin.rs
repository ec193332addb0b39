use crate::commands::status::refresh_status;
use crate::core::{
    command_init::CommandInit,
    error::{PlasticError, Result},
    operation::Operation,
    output::{print_info, print_success},
};

/// Check in `files`, or every pending change of the workspace when none are given.
pub fn execute_checkin(message: String, files: Vec<String>) -> Result<()> {
    let mut context = CommandInit::initialize()?;
    context.require_connection()?;

    let files = if files.is_empty() {
        refresh_status(&mut context, &[])?
            .into_iter()
            .filter(|state| state.state.is_source_controlled())
            .map(|state| state.path)
            .collect()
    } else {
        files
    };
    if files.is_empty() {
        print_info("Nothing to check in");
        return Err(PlasticError::NoFilesProvided);
    }

    let report = context.run(Operation::CheckIn { description: message }, &files)?;
    if report.success_message.is_empty() {
        print_success(&format!("Checked in {} file(s)", files.len()));
    } else {
        print_success(&report.success_message);
    }
    Ok(())
}
