use crate::core::{
    command_init::CommandInit,
    error::Result,
    operation::Operation,
    output::{print_info, print_success},
};

/// Update the workspace, or the given files, to the head of the branch.
pub fn execute_sync(files: Vec<String>) -> Result<()> {
    let mut context = CommandInit::initialize()?;
    context.require_connection()?;
    context.run(Operation::Sync, &files)?;

    print_success("Workspace updated");
    print_info(&context.provider.status_text());
    Ok(())
}

/// Switch the workspace to `branch_name`.
pub fn execute_switch(branch_name: String) -> Result<()> {
    let mut context = CommandInit::initialize()?;
    context.require_connection()?;
    context.run(Operation::SwitchToBranch { branch_name: branch_name.clone() }, &[])?;

    print_success(&format!("Switched to branch {branch_name}"));
    print_info(&context.provider.status_text());
    Ok(())
}

/// Print the client, workspace and connection summary.
pub fn execute_connect() -> Result<()> {
    let context = CommandInit::initialize()?;
    print_info(&context.provider.status_text());
    context.require_connection()
}
