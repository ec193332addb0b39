use crate::core::{
    colors::format_file_state,
    command_init::{CommandContext, CommandInit},
    error::Result,
    operation::Operation,
    output::{print_json, print_section_header},
    state::FileState,
    workspace_state::WorkspaceState,
};
use colored::*;

/// Refresh and print the status of `files`, or of the whole workspace.
pub fn execute_status(files: Vec<String>, json: bool) -> Result<()> {
    let mut context = CommandInit::initialize()?;
    let states = refresh_status(&mut context, &files)?;

    if json {
        return print_json(&states);
    }
    print_header(&context);
    print_states(&states, context.provider.workspace_root().unwrap_or_default());
    Ok(())
}

/// Run a status of `files` (the whole workspace when empty) and collect the states to show.
///
/// A whole workspace status only lists changed and private items; explicit files are
/// always listed.
pub fn refresh_status(context: &mut CommandContext, files: &[String]) -> Result<Vec<FileState>> {
    context.run(
        Operation::UpdateStatus {
            update_history: false,
            whole_workspace: files.is_empty(),
        },
        files,
    )?;

    let mut states: Vec<FileState> = if files.is_empty() {
        context
            .provider
            .cache()
            .states_matching(|state| state.state.is_modified() || state.state == WorkspaceState::Private)
    } else {
        files
            .iter()
            .filter_map(|file| context.provider.state(file).cloned())
            .collect()
    };
    states.sort_by(|a, b| {
        a.state
            .sort_priority()
            .cmp(&b.state.sort_priority())
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(states)
}

fn print_header(context: &CommandContext) {
    let provider = &context.provider;
    let changeset = if provider.changeset() < 0 {
        "partial".to_string()
    } else {
        format!("cs:{}", provider.changeset())
    };
    println!();
    println!(
        "{} {} {}",
        "On branch".bright_black(),
        provider.branch_name().white().bold(),
        format!("({changeset})").bright_black()
    );
    if !provider.is_available() {
        println!("{}", "Server not reachable, states may be stale".yellow());
    }
}

pub fn print_states(states: &[FileState], workspace_root: &str) {
    if states.is_empty() {
        println!("\n{}\n", "Nothing to report, the workspace is clean".bright_black());
        return;
    }
    print_section_header("Changes");
    for state in states {
        println!("  {}", format_file_state(state, workspace_root));
    }
    println!();
}
