use crate::core::{
    command_init::CommandInit,
    error::{PlasticError, Result},
    operation::Operation,
    output::{print_json, print_section_header},
    state::Revision,
};
use colored::*;

pub fn execute_history(file: String, json: bool) -> Result<()> {
    let files = vec![file];
    let mut context = CommandInit::initialize_with_files(&files)?;
    context.run(
        Operation::UpdateStatus {
            update_history: true,
            whole_workspace: false,
        },
        &files,
    )?;

    let state = context
        .provider
        .state(&files[0])
        .ok_or_else(|| PlasticError::file_not_found(&files[0]))?;
    if json {
        return print_json(&state.history);
    }

    print_section_header(&format!("History of {}", files[0]));
    if state.history.is_empty() {
        println!("  {}\n", "No revision, the file is not controlled".bright_black());
        return Ok(());
    }
    for revision in &state.history {
        println!("  {}", format_revision(revision));
    }
    println!();
    Ok(())
}

fn format_revision(revision: &Revision) -> String {
    let date = revision
        .date
        .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let mut line = format!(
        "{} {} {} {}",
        format!("cs:{:<6}", revision.changeset_number).yellow(),
        date.bright_black(),
        format!("{:<8}", revision.action).blue(),
        revision.user_name.white()
    );
    if !revision.description.is_empty() {
        let summary = revision.description.lines().next().unwrap_or_default();
        line.push_str(&format!("  {}", summary.bright_black()));
    }
    line
}
