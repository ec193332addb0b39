use crate::core::{
    cache::StateCache,
    colors::format_file_state,
    command_init::CommandInit,
    error::Result,
    operation::Operation,
    output::{print_json, print_section_header},
    state::{ChangelistState, FileState},
};
use colored::*;
use serde::Serialize;

#[derive(Serialize)]
struct ChangelistView<'a> {
    name: &'a str,
    description: &'a str,
    files: Vec<&'a FileState>,
    shelve_id: Option<i32>,
    shelved_files: &'a [FileState],
}

/// List pending changelists with their files and shelves.
pub fn execute_changelists(json: bool) -> Result<()> {
    let mut context = CommandInit::initialize()?;
    context.run(Operation::GetPendingChangelists, &[])?;

    let provider = &context.provider;
    let root = provider.workspace_root().unwrap_or_default();
    let views: Vec<ChangelistView> = provider
        .cache()
        .changelists()
        .into_iter()
        .map(|changelist| view(changelist, provider.cache()))
        .collect();

    if json {
        return print_json(&views);
    }
    for changelist in &views {
        print_section_header(&format_title(changelist));
        if changelist.files.is_empty() {
            println!("  {}", "(empty)".bright_black());
        }
        for state in &changelist.files {
            println!("  {}", format_file_state(state, root));
        }
        if let Some(shelve_id) = changelist.shelve_id {
            println!(
                "  {}",
                format!("shelved as sh:{shelve_id}, {} file(s)", changelist.shelved_files.len()).bright_black()
            );
        }
    }
    println!();
    Ok(())
}

fn view<'a>(changelist: &'a ChangelistState, cache: &'a StateCache) -> ChangelistView<'a> {
    ChangelistView {
        name: &changelist.changelist.name,
        description: &changelist.description,
        files: changelist.files.iter().filter_map(|path| cache.get(path)).collect(),
        shelve_id: changelist.shelve_id,
        shelved_files: &changelist.shelved_files,
    }
}

fn format_title(changelist: &ChangelistView) -> String {
    if changelist.description.is_empty() {
        changelist.name.to_string()
    } else {
        format!("{} ({})", changelist.name, changelist.description)
    }
}
