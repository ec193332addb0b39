//! Pending changelists and the shelves attached to them.

use super::{child, child_text, elements, parse_date, parse_document, split_fields};
use crate::core::error::Result;
use crate::core::paths::to_absolute;
use crate::core::shell::atoi;
use crate::core::state::{Changelist, ChangelistState, FileState, Revision};
use crate::core::workspace_state::WorkspaceState;

/// Changelists with the files of each, at the same index.
pub type ChangelistListing = (Vec<ChangelistState>, Vec<Vec<FileState>>);

/// Parse `cm status --changelists --controlledchanged --noheader --xml`.
///
/// ```xml
/// <StatusOutput>
///   <WkConfigType>Branch</WkConfigType>
///   <Changelists>
///     <Changelist>
///       <Name>Default</Name>
///       <Description>Default changelist</Description>
///       <Changes>
///         <Change><Type>CO</Type><Path>Project.uproject</Path><OldPath /></Change>
///       </Changes>
///     </Changelist>
///   </Changelists>
/// </StatusOutput>
/// ```
///
/// The listing always starts with the default changelist, even when the CLI has none.
pub fn parse_changelists(
    xml: &str,
    workspace_root: &str,
    uses_checked_out_changed: bool,
) -> Result<ChangelistListing> {
    let document = parse_document(xml, "StatusOutput")?;

    let mut changelists: Vec<ChangelistState> = Vec::new();
    let mut files_per_changelist: Vec<Vec<FileState>> = Vec::new();

    if let Some(changelists_node) = child(document.root_element(), "Changelists") {
        for node in elements(changelists_node) {
            let (Some(name), Some(description), Some(changes)) = (
                child_text(node, "Name"),
                child_text(node, "Description"),
                child(node, "Changes"),
            ) else {
                continue;
            };

            let changelist = Changelist::new(name);
            let description = if changelist.is_default() {
                String::new()
            } else {
                description
            };

            let mut files: Vec<FileState> = Vec::new();
            for change in elements(changes) {
                let Some(path) = child_text(change, "Path") else {
                    continue;
                };
                let mut file_state = FileState::new(to_absolute(workspace_root, &path));
                file_state.changelist = Some(changelist.clone());
                if let Some(code) = child_text(change, "Type") {
                    file_state.state =
                        WorkspaceState::from_status_code(&code, uses_checked_out_changed);
                }
                if file_state.state == WorkspaceState::Moved {
                    if let Some(old_path) = child_text(change, "OldPath") {
                        file_state.moved_from = to_absolute(workspace_root, &old_path);
                    }
                }

                // A moved file is listed twice; the second entry carries the move.
                match files.iter_mut().find(|existing| existing.path == file_state.path) {
                    Some(existing) => {
                        existing.state = file_state.state;
                        existing.moved_from = file_state.moved_from;
                    }
                    None => files.push(file_state),
                }
            }

            let mut state = ChangelistState::with_description(changelist, description);
            state.files = files.iter().map(|file| file.path.clone()).collect();
            changelists.push(state);
            files_per_changelist.push(files);
        }
    }

    if !changelists.iter().any(|state| state.changelist.is_default()) {
        changelists.insert(0, ChangelistState::new(Changelist::default_changelist()));
        files_per_changelist.insert(0, Vec::new());
    }

    Ok((changelists, files_per_changelist))
}

/// Attach the shelves of `cm find "shelves where owner='me'" --xml` to their changelist.
///
/// A shelve belongs to a changelist when its comment starts with `Changelist<name>: `.
pub fn parse_shelves(xml: &str, changelists: &mut [ChangelistState]) -> Result<()> {
    let document = parse_document(xml, "PLASTICQUERY")?;

    for shelve in elements(document.root_element()) {
        let (Some(shelve_id), Some(comment)) =
            (child_text(shelve, "SHELVEID"), child_text(shelve, "COMMENT"))
        else {
            continue;
        };

        for changelist in changelists.iter_mut() {
            let prefix = format!("Changelist{}: ", changelist.changelist.name);
            if comment.starts_with(&prefix) {
                changelist.shelve_id = Some(atoi(&shelve_id));
                changelist.shelve_date = child_text(shelve, "DATE").and_then(|date| parse_date(&date));
            }
        }
    }

    Ok(())
}

/// Parse `cm diff sh:<id> --format="{status};{baserevid};{path}"` into the shelved files.
///
/// ```text
/// C;266;"Content\BP_Renamed.uasset"
/// M;-1;"Content\BP_Renamed.uasset"
/// ```
/// Returns false when a line could not be understood; the other lines are still used.
pub fn parse_shelve_diff(
    workspace_root: &str,
    lines: &[String],
    changelist: &mut ChangelistState,
) -> bool {
    let mut all_parsed = true;
    changelist.shelved_files.clear();

    for line in lines {
        let fields = split_fields(line);
        let [status, base_revision, path] = fields.as_slice() else {
            log::warn!("Unexpected shelve diff line '{line}'");
            all_parsed = false;
            continue;
        };
        let mut status_chars = status.chars();
        let (Some(status), None) = (status_chars.next(), status_chars.next()) else {
            all_parsed = false;
            continue;
        };

        let state = WorkspaceState::from_shelve_status(status);
        let path: &str = path;
        let path = path.strip_prefix('"').unwrap_or(path);
        let path = path.strip_suffix('"').unwrap_or(path);
        if state == WorkspaceState::Unknown || path.is_empty() {
            all_parsed = false;
            continue;
        }
        let path = to_absolute(workspace_root, path);

        if let Some(existing) = changelist
            .shelved_files
            .iter_mut()
            .find(|existing| existing.path == path)
        {
            existing.state = state;
            for revision in &mut existing.history {
                revision.action = state.to_action().to_string();
            }
            continue;
        }

        let mut shelved = FileState::with_state(path.clone(), state);
        shelved.history.push(Revision {
            filename: path,
            action: state.to_action().to_string(),
            revision_id: atoi(base_revision),
            ..Revision::default()
        });
        changelist.shelved_files.push(shelved);
    }

    all_parsed
}
