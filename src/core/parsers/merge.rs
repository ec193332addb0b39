//! Merges in progress, workspace updates and checkin results.

use super::{child, child_text, elements, parse_document};
use crate::core::error::{PlasticError, Result};
use crate::core::paths::{normalize_path, WORKSPACE_METADATA_DIR};
use crate::core::state::{FileState, PendingMerge};
use crate::core::workspace_state::WorkspaceState;
use std::path::Path;

/// File written in the metadata directory while a merge is in progress
pub const MERGE_PROGRESS_FILE: &str = "plastic.mergeprogress";

const FILE_CONFLICT_PREFIX: &str = "FILE_CONFLICT ";

/// One `FILE_CONFLICT` line of a dry-run `cm merge --machinereadable`.
///
/// ```text
/// FILE_CONFLICT /Content/BP_Projectile.uasset 1 4 6 903
/// ```
/// reads as: needs to be merged from cs:4 to cs:6, base cs:1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeConflict {
    pub filename: String,
    pub base_changeset: String,
    pub source_changeset: String,
}

impl MergeConflict {
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix(FILE_CONFLICT_PREFIX)?;
        let mut fields = rest.split(' ');
        let filename = fields.next()?.to_string();
        let base_changeset = fields.next()?.to_string();
        let source_changeset = fields.next()?.to_string();
        Some(Self {
            filename,
            base_changeset,
            source_changeset,
        })
    }
}

/// Source spec of the merge in progress, such as `cs:4` or `br:/main/task`.
///
/// The progress file holds `Target: mount:... Source: cs:4 Type: merge`.
pub fn read_merge_source(workspace_root: &Path) -> Option<String> {
    let progress_file = workspace_root
        .join(WORKSPACE_METADATA_DIR)
        .join(MERGE_PROGRESS_FILE);
    let content = std::fs::read_to_string(progress_file).ok()?;
    parse_merge_source(&content)
}

pub fn parse_merge_source(content: &str) -> Option<String> {
    const SOURCE: &str = "Source: ";
    let start = content.find(SOURCE)? + SOURCE.len();
    let source = content[start..].split(' ').next()?.trim();
    (!source.is_empty()).then(|| source.to_string())
}

/// Mark states conflicted by the merge from `source`, matching server paths by suffix.
pub fn apply_merge_conflicts(lines: &[String], source: &str, states: &mut [FileState]) {
    for conflict in lines.iter().filter_map(|line| MergeConflict::parse(line)) {
        log::debug!(
            "MergeConflict.Filename: '{}' base cs:{} source cs:{}",
            conflict.filename,
            conflict.base_changeset,
            conflict.source_changeset
        );
        let suffix = normalize_path(&conflict.filename);
        for state in states.iter_mut().filter(|state| state.path.ends_with(&suffix)) {
            log::info!(
                "{} is pending merge from cs:{} base cs:{}",
                state.path,
                conflict.source_changeset,
                conflict.base_changeset
            );
            state.state = WorkspaceState::Conflicted;
            state.pending_merge = Some(PendingMerge {
                filename: conflict.filename.clone(),
                base_changeset: conflict.base_changeset.clone(),
                source_changeset: conflict.source_changeset.clone(),
                parameters: vec![source.to_string()],
            });
        }
    }
}

/// Files updated by `cm update --xml`.
///
/// ```xml
/// <UpdatedItems><List><UpdatedItem><Path>c:\ws\Content\A.uasset</Path></UpdatedItem></List></UpdatedItems>
/// ```
pub fn parse_update_results(xml: &str) -> Result<Vec<String>> {
    let document = parse_document(xml, "UpdatedItems")?;
    let list = child(document.root_element(), "List")
        .ok_or_else(|| PlasticError::unexpected_xml("List"))?;

    let mut files = Vec::new();
    for item in elements(list) {
        if let Some(path) = child_text(item, "Path") {
            push_unique(&mut files, normalize_path(&path));
        }
    }
    Ok(files)
}

/// Files updated by `cm partial update --report --machinereadable`.
///
/// ```text
/// STAGE Plastic is updating your workspace. Wait a moment, please...
/// AD c:\ws\Content\MI_Solid_Red.uasset
/// CH c:\ws\Config\DefaultEditor.ini
/// ```
pub fn parse_partial_update_results(lines: &[String]) -> Vec<String> {
    let mut files = Vec::new();
    for line in lines.iter().filter(|line| !line.starts_with("STAGE ")) {
        // "AD ", "CH ", "DE "
        if let Some(path) = line.get(3..) {
            push_unique(&mut files, normalize_path(path));
        }
    }
    files
}

/// Message reported after a checkin.
///
/// `Created changeset cs:8@br:/main@MyProject@server (mount:'/')` becomes
/// `Submitted changeset cs:8`; any other last line is returned as is.
pub fn parse_checkin_results(lines: &[String]) -> String {
    const CHANGESET_PREFIX: &str = "Created changeset ";
    let Some(last) = lines.last() else {
        return String::new();
    };

    match last.strip_prefix(CHANGESET_PREFIX) {
        Some(rest) => {
            let changeset = rest.find("@br:").map(|index| &rest[..index]).unwrap_or_default();
            format!("Submitted changeset {changeset}")
        }
        None => last.clone(),
    }
}

fn push_unique(files: &mut Vec<String>, file: String) {
    if !files.contains(&file) {
        files.push(file);
    }
}
