//! `cm status --machinereadable --fieldseparator=";"` output.
//!
//! ```text
//! STATUS;41;UEPlasticPluginDev;localhost:8087
//! CO+CH;c:\Workspace\Content\A.uasset;False;NO_MERGES
//! MV;100%;c:\Workspace\Content\Old.uasset;c:\Workspace\Content\New.uasset;False;NO_MERGES
//! ```

use super::split_fields;
use crate::core::paths::{is_under_directory, normalize_path, path_key};
use crate::core::state::FileState;
use crate::core::workspace_state::WorkspaceState;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Error reported when a status targets items outside of the workspace
pub const NOT_IN_WORKSPACE_ERROR: &str = "is not in a workspace.";

const MIN_STATUS_FIELDS: usize = 4;

/// Start of the header line heading each status reply
const STATUS_HEADER_PREFIX: &str = "STATUS;";

/// Parse one status line. A line with too few fields gives a state with an empty path.
pub fn parse_status_line(line: &str, uses_checked_out_changed: bool) -> FileState {
    let fields = split_fields(line);
    if fields.len() < MIN_STATUS_FIELDS {
        log::warn!("Unexpected status line '{line}'");
        return FileState::new("");
    }

    let state = WorkspaceState::from_status_code(fields[0], uses_checked_out_changed);
    if state == WorkspaceState::Moved {
        let mut file_state = FileState::with_state(normalize_path(fields[3]), state);
        file_state.moved_from = normalize_path(fields[2]);
        file_state
    } else {
        FileState::with_state(normalize_path(fields[1]), state)
    }
}

/// States of the explicitly requested `files`, in the same order.
///
/// A file absent from the output is unchanged if it exists on disk, otherwise it is new
/// content never saved yet.
pub fn parse_file_status(
    files: &[String],
    lines: &[String],
    uses_checked_out_changed: bool,
) -> Vec<FileState> {
    let reported: HashMap<String, FileState> = lines
        .iter()
        .map(|line| parse_status_line(line, uses_checked_out_changed))
        .filter(|state| !state.path.is_empty())
        .map(|state| (path_key(&state.path), state))
        .collect();

    let states: Vec<FileState> = files
        .iter()
        .map(|file| {
            let mut file_state = FileState::new(normalize_path(file));
            match reported.get(&path_key(file)) {
                Some(found) => {
                    file_state.state = found.state;
                    if found.state == WorkspaceState::Moved {
                        file_state.moved_from = found.moved_from.clone();
                    }
                }
                None if Path::new(file).exists() => file_state.state = WorkspaceState::Controlled,
                None => file_state.state = WorkspaceState::Private,
            }
            file_state
        })
        .collect();

    for state in states.iter().take(20) {
        log::trace!("{} = {}", state.path, state.state.as_str());
    }
    if states.len() > 20 {
        log::trace!("[...] {} more files", states.len() - 20);
    }

    states
}

/// One state per valid line of a whole-directory status.
///
/// Entries cached before the status but no longer reported are found with
/// [`stale_directory_entries`].
pub fn parse_directory_status(lines: &[String], uses_checked_out_changed: bool) -> Vec<FileState> {
    lines
        .iter()
        .map(|line| parse_status_line(line, uses_checked_out_changed))
        .filter(|state| !state.path.is_empty())
        .collect()
}

/// Paths of cached entries under `dir` that a whole-directory status no longer reports.
///
/// Only entries with a meaningful state are considered: `Unknown` and `Controlled`
/// entries have nothing to revert.
pub fn stale_directory_entries<'a>(
    dir: &str,
    cached: impl Iterator<Item = &'a FileState>,
    reported: &[FileState],
) -> Vec<String> {
    let reported: HashSet<String> = reported.iter().map(|state| path_key(&state.path)).collect();

    cached
        .filter(|state| {
            !matches!(state.state, WorkspaceState::Unknown | WorkspaceState::Controlled)
                && is_under_directory(&state.path, dir)
                && !reported.contains(&path_key(&state.path))
        })
        .map(|state| state.path.clone())
        .collect()
}

/// Status lines without their headers. Each batch of a large status has its own.
pub fn without_headers(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| !line.starts_with(STATUS_HEADER_PREFIX))
        .cloned()
        .collect()
}

/// Current changeset from the `STATUS;<changeset>;<repository>;<server>` header.
pub fn parse_changeset_from_header(lines: &[String]) -> Option<i32> {
    let header = lines.first()?;
    let fields = split_fields(header);
    if fields.len() >= MIN_STATUS_FIELDS {
        Some(crate::core::shell::atoi(fields[1]))
    } else {
        None
    }
}

/// Move "not in a workspace" errors to the info messages.
///
/// Returns true when such errors were the only ones, in which case a failed command
/// should be considered successful.
pub fn remove_redundant_errors(errors: &mut Vec<String>, infos: &mut Vec<String>) -> bool {
    let before = errors.len();
    let (redundant, remaining): (Vec<String>, Vec<String>) = errors
        .drain(..)
        .partition(|error| error.contains(NOT_IN_WORKSPACE_ERROR));
    *errors = remaining;
    infos.extend(redundant);

    before > 0 && errors.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn test_parse_checked_out_changed_line() {
        let state = parse_status_line("CO+CH;C:/ws/Content/A.uasset;False;NO_MERGES", true);
        assert_eq!(state.path, "C:/ws/Content/A.uasset");
        assert_eq!(state.state, WorkspaceState::CheckedOutChanged);
        assert!(state.moved_from.is_empty());
    }

    #[test]
    fn test_parse_moved_line() {
        let state = parse_status_line(
            "MV;100%;C:/ws/Content/Old.uasset;C:/ws/Content/New.uasset;False;NO_MERGES",
            true,
        );
        assert_eq!(state.path, "C:/ws/Content/New.uasset");
        assert_eq!(state.state, WorkspaceState::Moved);
        assert_eq!(state.moved_from, "C:/ws/Content/Old.uasset");
    }

    #[test]
    fn test_parse_short_line_gives_empty_path() {
        assert!(parse_status_line("CO;C:/ws/A.uasset", true).path.is_empty());
    }

    #[test]
    fn test_unknown_code_is_not_fatal() {
        let state = parse_status_line("ZZ;C:/ws/A.uasset;False;NO_MERGES", true);
        assert_eq!(state.state, WorkspaceState::Unknown);
        assert_eq!(state.path, "C:/ws/A.uasset");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let output = lines(&[
            "CH;/ws/Changed.uasset;False;NO_MERGES",
            "AD;/ws/Added.uasset;False;NO_MERGES",
        ]);
        assert_eq!(
            parse_directory_status(&output, true),
            parse_directory_status(&output, true)
        );
    }

    #[test]
    fn test_status_codes_round_trip() {
        let cases = [
            ("CH", WorkspaceState::Changed),
            ("CO", WorkspaceState::CheckedOutUnchanged),
            ("CO+CH", WorkspaceState::CheckedOutChanged),
            ("CO+CP", WorkspaceState::Copied),
            ("CO+RP", WorkspaceState::Replaced),
            ("AD", WorkspaceState::Added),
            ("PR", WorkspaceState::Private),
            ("IG", WorkspaceState::Ignored),
            ("DE", WorkspaceState::Deleted),
            ("LD", WorkspaceState::LocallyDeleted),
        ];
        for (code, expected) in cases {
            let line = format!("{code};/ws/File.uasset;False;NO_MERGES");
            assert_eq!(parse_status_line(&line, true).state, expected, "{code}");
        }
    }

    #[test]
    fn test_file_status_defaults_for_unreported_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = crate::core::paths::path_to_string(temp.path());
        let on_disk = format!("{root}/OnDisk.uasset");
        std::fs::write(&on_disk, b"data").unwrap();
        let never_saved = format!("{root}/NeverSaved.uasset");
        let changed = format!("{root}/Changed.uasset");

        let output = vec![format!("CO+CH;{changed};False;NO_MERGES")];
        let files = vec![on_disk.clone(), never_saved.clone(), changed.clone()];
        let states = parse_file_status(&files, &output, true);

        assert_eq!(states.len(), 3);
        assert_eq!(states[0].state, WorkspaceState::Controlled);
        assert_eq!(states[1].state, WorkspaceState::Private);
        assert_eq!(states[2].state, WorkspaceState::CheckedOutChanged);
    }

    #[test]
    fn test_file_status_matches_case_insensitively() {
        let output = lines(&["MV;100%;/ws/old.uasset;/WS/New.uasset;False;NO_MERGES"]);
        let states = parse_file_status(&["/ws/New.uasset".to_string()], &output, true);
        assert_eq!(states[0].path, "/ws/New.uasset");
        assert_eq!(states[0].state, WorkspaceState::Moved);
        assert_eq!(states[0].moved_from, "/ws/old.uasset");
    }

    #[test]
    fn test_directory_status_skips_malformed_lines() {
        let output = lines(&["AD;/ws/A.uasset;False;NO_MERGES", "garbage", ""]);
        let states = parse_directory_status(&output, true);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].state, WorkspaceState::Added);
    }

    #[test]
    fn test_stale_directory_entries() {
        let cached = vec![
            FileState::with_state("/ws/Content/Reverted.uasset", WorkspaceState::CheckedOutChanged),
            FileState::with_state("/ws/Content/Still.uasset", WorkspaceState::Added),
            FileState::with_state("/ws/Content/Plain.uasset", WorkspaceState::Controlled),
            FileState::with_state("/other/Elsewhere.uasset", WorkspaceState::Added),
        ];
        let reported = vec![FileState::with_state(
            "/WS/content/still.uasset",
            WorkspaceState::Added,
        )];

        let stale = stale_directory_entries("/ws", cached.iter(), &reported);
        assert_eq!(stale, vec!["/ws/Content/Reverted.uasset".to_string()]);
    }

    #[test]
    fn test_parse_changeset_from_header() {
        assert_eq!(
            parse_changeset_from_header(&lines(&["STATUS;41;Repo;localhost:8087"])),
            Some(41)
        );
        assert_eq!(
            parse_changeset_from_header(&lines(&["STATUS;-1;Repo;test@cloud"])),
            Some(-1)
        );
        assert_eq!(parse_changeset_from_header(&lines(&["STATUS;41"])), None);
        assert_eq!(parse_changeset_from_header(&[]), None);
    }

    #[test]
    fn test_headers_of_every_batch_are_skipped() {
        let reply = lines(&[
            "STATUS;41;Repo;localhost:8087",
            "CO+CH;/ws/Content/A.uasset;False;NO_MERGES",
            "STATUS;41;Repo;localhost:8087",
            "PR;/ws/Content/B.uasset;False;NO_MERGES",
        ]);
        let entries = without_headers(&reply);
        assert_eq!(entries.len(), 2);

        let states = parse_directory_status(&entries, true);
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].state, WorkspaceState::CheckedOutChanged);
        assert_eq!(states[1].state, WorkspaceState::Private);
    }

    #[test]
    fn test_remove_redundant_errors() {
        let mut errors = lines(&["The selected items /tmp/x is not in a workspace."]);
        let mut infos = Vec::new();
        assert!(remove_redundant_errors(&mut errors, &mut infos));
        assert!(errors.is_empty());
        assert_eq!(infos.len(), 1);

        let mut errors = lines(&["/tmp/x is not in a workspace.", "Server unreachable"]);
        let mut infos = Vec::new();
        assert!(!remove_redundant_errors(&mut errors, &mut infos));
        assert_eq!(errors, lines(&["Server unreachable"]));

        let mut no_errors = Vec::new();
        assert!(!remove_redundant_errors(&mut no_errors, &mut infos));
    }
}
