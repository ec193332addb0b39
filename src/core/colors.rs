//! Color mapping for workspace states.
//!
//! # Public API
//! - [`get_state_color_style`]: Get color function for a workspace state
//! - [`get_aligned_state`]: Status code padded to a fixed width and colored
//! - [`format_file_state`]: Complete file line formatting
//!
//! # Color Scheme
//! - **Checked-out / changed**: Yellow
//! - **Added / copied**: Green
//! - **Deleted / locally deleted**: Red
//! - **Moved / replaced**: Blue
//! - **Private**: Cyan
//! - **Conflicted**: Red bold

use crate::core::state::FileState;
use crate::core::workspace_state::WorkspaceState;
use colored::*;

/// Width of the longest status code, `CO+CH`
const STATE_COLUMN_WIDTH: usize = 5;

pub fn get_state_color_style(state: WorkspaceState) -> Box<dyn Fn(&str) -> ColoredString> {
    match state {
        WorkspaceState::CheckedOutChanged
        | WorkspaceState::CheckedOutUnchanged
        | WorkspaceState::Changed => Box::new(|text: &str| text.yellow()),
        WorkspaceState::Added | WorkspaceState::Copied => Box::new(|text: &str| text.green()),
        WorkspaceState::Deleted | WorkspaceState::LocallyDeleted => Box::new(|text: &str| text.red()),
        WorkspaceState::Moved | WorkspaceState::Replaced => Box::new(|text: &str| text.blue()),
        WorkspaceState::Private => Box::new(|text: &str| text.cyan()),
        WorkspaceState::Conflicted => Box::new(|text: &str| text.red().bold()),
        WorkspaceState::Unknown | WorkspaceState::Ignored | WorkspaceState::Controlled => {
            Box::new(|text: &str| text.bright_black())
        }
    }
}

pub fn get_aligned_state(state: WorkspaceState) -> ColoredString {
    let code = match state.as_str() {
        "" => "--",
        code => code,
    };
    get_state_color_style(state)(&format!("{code:<STATE_COLUMN_WIDTH$}"))
}

/// `CO+CH  Content/A.uasset  (locked by jane)`, paths shown relative to `workspace_root`.
pub fn format_file_state(state: &FileState, workspace_root: &str) -> String {
    let relative = state
        .path
        .strip_prefix(workspace_root)
        .map(|path| path.trim_start_matches('/'))
        .unwrap_or(&state.path);
    let mut line = format!(
        "{}  {}",
        get_aligned_state(state.state),
        get_state_color_style(state.state)(relative)
    );
    if !state.moved_from.is_empty() {
        line.push_str(&format!(" {} {}", "<-".bright_black(), state.moved_from.bright_black()));
    }
    if !state.locked_by.is_empty() {
        line.push_str(&format!("  {}", format!("(locked by {})", state.locked_by).magenta()));
    }
    line
}
