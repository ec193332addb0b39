//! Type-safe Plastic SCM workspace state enumeration.
//!
//! This module defines [`WorkspaceState`], the state of one item of a workspace as
//! reported by the various `cm` commands, and the tables mapping CLI status codes to it.
//!
//! # Public API
//! - [`WorkspaceState`]: Main enumeration for all workspace item states
//!
//! # Status codes
//! `cm status --machinereadable` reports 2 to 8 letter codes such as `CO`, `CO+CH`,
//! `MV`, `CO+RP+MV` or `AD+LD`. The code table in [`WorkspaceState::from_status_code`]
//! is the authoritative contract; anything it does not know maps to
//! [`WorkspaceState::Unknown`] with a warning.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Action names used in revision histories, after the Perforce vocabulary.
pub mod action {
    pub const ADDED: &str = "add";
    pub const DELETED: &str = "delete";
    pub const MOVED: &str = "branch";
    pub const MERGED: &str = "integrate";
    pub const CHANGED: &str = "edit";
}

/// State of a workspace item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkspaceState {
    /// Not yet queried, or an unrecognized status code
    #[default]
    Unknown,
    /// Private item matched by an ignore rule (IG)
    Ignored,
    /// Controlled and unchanged, the default for items absent from a status report
    Controlled,
    /// Checked-out with changes (CO+CH, or CO on an old CLI)
    CheckedOutChanged,
    /// Checked-out without changes (CO on a recent CLI)
    CheckedOutUnchanged,
    /// Added to source control (AD)
    Added,
    /// Moved or renamed (MV)
    Moved,
    /// Copied (CP)
    Copied,
    /// Replaced by a merge (RP)
    Replaced,
    /// Removed from source control (DE)
    Deleted,
    /// Missing from disk (LD)
    LocallyDeleted,
    /// Changed on disk without a checkout (CH)
    Changed,
    /// Pending merge conflict
    Conflicted,
    /// Not controlled (PR), or locally moved (LM)
    Private,
}

impl WorkspaceState {
    /// Interpret the status code of one `cm status` line.
    ///
    /// `uses_checked_out_changed` tells whether the CLI distinguishes `CO` from `CO+CH`;
    /// older clients only report `CO`, which must then be assumed changed.
    pub fn from_status_code(code: &str, uses_checked_out_changed: bool) -> Self {
        if code == "CH" {
            WorkspaceState::Changed
        } else if code == "CO" {
            if uses_checked_out_changed {
                WorkspaceState::CheckedOutUnchanged
            } else {
                WorkspaceState::CheckedOutChanged
            }
        } else if code == "CO+CH" {
            WorkspaceState::CheckedOutChanged
        } else if code.contains("CP") {
            // "CP", "CO+CP"
            WorkspaceState::Copied
        } else if code.contains("MV") {
            // "MV", "CO+MV", "CO+CH+MV", "CO+RP+MV"
            WorkspaceState::Moved
        } else if code.contains("RP") {
            // "RP", "CO+RP", "CO+RP+CH", "CO+CH+RP"
            WorkspaceState::Replaced
        } else if code == "AD" {
            WorkspaceState::Added
        } else if code == "PR" || code == "LM" {
            WorkspaceState::Private
        } else if code == "IG" {
            WorkspaceState::Ignored
        } else if code == "DE" {
            WorkspaceState::Deleted
        } else if code.contains("LD") {
            // "LD", "AD+LD"
            WorkspaceState::LocallyDeleted
        } else {
            log::warn!("Unknown file status '{code}'");
            WorkspaceState::Unknown
        }
    }

    /// Interpret the one letter status of a `cm diff sh:<id>` line.
    pub fn from_shelve_status(status: char) -> Self {
        match status {
            'A' => WorkspaceState::Added,
            'D' => WorkspaceState::Deleted,
            'C' => WorkspaceState::CheckedOutChanged,
            'M' => WorkspaceState::Moved,
            other => {
                log::warn!("Unknown file status '{other}'");
                WorkspaceState::Unknown
            }
        }
    }

    /// Interpret the `<Type>` of a change in a `cm log --xml` report.
    pub fn from_change_type(change_type: &str) -> Self {
        match change_type {
            "Changed" => WorkspaceState::CheckedOutChanged,
            "Added" => WorkspaceState::Added,
            "Moved" => WorkspaceState::Moved,
            "Deleted" => WorkspaceState::Deleted,
            _ => WorkspaceState::Unknown,
        }
    }

    /// History action name for this state
    pub fn to_action(&self) -> &'static str {
        match self {
            WorkspaceState::Added => action::ADDED,
            WorkspaceState::Deleted => action::DELETED,
            WorkspaceState::Moved | WorkspaceState::Copied => action::MOVED,
            WorkspaceState::Replaced => action::MERGED,
            _ => action::CHANGED,
        }
    }

    /// Short code for display, close to the CLI ones
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceState::Unknown => "??",
            WorkspaceState::Ignored => "IG",
            WorkspaceState::Controlled => "",
            WorkspaceState::CheckedOutChanged => "CO+CH",
            WorkspaceState::CheckedOutUnchanged => "CO",
            WorkspaceState::Added => "AD",
            WorkspaceState::Moved => "MV",
            WorkspaceState::Copied => "CP",
            WorkspaceState::Replaced => "RP",
            WorkspaceState::Deleted => "DE",
            WorkspaceState::LocallyDeleted => "LD",
            WorkspaceState::Changed => "CH",
            WorkspaceState::Conflicted => "CF",
            WorkspaceState::Private => "PR",
        }
    }

    /// Get human-readable description for state
    pub fn description(&self) -> &'static str {
        match self {
            WorkspaceState::Unknown => "unknown",
            WorkspaceState::Ignored => "ignored",
            WorkspaceState::Controlled => "controlled",
            WorkspaceState::CheckedOutChanged => "checked-out",
            WorkspaceState::CheckedOutUnchanged => "checked-out (unchanged)",
            WorkspaceState::Added => "added",
            WorkspaceState::Moved => "moved",
            WorkspaceState::Copied => "copied",
            WorkspaceState::Replaced => "replaced",
            WorkspaceState::Deleted => "deleted",
            WorkspaceState::LocallyDeleted => "locally deleted",
            WorkspaceState::Changed => "changed",
            WorkspaceState::Conflicted => "conflicted",
            WorkspaceState::Private => "private",
        }
    }

    pub fn is_source_controlled(&self) -> bool {
        !matches!(
            self,
            WorkspaceState::Private | WorkspaceState::Ignored | WorkspaceState::Unknown
        )
    }

    pub fn is_checked_out(&self) -> bool {
        matches!(
            self,
            WorkspaceState::CheckedOutChanged
                | WorkspaceState::CheckedOutUnchanged
                | WorkspaceState::Added
                | WorkspaceState::Moved
                | WorkspaceState::Copied
                | WorkspaceState::Replaced
                | WorkspaceState::Deleted
                | WorkspaceState::Conflicted
        )
    }

    /// States that carry something to check in
    pub fn is_modified(&self) -> bool {
        matches!(
            self,
            WorkspaceState::CheckedOutChanged
                | WorkspaceState::Added
                | WorkspaceState::Moved
                | WorkspaceState::Copied
                | WorkspaceState::Replaced
                | WorkspaceState::Deleted
                | WorkspaceState::LocallyDeleted
                | WorkspaceState::Changed
                | WorkspaceState::Conflicted
        )
    }

    pub fn is_deleted(&self) -> bool {
        matches!(
            self,
            WorkspaceState::Deleted | WorkspaceState::LocallyDeleted
        )
    }

    pub fn can_checkout(&self) -> bool {
        matches!(self, WorkspaceState::Controlled | WorkspaceState::Changed)
    }

    pub fn can_add(&self) -> bool {
        *self == WorkspaceState::Private
    }

    /// Sort priority for status display: conflicts first, then pending changes
    pub fn sort_priority(&self) -> u8 {
        match self {
            WorkspaceState::Conflicted => 0,
            WorkspaceState::CheckedOutChanged => 1,
            WorkspaceState::Added => 2,
            WorkspaceState::Moved | WorkspaceState::Copied | WorkspaceState::Replaced => 3,
            WorkspaceState::Deleted | WorkspaceState::LocallyDeleted => 4,
            WorkspaceState::Changed => 5,
            WorkspaceState::CheckedOutUnchanged => 6,
            WorkspaceState::Private => 7,
            WorkspaceState::Ignored => 8,
            WorkspaceState::Controlled => 9,
            WorkspaceState::Unknown => 10,
        }
    }
}

impl fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
