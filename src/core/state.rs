//! Typed records produced by the parsers and kept in the state cache.
//!
//! # Public API
//! - [`FileState`]: Last known state of one workspace item
//! - [`Revision`]: One entry of an item history
//! - [`Changelist`] / [`ChangelistState`]: Named groups of pending changes
//! - [`Lock`], [`Branch`], [`Changeset`]: Records of the query commands

use crate::core::workspace_state::WorkspaceState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Changeset number used before anything is known
pub const INVALID_REVISION: i32 = -1;

/// Merge in progress on one item, as reported by a dry-run merge
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PendingMerge {
    /// Server path of the conflicting item
    pub filename: String,
    pub base_changeset: String,
    pub source_changeset: String,
    /// Merge source and options, replayed by the resolve command
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub filename: String,
    /// Revision spec such as `cs:12`, or `cs:12@xlinked-repo`
    pub revision: String,
    pub changeset_number: i32,
    /// Base revision id of a shelved change
    pub revision_id: i32,
    pub description: String,
    pub user_name: String,
    pub date: Option<DateTime<Utc>>,
    pub action: String,
    pub branch: String,
    pub file_size: i64,
}

impl Default for Revision {
    fn default() -> Self {
        Self {
            filename: String::new(),
            revision: String::new(),
            changeset_number: INVALID_REVISION,
            revision_id: INVALID_REVISION,
            description: String::new(),
            user_name: String::new(),
            date: None,
            action: String::new(),
            branch: String::new(),
            file_size: 0,
        }
    }
}

/// A pending changelist; one reserved name denotes the default changelist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Changelist {
    pub name: String,
}

impl Changelist {
    pub const DEFAULT_NAME: &'static str = "Default";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn default_changelist() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }

    pub fn is_default(&self) -> bool {
        self.name == Self::DEFAULT_NAME
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileState {
    /// Absolute path with forward slashes
    pub path: String,
    pub state: WorkspaceState,
    pub local_revision: i32,
    pub depot_revision: i32,
    /// `repository@server` the item belongs to
    pub rep_spec: String,
    pub moved_from: String,
    pub locked_by: String,
    pub retained_by: String,
    pub locked_where: String,
    pub locked_branch: String,
    pub locked_id: Option<i32>,
    pub locked_date: Option<DateTime<Utc>>,
    pub pending_merge: Option<PendingMerge>,
    pub head_branch: String,
    pub head_action: String,
    pub head_changelist: i32,
    pub head_user: String,
    pub head_mod_time: i64,
    pub changelist: Option<Changelist>,
    /// Most recent revision first
    pub history: Vec<Revision>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl FileState {
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_state(path, WorkspaceState::Unknown)
    }

    pub fn with_state(path: impl Into<String>, state: WorkspaceState) -> Self {
        Self {
            path: path.into(),
            state,
            local_revision: INVALID_REVISION,
            depot_revision: INVALID_REVISION,
            rep_spec: String::new(),
            moved_from: String::new(),
            locked_by: String::new(),
            retained_by: String::new(),
            locked_where: String::new(),
            locked_branch: String::new(),
            locked_id: None,
            locked_date: None,
            pending_merge: None,
            head_branch: String::new(),
            head_action: String::new(),
            head_changelist: INVALID_REVISION,
            head_user: String::new(),
            head_mod_time: 0,
            changelist: None,
            history: Vec::new(),
            timestamp: None,
        }
    }

    pub fn filename(&self) -> &str {
        &self.path
    }

    /// Locked by someone else, or by the same user from another workspace.
    pub fn is_checked_out_other(&self, user_name: &str, workspace_name: &str) -> bool {
        !self.locked_by.is_empty()
            && (self.locked_by != user_name || self.locked_where != workspace_name)
    }

    /// Whether the workspace has the latest revision of the item
    pub fn is_current(&self) -> bool {
        self.local_revision == self.depot_revision
    }

    /// A more recent revision exists on another branch
    pub fn is_modified_in_other_branch(&self) -> bool {
        !self.head_branch.is_empty()
    }

    pub fn is_conflicted(&self) -> bool {
        self.state == WorkspaceState::Conflicted
    }

    pub fn can_checkout(&self, user_name: &str, workspace_name: &str) -> bool {
        self.state.can_checkout() && !self.is_checked_out_other(user_name, workspace_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelistState {
    pub changelist: Changelist,
    pub description: String,
    /// Paths of the member files
    pub files: Vec<String>,
    pub shelve_id: Option<i32>,
    pub shelve_date: Option<DateTime<Utc>>,
    pub shelved_files: Vec<FileState>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChangelistState {
    pub fn new(changelist: Changelist) -> Self {
        Self::with_description(changelist, String::new())
    }

    pub fn with_description(changelist: Changelist, description: impl Into<String>) -> Self {
        Self {
            changelist,
            description: description.into(),
            files: Vec::new(),
            shelve_id: None,
            shelve_date: None,
            shelved_files: Vec::new(),
            timestamp: None,
        }
    }
}

/// A smart lock as listed by `cm lock list`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lock {
    pub item_id: i32,
    /// Server path of the locked item
    pub path: String,
    pub owner: String,
    pub workspace: String,
    pub branch: String,
    pub destination_branch: String,
    pub status: String,
    pub is_locked: bool,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub repository: String,
    pub created_by: String,
    pub date: Option<DateTime<Utc>>,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Changeset {
    pub changeset_id: i32,
    pub comment: String,
    pub branch: String,
    pub created_by: String,
    pub date: Option<DateTime<Utc>>,
    pub files: Vec<FileState>,
}
