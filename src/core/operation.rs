//! Source control operations the provider can run.
//!
//! An [`Operation`] carries the parameters of one request. Its [`OperationKind`] selects
//! the worker that runs it.

use crate::core::state::Changeset;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Connect,
    CheckOut,
    CheckIn,
    MarkForAdd,
    Delete,
    Revert,
    RevertUnchanged,
    RevertAll,
    MakeWorkspace,
    UpdateStatus,
    Copy,
    Sync,
    Resolve,
    GetPendingChangelists,
    NewChangelist,
    DeleteChangelist,
    MoveToChangelist,
    GetBranches,
    SwitchToBranch,
    GetChangesets,
    GetChangesetFiles,
    GetLocks,
    Unlock,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Connect => "Connect",
            OperationKind::CheckOut => "CheckOut",
            OperationKind::CheckIn => "CheckIn",
            OperationKind::MarkForAdd => "MarkForAdd",
            OperationKind::Delete => "Delete",
            OperationKind::Revert => "Revert",
            OperationKind::RevertUnchanged => "RevertUnchanged",
            OperationKind::RevertAll => "RevertAll",
            OperationKind::MakeWorkspace => "MakeWorkspace",
            OperationKind::UpdateStatus => "UpdateStatus",
            OperationKind::Copy => "Copy",
            OperationKind::Sync => "Sync",
            OperationKind::Resolve => "Resolve",
            OperationKind::GetPendingChangelists => "GetPendingChangelists",
            OperationKind::NewChangelist => "NewChangelist",
            OperationKind::DeleteChangelist => "DeleteChangelist",
            OperationKind::MoveToChangelist => "MoveToChangelist",
            OperationKind::GetBranches => "GetBranches",
            OperationKind::SwitchToBranch => "SwitchToBranch",
            OperationKind::GetChangesets => "GetChangesets",
            OperationKind::GetChangesetFiles => "GetChangesetFiles",
            OperationKind::GetLocks => "GetLocks",
            OperationKind::Unlock => "Unlock",
        }
    }

    /// Operations allowed before a workspace has been found.
    pub fn is_allowed_without_workspace(&self) -> bool {
        matches!(self, OperationKind::Connect | OperationKind::MakeWorkspace)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Connect,
    CheckOut,
    CheckIn {
        description: String,
    },
    MarkForAdd,
    Delete,
    Revert {
        /// Undo the checkout but keep the local changes
        keep_changes: bool,
    },
    RevertUnchanged,
    RevertAll,
    MakeWorkspace {
        workspace_name: String,
        repository_name: String,
        server_url: String,
    },
    UpdateStatus {
        /// Also fetch the full history of each file
        update_history: bool,
        /// Status of the whole workspace instead of the given files
        whole_workspace: bool,
    },
    /// Record the move of the single command file to `destination`
    Copy {
        destination: String,
    },
    Sync,
    Resolve,
    GetPendingChangelists,
    NewChangelist {
        description: String,
    },
    DeleteChangelist,
    MoveToChangelist,
    GetBranches {
        from_date: Option<DateTime<Utc>>,
    },
    SwitchToBranch {
        branch_name: String,
    },
    GetChangesets {
        from_date: Option<DateTime<Utc>>,
    },
    GetChangesetFiles {
        changeset: Changeset,
    },
    GetLocks,
    Unlock {
        lock_ids: Vec<i32>,
        /// Remove the lock entirely rather than releasing it
        remove: bool,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Connect => OperationKind::Connect,
            Operation::CheckOut => OperationKind::CheckOut,
            Operation::CheckIn { .. } => OperationKind::CheckIn,
            Operation::MarkForAdd => OperationKind::MarkForAdd,
            Operation::Delete => OperationKind::Delete,
            Operation::Revert { .. } => OperationKind::Revert,
            Operation::RevertUnchanged => OperationKind::RevertUnchanged,
            Operation::RevertAll => OperationKind::RevertAll,
            Operation::MakeWorkspace { .. } => OperationKind::MakeWorkspace,
            Operation::UpdateStatus { .. } => OperationKind::UpdateStatus,
            Operation::Copy { .. } => OperationKind::Copy,
            Operation::Sync => OperationKind::Sync,
            Operation::Resolve => OperationKind::Resolve,
            Operation::GetPendingChangelists => OperationKind::GetPendingChangelists,
            Operation::NewChangelist { .. } => OperationKind::NewChangelist,
            Operation::DeleteChangelist => OperationKind::DeleteChangelist,
            Operation::MoveToChangelist => OperationKind::MoveToChangelist,
            Operation::GetBranches { .. } => OperationKind::GetBranches,
            Operation::SwitchToBranch { .. } => OperationKind::SwitchToBranch,
            Operation::GetChangesets { .. } => OperationKind::GetChangesets,
            Operation::GetChangesetFiles { .. } => OperationKind::GetChangesetFiles,
            Operation::GetLocks => OperationKind::GetLocks,
            Operation::Unlock { .. } => OperationKind::Unlock,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn status_update() -> Self {
        Operation::UpdateStatus {
            update_history: false,
            whole_workspace: false,
        }
    }
}
