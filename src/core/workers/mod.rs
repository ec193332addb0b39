//! Static table of workers, one per [`OperationKind`].
//!
//! A worker is a pair of functions. `execute` runs the `cm` commands of an operation,
//! on any thread, and records what it learned on the [`CommandOutput`]. `update_states`
//! runs on the thread driving the provider, once the command is drained, and is the
//! only place where results reach the [`StateCache`].

mod changelists;
mod checkin;
mod connect;
mod edit;
mod query;
mod status;
mod sync;

use crate::core::cache::StateCache;
use crate::core::command::{Command, CommandOutput};
use crate::core::operation::OperationKind;

pub type ExecuteFn = fn(&Command, &mut CommandOutput) -> bool;
pub type UpdateStatesFn = fn(&Command, &mut CommandOutput, &mut StateCache) -> bool;

pub struct Worker {
    pub kind: OperationKind,
    pub execute: ExecuteFn,
    /// Returns whether the cache changed
    pub update_states: UpdateStatesFn,
}

impl Worker {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const fn worker(kind: OperationKind, execute: ExecuteFn, update_states: UpdateStatesFn) -> Worker {
    Worker {
        kind,
        execute,
        update_states,
    }
}

pub static WORKERS: &[Worker] = &[
    worker(OperationKind::Connect, connect::execute_connect, update_cached_states),
    worker(OperationKind::MakeWorkspace, connect::execute_make_workspace, no_update),
    worker(OperationKind::CheckOut, edit::execute_checkout, update_cached_states),
    worker(OperationKind::MarkForAdd, edit::execute_mark_for_add, update_cached_states),
    worker(OperationKind::Delete, edit::execute_delete, update_cached_states),
    worker(OperationKind::Revert, edit::execute_revert, update_cached_states),
    worker(OperationKind::RevertUnchanged, edit::execute_revert_unchanged, update_cached_states),
    worker(OperationKind::RevertAll, edit::execute_revert_all, update_cached_states),
    worker(OperationKind::Copy, edit::execute_copy, update_cached_states),
    worker(OperationKind::Resolve, edit::execute_resolve, update_cached_states),
    worker(OperationKind::CheckIn, checkin::execute_checkin, update_cached_states),
    worker(OperationKind::UpdateStatus, status::execute_update_status, update_cached_states),
    worker(OperationKind::Sync, sync::execute_sync, update_cached_states),
    worker(OperationKind::SwitchToBranch, sync::execute_switch_to_branch, update_cached_states),
    worker(
        OperationKind::GetPendingChangelists,
        changelists::execute_get_pending_changelists,
        changelists::update_changelists,
    ),
    worker(
        OperationKind::NewChangelist,
        changelists::execute_new_changelist,
        changelists::update_changelists,
    ),
    worker(
        OperationKind::DeleteChangelist,
        changelists::execute_delete_changelist,
        changelists::update_changelists,
    ),
    worker(
        OperationKind::MoveToChangelist,
        changelists::execute_move_to_changelist,
        changelists::update_changelists,
    ),
    worker(OperationKind::GetBranches, query::execute_get_branches, no_update),
    worker(OperationKind::GetChangesets, query::execute_get_changesets, no_update),
    worker(
        OperationKind::GetChangesetFiles,
        query::execute_get_changeset_files,
        no_update,
    ),
    worker(OperationKind::GetLocks, query::execute_get_locks, no_update),
    worker(OperationKind::Unlock, query::execute_unlock, update_cached_states),
];

pub fn find_worker(kind: OperationKind) -> Option<&'static Worker> {
    WORKERS.iter().find(|worker| worker.kind == kind)
}

/// Merge the states of the output into the cache.
///
/// Directories queried as a whole are reconciled first, then the files to evict are
/// removed.
pub fn update_cached_states(
    _command: &Command,
    output: &mut CommandOutput,
    cache: &mut StateCache,
) -> bool {
    let mut changed = false;
    for directory in &output.status_directories {
        changed |= cache.reconcile_directory(directory, &output.states);
    }
    changed |= cache.merge(&output.states);
    for file in &output.removed_files {
        changed |= cache.remove(file);
    }
    changed
}

pub fn no_update(_command: &Command, _output: &mut CommandOutput, _cache: &mut StateCache) -> bool {
    false
}
