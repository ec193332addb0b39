//! One operation scheduled on the provider, executed by its worker.
//!
//! A [`Command`] is built on the thread driving the provider, executed either there or
//! on the worker pool, then drained exactly once by
//! [`Provider::tick`](crate::core::provider::Provider::tick). Everything the worker
//! reads is copied into the command when it is built; the worker writes only to the
//! command's [`CommandOutput`].

use crate::core::operation::Operation;
use crate::core::parsers::changelists::ChangelistListing;
use crate::core::parsers::workspace::WorkspaceInfo;
use crate::core::runner::{RunOutput, Runner};
use crate::core::state::{Branch, Changelist, Changeset, FileState, Lock, INVALID_REVISION};
use crate::core::version::{CliVersion, STATUS_IS_CHECKED_OUT_CHANGED};
use crate::core::workers::Worker;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// Execute on the calling thread and wait until drained
    Synchronous,
    /// Execute on the worker pool; drained by a later tick
    Asynchronous,
}

/// Outcome reported to the completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    Succeeded,
    Failed,
}

impl CommandResult {
    pub fn from_success(success: bool) -> Self {
        if success {
            CommandResult::Succeeded
        } else {
            CommandResult::Failed
        }
    }
}

/// Provider fields copied into a command when it is built.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub workspace_root: String,
    pub workspace_name: String,
    pub repository_name: String,
    pub server_url: String,
    pub branch_name: String,
    pub user_name: String,
    /// `-1` in a partial (Gluon) workspace
    pub changeset: i32,
    pub cli_version: CliVersion,
    /// Whether the provider was connected when the command was built
    pub is_available: bool,
    pub update_status_at_startup: bool,
    pub history_limit: usize,
    /// Cached states of the command files, in the same order
    pub states: Vec<FileState>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            workspace_root: String::new(),
            workspace_name: String::new(),
            repository_name: String::new(),
            server_url: String::new(),
            branch_name: String::new(),
            user_name: String::new(),
            changeset: INVALID_REVISION,
            cli_version: CliVersion::default(),
            is_available: false,
            update_status_at_startup: false,
            history_limit: crate::core::parsers::history::MAX_HISTORY_ENTRIES,
            states: Vec::new(),
        }
    }
}

impl Snapshot {
    pub fn is_partial_workspace(&self) -> bool {
        self.changeset == INVALID_REVISION
    }

    pub fn uses_checked_out_changed(&self) -> bool {
        self.cli_version >= STATUS_IS_CHECKED_OUT_CHANGED
    }

    /// `verb`, or its `partial` variant in a partial workspace.
    pub fn verb(&self, verb: &str) -> String {
        if self.is_partial_workspace() {
            format!("partial {verb}")
        } else {
            verb.to_string()
        }
    }

    pub fn root_rep_spec(&self) -> String {
        format!("{}@{}", self.repository_name, self.server_url)
    }

    pub fn cached_state(&self, path: &str) -> Option<&FileState> {
        self.states
            .iter()
            .find(|state| crate::core::paths::paths_equal_ignore_case(&state.path, path))
    }
}

/// Everything a worker produces, read back when the command is drained.
#[derive(Debug, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub infos: Vec<String>,
    pub errors: Vec<String>,
    /// Message for the user when the operation succeeded
    pub success_message: String,
    pub states: Vec<FileState>,
    /// Directories whose status was taken as a whole
    pub status_directories: Vec<String>,
    /// Files to evict from the cache
    pub removed_files: Vec<String>,
    pub connection_dropped: bool,
    pub workspace_name: Option<String>,
    pub workspace_info: Option<WorkspaceInfo>,
    pub changeset: Option<i32>,
    pub user_name: Option<String>,
    pub changelists: Option<ChangelistListing>,
    pub branches: Vec<Branch>,
    pub changesets: Vec<Changeset>,
    pub locks: Vec<Lock>,
}

impl CommandOutput {
    /// Keep the messages of `run` and return its success flag.
    pub fn absorb(&mut self, run: RunOutput) -> bool {
        self.infos.extend(run.lines);
        self.errors.extend(run.errors);
        run.success
    }
}

pub struct Command {
    pub id: u64,
    pub operation: Operation,
    pub worker: &'static Worker,
    pub concurrency: Concurrency,
    pub files: Vec<String>,
    pub changelist: Option<Changelist>,
    pub snapshot: Snapshot,
    runner: Runner,
    output: Mutex<CommandOutput>,
    execute_processed: AtomicBool,
    created: Instant,
}

impl Command {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        operation: Operation,
        worker: &'static Worker,
        concurrency: Concurrency,
        files: Vec<String>,
        changelist: Option<Changelist>,
        snapshot: Snapshot,
        runner: Runner,
    ) -> Self {
        Self {
            id,
            operation,
            worker,
            concurrency,
            files,
            changelist,
            snapshot,
            runner,
            output: Mutex::new(CommandOutput::default()),
            execute_processed: AtomicBool::new(false),
            created: Instant::now(),
        }
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Run the worker, then flag the command as processed.
    ///
    /// Must be called once per command.
    pub fn run(&self) -> bool {
        let success = {
            let mut output = self.output.lock();
            let success = (self.worker.execute)(self, &mut output);
            output.success = success;
            success
        };
        self.execute_processed.store(true, Ordering::Release);
        success
    }

    pub fn is_processed(&self) -> bool {
        self.execute_processed.load(Ordering::Acquire)
    }

    pub fn output(&self) -> MutexGuard<'_, CommandOutput> {
        self.output.lock()
    }

    pub fn elapsed(&self) -> Duration {
        self.created.elapsed()
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("operation", &self.operation.name())
            .field("files", &self.files.len())
            .field("processed", &self.is_processed())
            .finish()
    }
}
