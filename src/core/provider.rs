//! Dispatcher owning the shell, the worker pool and the state cache.
//!
//! The [`Provider`] is driven from a single thread. It builds one [`Command`] per
//! [`Operation`], executes it either inline or on the worker pool, and drains finished
//! commands in submission order from [`Provider::tick`]. Draining is the only place the
//! [`StateCache`] is written, so the cache needs no lock.
//!
//! # Public API
//! - [`Provider::open`]: Settings, shell and root discovery in one call
//! - [`Provider::execute`]: Schedule an operation, with an optional completion callback
//! - [`Provider::run`]: Execute synchronously and collect the [`CommandReport`]
//! - [`Provider::tick`]: Drain at most one finished command
//! - [`Provider::add_listener`]: Get notified when a tick changed something

use crate::core::cache::StateCache;
use crate::core::command::{Command, CommandOutput, CommandResult, Concurrency, Snapshot};
use crate::core::config::Settings;
use crate::core::error::{PlasticError, Result};
use crate::core::operation::{Operation, OperationKind};
use crate::core::paths::{find_root_directory, path_to_string, to_absolute};
use crate::core::queries;
use crate::core::runner::Runner;
use crate::core::shell::{Shell, ShellStats, Transport};
use crate::core::state::{Branch, Changelist, Changeset, FileState, Lock, INVALID_REVISION};
use crate::core::version::{CliVersion, OLDEST_SUPPORTED};
use crate::core::workers::find_worker;
use crossbeam_channel::Receiver;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Delay between two ticks while waiting on a synchronous command
const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub type CompletionCallback = Box<dyn FnOnce(&Operation, CommandResult)>;

struct QueuedCommand {
    command: Arc<Command>,
    callback: Option<CompletionCallback>,
}

/// What a synchronous command leaves for its caller once drained.
#[derive(Debug, Default)]
pub struct CommandReport {
    pub success: bool,
    pub infos: Vec<String>,
    pub errors: Vec<String>,
    pub success_message: String,
    pub branches: Vec<Branch>,
    pub changesets: Vec<Changeset>,
    pub locks: Vec<Lock>,
}

impl CommandReport {
    fn take(output: &mut CommandOutput) -> Self {
        Self {
            success: output.success,
            infos: std::mem::take(&mut output.infos),
            errors: std::mem::take(&mut output.errors),
            success_message: std::mem::take(&mut output.success_message),
            branches: std::mem::take(&mut output.branches),
            changesets: std::mem::take(&mut output.changesets),
            locks: std::mem::take(&mut output.locks),
        }
    }

    fn rejected(message: String) -> Self {
        Self {
            errors: vec![message],
            ..Self::default()
        }
    }
}

pub struct Provider {
    settings: Settings,
    shell: Option<Arc<Shell>>,
    runner: Runner,
    pool: rayon::ThreadPool,
    notices: Option<Receiver<String>>,
    cache: StateCache,
    queue: VecDeque<QueuedCommand>,
    listeners: Vec<Box<dyn FnMut()>>,
    next_command_id: u64,

    start_dir: PathBuf,
    workspace_root: Option<String>,
    workspace_name: String,
    repository_name: String,
    server_url: String,
    branch_name: String,
    user_name: String,
    changeset: i32,
    cli_version: CliVersion,
    cli_available: bool,
    is_available: bool,
}

fn set<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        false
    } else {
        *field = value;
        true
    }
}

impl Provider {
    /// Provider driving a `cm shell` built from `settings`. Call [`init`](Self::init) next.
    pub fn new(settings: Settings) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let shell = Arc::new(Shell::with_notifier(settings.shell_config(), sender));
        let transport: Arc<dyn Transport> = shell.clone();
        let mut provider = Self::build(settings, transport)?;
        provider.shell = Some(shell);
        provider.notices = Some(receiver);
        Ok(provider)
    }

    /// Provider sending its commands through `transport` instead of a `cm shell`.
    pub fn with_transport(settings: Settings, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::build(settings, transport)
    }

    fn build(settings: Settings, transport: Arc<dyn Transport>) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.worker_threads.max(1))
            .thread_name(|index| format!("plastic-worker-{index}"))
            .build()
            .map_err(|e| PlasticError::operation_failed("worker pool", &[e.to_string()]))?;
        let runner = Runner::with_batch_size(transport, settings.max_files_per_batch);

        Ok(Self {
            settings,
            shell: None,
            runner,
            pool,
            notices: None,
            cache: StateCache::new(),
            queue: VecDeque::new(),
            listeners: Vec::new(),
            next_command_id: 1,
            start_dir: PathBuf::from("."),
            workspace_root: None,
            workspace_name: String::new(),
            repository_name: String::new(),
            server_url: String::new(),
            branch_name: String::new(),
            user_name: String::new(),
            changeset: INVALID_REVISION,
            cli_version: CliVersion::default(),
            cli_available: false,
            is_available: false,
        })
    }

    /// Create, initialize and connect a provider for the workspace containing `start_dir`.
    pub fn open(settings: Settings, start_dir: &Path) -> Result<Self> {
        let mut provider = Self::new(settings)?;
        provider.init(start_dir)?;
        if provider.workspace_root.is_none() {
            return Err(PlasticError::workspace_not_found(start_dir));
        }
        provider.run(Operation::Connect, &[], None);
        Ok(provider)
    }

    /// Find the workspace root, launch the shell and check the client version.
    ///
    /// A missing workspace is not an error: only Connect and MakeWorkspace are accepted
    /// until one exists.
    pub fn init(&mut self, start_dir: &Path) -> Result<()> {
        self.start_dir = start_dir.to_path_buf();
        let root = find_root_directory(start_dir);
        match &root {
            Some(root) => log::info!("Workspace root '{}'", root.display()),
            None => log::warn!("No workspace found from '{}'", start_dir.display()),
        }
        self.workspace_root = root.as_deref().map(path_to_string);

        if let Some(shell) = &self.shell {
            let working_dir = root.as_deref().unwrap_or(start_dir);
            if let Err(e) = shell.try_launch(working_dir) {
                self.cli_available = false;
                return Err(e);
            }
        }

        let Some(version) = queries::cli_version(&self.runner) else {
            self.shutdown_shell();
            return Err(PlasticError::CliUnavailable);
        };
        if version < OLDEST_SUPPORTED {
            log::error!("Plastic SCM {version} is not supported, update to {OLDEST_SUPPORTED} or later");
            self.shutdown_shell();
            return Err(PlasticError::unsupported_version(
                version.to_string(),
                OLDEST_SUPPORTED.to_string(),
            ));
        }
        log::info!("Plastic SCM {version}");
        self.cli_version = version;
        self.cli_available = true;

        if let Some(user_name) = queries::whoami(&self.runner) {
            self.user_name = user_name;
        }
        Ok(())
    }

    /// Forget everything and stop the shell. Commands still queued are dropped undrained.
    pub fn close(&mut self) {
        self.queue.clear();
        self.cache.clear();
        self.shutdown_shell();
        self.is_available = false;
        self.changeset = INVALID_REVISION;
    }

    fn shutdown_shell(&mut self) {
        if let Some(shell) = &self.shell {
            shell.terminate();
        }
        self.cli_available = false;
    }

    /// Schedule `operation` on `files`.
    ///
    /// Synchronous commands are executed on the calling thread, which then ticks until
    /// the command is drained; the result is the command's. Asynchronous commands are
    /// queued on the worker pool and the result only tells whether that happened; the
    /// callback receives the actual outcome from a later [`tick`](Self::tick).
    pub fn execute(
        &mut self,
        operation: Operation,
        files: &[String],
        changelist: Option<Changelist>,
        concurrency: Concurrency,
        callback: Option<CompletionCallback>,
    ) -> CommandResult {
        let command = match self.build_command(operation, files, changelist, concurrency) {
            Ok(command) => command,
            Err(message) => {
                log::error!("{message}");
                return CommandResult::Failed;
            }
        };
        self.dispatch(command, callback)
    }

    /// Execute `operation` synchronously and hand back its messages and query results.
    pub fn run(&mut self, operation: Operation, files: &[String], changelist: Option<Changelist>) -> CommandReport {
        let command = match self.build_command(operation, files, changelist, Concurrency::Synchronous) {
            Ok(command) => command,
            Err(message) => {
                log::error!("{message}");
                return CommandReport::rejected(message);
            }
        };
        self.dispatch(command.clone(), None);
        let mut output = command.output();
        CommandReport::take(&mut output)
    }

    fn build_command(
        &mut self,
        operation: Operation,
        files: &[String],
        changelist: Option<Changelist>,
        concurrency: Concurrency,
    ) -> std::result::Result<Arc<Command>, String> {
        let kind = operation.kind();
        if !self.cli_available {
            return Err(format!("{kind}: Plastic SCM command line is not available"));
        }
        let workspace_root = match &self.workspace_root {
            Some(root) => root.clone(),
            None if kind.is_allowed_without_workspace() => path_to_string(&self.start_dir),
            None => return Err(format!("{kind}: not in a Plastic SCM workspace")),
        };
        let worker = find_worker(kind).ok_or_else(|| format!("{kind}: no worker"))?;

        let files: Vec<String> = files
            .iter()
            .map(|file| to_absolute(&workspace_root, file))
            .collect();
        let changelist = match (kind, changelist) {
            (OperationKind::NewChangelist, None) => Some(self.next_changelist()),
            (_, changelist) => changelist,
        };
        let snapshot = self.snapshot(workspace_root, &operation, &files);

        let id = self.next_command_id;
        self.next_command_id += 1;
        Ok(Arc::new(Command::new(
            id,
            operation,
            worker,
            concurrency,
            files,
            changelist,
            snapshot,
            self.runner.clone(),
        )))
    }

    fn snapshot(&self, workspace_root: String, operation: &Operation, files: &[String]) -> Snapshot {
        let mut paths: Vec<&str> = files.iter().map(String::as_str).collect();
        if let Operation::Copy { destination } = operation {
            paths.push(destination);
        }
        let states = paths
            .into_iter()
            .map(|path| {
                self.cache
                    .get(path)
                    .cloned()
                    .unwrap_or_else(|| FileState::new(path))
            })
            .collect();

        Snapshot {
            workspace_root,
            workspace_name: self.workspace_name.clone(),
            repository_name: self.repository_name.clone(),
            server_url: self.server_url.clone(),
            branch_name: self.branch_name.clone(),
            user_name: self.user_name.clone(),
            changeset: self.changeset,
            cli_version: self.cli_version,
            is_available: self.is_available,
            update_status_at_startup: self.settings.update_status_at_startup,
            history_limit: self.settings.history_limit,
            states,
        }
    }

    /// Numeric name following the numeric changelists already known.
    fn next_changelist(&self) -> Changelist {
        let last = self
            .cache
            .changelists()
            .iter()
            .filter_map(|state| state.changelist.name.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Changelist::new((last + 1).to_string())
    }

    fn dispatch(&mut self, command: Arc<Command>, callback: Option<CompletionCallback>) -> CommandResult {
        log::debug!("Execute {} (#{}) on {} file(s)", command.operation.name(), command.id, command.files.len());
        let id = command.id;
        match command.concurrency {
            Concurrency::Synchronous => {
                command.run();
                self.queue.push_back(QueuedCommand {
                    command: command.clone(),
                    callback,
                });
                // Earlier asynchronous commands are drained first.
                loop {
                    self.tick();
                    if !self.queue.iter().any(|queued| queued.command.id == id) {
                        break;
                    }
                    std::thread::sleep(SYNC_POLL_INTERVAL);
                }
                CommandResult::from_success(command.output().success)
            }
            Concurrency::Asynchronous => {
                self.queue.push_back(QueuedCommand {
                    command: command.clone(),
                    callback,
                });
                self.pool.spawn(move || {
                    command.run();
                });
                CommandResult::Succeeded
            }
        }
    }

    /// Drain the oldest command if its execution is done.
    ///
    /// Returns whether a command was drained. Listeners are notified once when the
    /// drained command changed the cache or the workspace status.
    pub fn tick(&mut self) -> bool {
        let processed = self
            .queue
            .front()
            .is_some_and(|queued| queued.command.is_processed());
        if !processed {
            return false;
        }
        let Some(QueuedCommand { command, callback }) = self.queue.pop_front() else {
            return false;
        };

        let (result, changed) = {
            let mut output = command.output();
            let mut changed = self.update_workspace_status(&command, &output);
            changed |= (command.worker.update_states)(&command, &mut output, &mut self.cache);
            self.log_messages(&command, &output);
            (CommandResult::from_success(output.success), changed)
        };

        if let Some(callback) = callback {
            callback(&command.operation, result);
        }
        if changed {
            for listener in self.listeners.iter_mut() {
                listener();
            }
        }
        true
    }

    fn update_workspace_status(&mut self, command: &Command, output: &CommandOutput) -> bool {
        let mut changed = false;
        if let Some(name) = &output.workspace_name {
            changed |= set(&mut self.workspace_name, name.clone());
        }
        if let Some(info) = &output.workspace_info {
            changed |= set(&mut self.repository_name, info.repository_name.clone());
            changed |= set(&mut self.server_url, info.server_url.clone());
            changed |= set(&mut self.branch_name, info.branch_name.clone());
        }
        if let Some(changeset) = output.changeset {
            changed |= set(&mut self.changeset, changeset);
        }
        if let Some(user_name) = &output.user_name {
            changed |= set(&mut self.user_name, user_name.clone());
        }

        let kind = command.operation.kind();
        if output.connection_dropped {
            if self.is_available {
                log::error!("Connection to the Plastic SCM server lost");
            }
            changed |= set(&mut self.is_available, false);
        } else if kind == OperationKind::Connect || (kind == OperationKind::UpdateStatus && output.success) {
            changed |= set(&mut self.is_available, output.success);
        }

        if kind == OperationKind::MakeWorkspace && output.success && self.workspace_root.is_none() {
            if let Some(root) = find_root_directory(&self.start_dir) {
                log::info!("Workspace created in '{}'", root.display());
                self.workspace_root = Some(path_to_string(&root));
                changed = true;
            }
        }
        changed
    }

    fn log_messages(&self, command: &Command, output: &CommandOutput) {
        for info in &output.infos {
            log::info!("{info}");
        }
        for error in &output.errors {
            log::error!("{error}");
        }
        log::info!(
            "{} of {} files processed in {:.3}s ({} states)",
            command.operation.name(),
            command.files.len(),
            command.elapsed().as_secs_f64(),
            output.states.len()
        );
    }

    /// Call `listener` after each tick that changed the cache or the workspace status.
    pub fn add_listener(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Commands scheduled and not drained yet.
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// Runner sharing the provider's transport, for commands outside the queue.
    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// Cached state of `path`, relative to the workspace root or absolute.
    pub fn state(&self, path: &str) -> Option<&FileState> {
        let root = self.workspace_root.as_deref()?;
        self.cache.get(&to_absolute(root, path))
    }

    /// User-facing notices from the shell, such as a required sign-in.
    pub fn notices(&self) -> Option<&Receiver<String>> {
        self.notices.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn workspace_root(&self) -> Option<&str> {
        self.workspace_root.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.is_available
    }

    pub fn is_cli_available(&self) -> bool {
        self.cli_available
    }

    pub fn cli_version(&self) -> CliVersion {
        self.cli_version
    }

    pub fn changeset(&self) -> i32 {
        self.changeset
    }

    pub fn branch_name(&self) -> &str {
        &self.branch_name
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn shell_stats(&self) -> Option<ShellStats> {
        self.shell.as_ref().map(|shell| shell.stats())
    }

    /// Multi-line summary of the client, workspace and connection.
    pub fn status_text(&self) -> String {
        let changeset = if self.changeset == INVALID_REVISION {
            "N/A (Gluon/partial workspace)".to_string()
        } else {
            self.changeset.to_string()
        };
        let mut text = format!("Plastic SCM {}\n", self.cli_version);
        text.push_str(&format!(
            "Workspace: {} ({})\n",
            self.workspace_name,
            self.workspace_root.as_deref().unwrap_or("none")
        ));
        text.push_str(&format!("Repository: {}@{}\n", self.repository_name, self.server_url));
        text.push_str(&format!("Branch: {}\n", self.branch_name));
        text.push_str(&format!("Changeset: {changeset}\n"));
        text.push_str(&format!("User: {}\n", self.user_name));
        text.push_str(if self.is_available {
            "Connected"
        } else {
            "Not connected"
        });
        text
    }
}

impl Drop for Provider {
    fn drop(&mut self) {
        self.close();
    }
}
