//! Centralized initialization for the CLI subcommands.
//!
//! Every subcommand needs the same setup: settings, a running `cm shell`, the workspace
//! root containing the current directory and a first connection. [`CommandInit`] does
//! it once and hands back a [`CommandContext`].
//!
//! # Public API
//! - [`CommandInit`]: Initializer with static methods
//! - [`CommandContext`]: Connected provider ready to run operations
//!
//! # Initialization Steps
//! 1. **Settings**: Load `config.json`, creating it with defaults if missing
//! 2. **Workspace discovery**: Walk up from the current directory to `.plastic`
//! 3. **Shell launch**: Start `cm shell` and check the client version
//! 4. **Connection**: Read the workspace configuration and check the server

use crate::core::{
    config::Settings,
    error::{PlasticError, Result},
    operation::Operation,
    output::{print_client_errors, print_client_messages},
    provider::{CommandReport, Provider},
};
use std::env;
use std::path::Path;

/// Connected provider for one CLI invocation
pub struct CommandContext {
    pub provider: Provider,
}

impl CommandContext {
    /// Run `operation` synchronously, echoing the client messages.
    ///
    /// A failed command becomes [`PlasticError::OperationFailed`] carrying its errors.
    pub fn run(&mut self, operation: Operation, files: &[String]) -> Result<CommandReport> {
        let name = operation.name();
        let report = self.provider.run(operation, files, None);
        print_client_messages(&report.infos);
        if report.success {
            print_client_errors(&report.errors);
            Ok(report)
        } else {
            Err(PlasticError::operation_failed(name, &report.errors))
        }
    }

    /// Fail unless the last connection to the server succeeded.
    pub fn require_connection(&self) -> Result<()> {
        if self.provider.is_available() {
            Ok(())
        } else {
            Err(PlasticError::ServerUnavailable)
        }
    }
}

pub struct CommandInit;

impl CommandInit {
    /// Initialize from the current directory with the user settings.
    pub fn initialize() -> Result<CommandContext> {
        let current_dir = env::current_dir()?;
        let settings = Settings::load_or_create()?;
        Self::initialize_in(settings, &current_dir)
    }

    pub fn initialize_in(settings: Settings, start_dir: &Path) -> Result<CommandContext> {
        log::debug!("Opening workspace from '{}'", start_dir.display());
        let provider = Provider::open(settings, start_dir)?;
        log::debug!("{}", provider.status_text());
        Ok(CommandContext { provider })
    }

    /// Same as [`initialize`](Self::initialize), refusing an empty file list first.
    pub fn initialize_with_files(files: &[String]) -> Result<CommandContext> {
        if files.is_empty() {
            return Err(PlasticError::NoFilesProvided);
        }
        Self::initialize()
    }
}
