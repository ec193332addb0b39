//! Core functionality for plastic-shell.
//!
//! This module provides the `cm shell` transport, the command pipeline running source
//! control operations on it, the parsers for the client outputs and the state cache
//! the results are merged into.

pub mod cache;
pub mod colors;
pub mod command;
pub mod command_init;
pub mod config;
pub mod dirs;
pub mod error;
pub mod operation;
pub mod output;
pub mod parsers;
pub mod paths;
pub mod provider;
pub mod queries;
pub mod runner;
pub mod shell;
pub mod state;
pub mod version;
pub mod workers;
pub mod workspace_state;

// === Error handling ===
// Core error types and result type used throughout the application
pub use error::{PlasticError, Result};

// === Configuration ===
// User settings and the immutable configuration of the shell transport
pub use config::{Settings, ShellConfig};

// === Shell transport ===
// Persistent 'cm shell' session and the seam used to replace it in tests
pub use runner::{RunOutput, Runner};
pub use shell::{CommandReply, CommandRequest, Shell, ShellStats, Transport};

// === Workspace states ===
// Type-safe workspace state enumeration and the records cached per file
pub use state::{Branch, Changelist, ChangelistState, Changeset, FileState, Lock, Revision};
pub use workspace_state::WorkspaceState;
pub use cache::StateCache;

// === Command pipeline ===
// Operations, the commands running them and the dispatcher draining them
pub use command::{Command, CommandOutput, CommandResult, Concurrency};
pub use operation::{Operation, OperationKind};
pub use provider::{CommandReport, Provider};
pub use version::CliVersion;

// === Command initialization ===
// Centralized initialization for the CLI subcommands
pub use command_init::{CommandContext, CommandInit};

// === Output formatting ===
// Unified output formatting for consistent CLI presentation
pub use colors::{format_file_state, get_aligned_state, get_state_color_style};
pub use output::{print_error, print_info, print_json, print_section_header, print_success};
