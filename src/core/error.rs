//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`PlasticError`] for the edges of the crate: locating a
//! workspace, spawning the `cm shell` process, loading settings and reading the
//! XML documents the CLI writes to temporary files.
//!
//! The command pipeline itself does not use these errors for control flow. Workers
//! and parsers report failures through a success flag and message lists that are
//! carried back to the caller on the [`Command`](crate::core::command::Command).
//!
//! # Public API
//! - [`PlasticError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, PlasticError>`

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for plastic-shell
#[derive(Error, Debug)]
pub enum PlasticError {
    // Workspace errors
    #[error("No Plastic SCM workspace found from '{path}'")]
    WorkspaceNotFound { path: PathBuf },

    // Shell and process errors
    #[error("Failed to launch '{binary} shell': {source}")]
    LaunchFailed {
        binary: PathBuf,
        source: std::io::Error,
    },

    #[error("Plastic SCM command line is not available")]
    CliUnavailable,

    #[error("Not connected to the Plastic SCM server")]
    ServerUnavailable,

    #[error("Unsupported Plastic SCM version {found} (oldest supported is {oldest})")]
    UnsupportedVersion { found: String, oldest: String },

    #[error("'{operation}' failed: {message}")]
    OperationFailed { operation: String, message: String },

    // Parse errors
    #[error("Invalid cm version '{input}'")]
    InvalidVersion { input: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Unexpected XML document: missing <{expected}>")]
    UnexpectedXml { expected: &'static str },

    // Configuration errors
    #[error("Could not find configuration directory")]
    ConfigDirectoryNotFound,

    #[error("Failed to parse settings file '{path}': {source}")]
    SettingsParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    // Argument errors
    #[error("No files provided")]
    NoFilesProvided,

    // File operation errors
    #[error("File does not exist: {path}")]
    FileNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results using PlasticError
pub type Result<T> = std::result::Result<T, PlasticError>;

impl PlasticError {
    /// Create an error for a document lacking a required element
    pub fn unexpected_xml(expected: &'static str) -> Self {
        Self::UnexpectedXml { expected }
    }

    /// Create a workspace not found error
    pub fn workspace_not_found(path: impl Into<PathBuf>) -> Self {
        Self::WorkspaceNotFound { path: path.into() }
    }

    /// Create a launch failed error
    pub fn launch_failed(binary: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LaunchFailed {
            binary: binary.into(),
            source,
        }
    }

    /// Create an operation failed error from the error messages of a command
    pub fn operation_failed(operation: impl Into<String>, messages: &[String]) -> Self {
        let message = if messages.is_empty() {
            "no details reported".to_string()
        } else {
            messages.join("\n")
        };
        Self::OperationFailed {
            operation: operation.into(),
            message,
        }
    }

    /// Create an unsupported version error
    pub fn unsupported_version(found: impl Into<String>, oldest: impl Into<String>) -> Self {
        Self::UnsupportedVersion {
            found: found.into(),
            oldest: oldest.into(),
        }
    }

    /// Create an invalid version error
    pub fn invalid_version(input: impl Into<String>) -> Self {
        Self::InvalidVersion {
            input: input.into(),
        }
    }

    /// Create a settings parse failed error
    pub fn settings_parse_failed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::SettingsParseFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }
}
