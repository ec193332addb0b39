//! Plastic Shell - drive a Plastic SCM workspace through one persistent `cm shell`.
//!
//! This library keeps a single `cm shell` process alive, runs source control
//! operations on it from a small worker pool, parses the client outputs and merges the
//! results into an in-memory cache of file states.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module, which provides:
//! - The shell transport and command runner
//! - Operations, the provider dispatching them and its state cache
//! - Error handling and result types
//! - Output formatting for the command line

pub mod commands;
pub mod core;

// Re-export the core public API for external users
pub use core::{
    // Shell transport
    CommandReply,
    CommandRequest,
    // Command pipeline
    CommandReport,
    CommandResult,
    Concurrency,
    FileState,
    Operation,
    // Error handling
    PlasticError,
    Provider,
    Result,
    Settings,
    Shell,
    StateCache,
    Transport,
    WorkspaceState,
};
