//! Consolidated test utilities for plastic-shell
//!
//! This module provides unified testing utilities for integration tests, built around
//! a temporary workspace and a fake `cm` executable answering `cm shell` requests.

pub mod assertions;
pub mod fixtures;
pub mod workspace;
