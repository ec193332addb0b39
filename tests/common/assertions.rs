//! Common assertion helpers for test output validation
//!
//! Provides predicates for validating plastic-shell command output and error messages.

#![allow(dead_code)]

use predicates::prelude::*;

/// Creates a predicate that checks for the missing workspace error message
pub fn not_in_workspace() -> impl Predicate<str> {
    predicates::str::contains("Not in a Plastic SCM workspace")
}

/// Creates a predicate that checks for the branch header of the status output
pub fn has_branch(branch: &str) -> impl Predicate<str> {
    predicates::str::contains("On branch").and(predicates::str::contains(branch.to_string()))
}

/// Creates a predicate that checks a file is listed with the given status code
pub fn has_file_state(code: &str, path: &str) -> impl Predicate<str> {
    predicates::str::contains(code.to_string()).and(predicates::str::contains(path.to_string()))
}

/// Creates a predicate that checks for a success line
pub fn has_success(message: &str) -> impl Predicate<str> {
    predicates::str::contains("✓").and(predicates::str::contains(message.to_string()))
}
