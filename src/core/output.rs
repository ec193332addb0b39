//! Unified output formatting utilities for consistent CLI presentation.
//!
//! # Design Principles
//! - **Consistent color scheme**: Red for errors, yellow for client messages, green for success
//! - **Standardized spacing**: Newline before and after all command outputs
//! - **Machine-readable mode**: Data commands print JSON through [`print_json`] instead

use crate::core::error::Result;
use colored::*;
use serde::Serialize;

/// Formats and prints an error message with consistent styling
///
/// # Format
/// ```text
///
/// ✕ Error: <message>
///
/// ```
pub fn print_error(message: &str) {
    println!("\n{} {}\n", "✕ Error:".red(), message.white());
}

/// Formats and prints a success message with consistent styling
///
/// # Format
/// ```text
///
/// ✓ <message>
/// ```
pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green(), message.white());
}

/// Formats and prints an informational message with consistent styling
pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

/// Formats and prints a section header with consistent styling
///
/// # Format
/// ```text
///
/// <header>:
///
/// ```
pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.white());
}

/// Prints the messages the `cm` client reported for a command, dimmed.
pub fn print_client_messages(messages: &[String]) {
    for message in messages {
        println!("  {}", message.bright_black());
    }
}

/// Prints error lines the `cm` client reported, in yellow.
pub fn print_client_errors(errors: &[String]) {
    for error in errors {
        eprintln!("  {}", error.yellow());
    }
}

/// Pretty-prints `value` as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
