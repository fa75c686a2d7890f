//! # Error Display
//!
//! One-line, colored error messages on stderr. Nothing here exits the
//! process; callers pick the exit code.

use colored::Colorize;

fn display(label: &str, message: &str) {
    eprintln!("{} {} {}", "✗".red().bold(), label.red().bold(), message);
}

pub fn display_config_error(message: &str) {
    display("Configuration error:", message);
}

pub fn display_auth_error(message: &str) {
    display("Authentication failed:", message);
}

pub fn display_rate_limit_error(message: &str, retry_after: Option<u64>) {
    match retry_after {
        Some(secs) => display(
            "Rate limited:",
            &format!("{} (try again in {}s)", message, secs),
        ),
        None => display("Rate limited:", message),
    }
}

pub fn display_network_error(message: &str) {
    display("Network error:", message);
}

pub fn display_service_error(message: &str) {
    display("Service error:", message);
}

pub fn display_validation_error(message: &str) {
    display("Invalid request:", message);
}

pub fn display_error(message: &str) {
    display("Error:", message);
}

/// Non-fatal problems, e.g. the output file could not be written.
pub fn display_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}
