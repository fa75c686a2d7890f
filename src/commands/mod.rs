//! # CLI Commands
//!
//! Each command prints one JSON document to stdout, optionally saves it, and
//! returns the process exit code.

pub mod sites;
pub mod stats;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use crate::api::ApiError;
use crate::errors::{
    display_auth_error, display_error, display_network_error, display_rate_limit_error,
    display_service_error, display_validation_error, display_warning,
};
use crate::exit_codes::*;
use crate::output::{output_filename, save_json};

/// Where, and whether, to save the printed document.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub save: bool,
    pub output_dir: PathBuf,
}

/// Handle an API error and return the appropriate exit code.
pub(crate) fn handle_api_error(context: &str, error: ApiError) -> i32 {
    let message = format!("{}: {}", context, error);
    match error {
        ApiError::RateLimited { retry_after, .. } => {
            display_rate_limit_error(&message, retry_after);
            EXIT_RATE_LIMITED
        }
        ApiError::Unauthorized { .. } | ApiError::Forbidden { .. } => {
            display_auth_error(&message);
            EXIT_ERROR
        }
        ApiError::ValidationError { .. } => {
            display_validation_error(&message);
            EXIT_ERROR
        }
        ApiError::Network { .. } | ApiError::Timeout { .. } | ApiError::RetriesExhausted { .. } => {
            display_network_error(&message);
            EXIT_ERROR
        }
        ApiError::Server { .. } => {
            display_service_error(&message);
            EXIT_ERROR
        }
        ApiError::NotFound { .. } | ApiError::ClientError { .. } | ApiError::ParseError { .. } => {
            display_error(&message);
            EXIT_ERROR
        }
    }
}

/// Print `document` and save it when asked.
///
/// A failed save is reported as a warning; the command still succeeds.
pub(crate) fn emit<T: Serialize>(
    document: &T,
    output: &OutputOptions,
    tag: Option<&str>,
    now: DateTime<Local>,
) -> Result<i32> {
    let json = serde_json::to_string_pretty(document).context("Failed to serialize output")?;
    println!("{}", json);

    if output.save {
        match save_json(document, &output.output_dir, &output_filename(tag, now)) {
            Ok(path) => eprintln!(
                "\n{} Stats saved to: {}",
                "✓".bright_green().bold(),
                path.display().to_string().green()
            ),
            Err(e) => {
                log::warn!("Saving output failed: {:#}", e);
                display_warning(&format!("Could not save output: {:#}", e));
            }
        }
    }

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_maps_to_distinct_exit_code() {
        let code = handle_api_error(
            "Error listing sites",
            ApiError::RateLimited {
                retry_after: Some(30),
                message: "Too many requests".to_string(),
            },
        );
        assert_eq!(code, EXIT_RATE_LIMITED);
    }

    #[test]
    fn test_other_api_errors_map_to_generic_exit_code() {
        let errors = vec![
            ApiError::Unauthorized { message: String::new() },
            ApiError::NotFound { message: String::new() },
            ApiError::ValidationError { message: String::new() },
            ApiError::RetriesExhausted {
                attempts: 4,
                message: String::new(),
            },
            ApiError::Server {
                status: 503,
                message: String::new(),
            },
        ];
        for error in errors {
            assert_eq!(handle_api_error("ctx", error), EXIT_ERROR);
        }
    }

    #[test]
    fn test_failed_save_still_succeeds() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let output = OutputOptions {
            save: true,
            output_dir: blocker.join("sub"),
        };
        let code = emit(&serde_json::json!({"ok": true}), &output, None, Local::now()).unwrap();
        assert_eq!(code, EXIT_SUCCESS);
    }
}
