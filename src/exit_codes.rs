//! # Exit Codes
//!
//! Process exit codes for the `plausible-stats` binary.

/// Command completed. Also used when only saving the output file failed.
pub const EXIT_SUCCESS: i32 = 0;

/// API, transport, or unexpected failure.
pub const EXIT_ERROR: i32 = 1;

/// Missing or invalid configuration.
pub const EXIT_CONFIG_ERROR: i32 = 1;

/// The API answered 429.
pub const EXIT_RATE_LIMITED: i32 = 2;

/// Interrupted with Ctrl-C (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;
