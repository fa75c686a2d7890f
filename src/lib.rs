//! # Plausible Stats Library
//!
//! This crate provides the core functionality for the `plausible-stats` CLI,
//! a tool for pulling aggregate numbers out of a Plausible Analytics
//! instance and printing them as JSON.
//!
//! ## Modules
//!
//! - [`api`] - API client for the Plausible Sites and Stats APIs
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration from the environment
//! - [`errors`] - Error display
//! - [`exit_codes`] - Standard exit codes
//! - [`logging`] - Log subscriber setup
//! - [`output`] - Saving result documents
//! - [`period`] - `--period` parsing

pub mod api;
pub mod commands;
pub mod config;
pub mod errors;
pub mod exit_codes;
pub mod logging;
pub mod output;
pub mod period;

// Re-export commonly used types
pub use api::{ApiClient, ApiError};
pub use config::{Config, ConfigError};
