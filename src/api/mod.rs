//! # API Client Module
//!
//! This module provides the HTTP client for the Plausible Sites and Stats APIs.

pub mod client;
pub mod query;
pub mod sites;
pub mod summary;

// Re-export commonly used types for convenience
pub use client::{ApiClient, ApiError, ClientOptions, RetryPolicy};
pub use query::{DEFAULT_METRICS, DateRange, QueryRequest, QueryResult, default_metrics};
pub use sites::{DEFAULT_SITES_LIMIT, Site};
pub use summary::{SiteStatsOutcome, StatsSummary, format_stats_summary};
