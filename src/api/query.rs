//! # Stats Query API
//!
//! Request and response types for the v2 query endpoint, plus the
//! convenience wrappers used by the CLI.

use crate::api::client::{ApiClient, ApiError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Metrics requested when the caller does not name any.
pub const DEFAULT_METRICS: &[&str] = &[
    "visitors",
    "visits",
    "pageviews",
    "views_per_visit",
    "bounce_rate",
    "visit_duration",
];

/// `DEFAULT_METRICS` as owned strings.
pub fn default_metrics() -> Vec<String> {
    DEFAULT_METRICS.iter().map(|m| m.to_string()).collect()
}

// =============================================================================
// Request Types
// =============================================================================

/// Time window a query aggregates over.
///
/// Serialized as a plain string (`"7d"`) or a `["start", "end"]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateRange {
    /// Relative period understood by the service, e.g. `day`, `7d`, `month`.
    Period(String),
    /// Inclusive `YYYY-MM-DD` bounds.
    Custom(String, String),
}

impl DateRange {
    pub fn period(value: impl Into<String>) -> Self {
        DateRange::Period(value.into())
    }

    pub fn custom(start: impl Into<String>, end: impl Into<String>) -> Self {
        DateRange::Custom(start.into(), end.into())
    }

    /// Check the range is well-formed before it is sent.
    pub fn validate(&self) -> Result<(), ApiError> {
        match self {
            DateRange::Period(p) => {
                if p.trim().is_empty() {
                    return Err(ApiError::validation("date_range must not be empty"));
                }
                Ok(())
            }
            DateRange::Custom(start, end) => {
                let start_date = parse_date(start)?;
                let end_date = parse_date(end)?;
                if start_date > end_date {
                    return Err(ApiError::validation(format!(
                        "date_range start {} is after end {}",
                        start, end
                    )));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRange::Period(p) => write!(f, "{}", p),
            DateRange::Custom(start, end) => write!(f, "{},{}", start, end),
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::validation(format!(
            "invalid date '{}' in date_range, expected YYYY-MM-DD",
            value
        ))
    })
}

/// A stats query. Build with [`QueryRequest::new`] and the chained setters.
///
/// # Example
///
/// ```rust
/// use plausible_stats::api::{DateRange, QueryRequest};
///
/// let query = QueryRequest::new("example.com", vec!["visitors".into()], DateRange::period("7d"))
///     .dimensions(vec!["time:day".into()])
///     .limit(31);
/// assert!(query.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    site_id: String,
    metrics: Vec<String>,
    date_range: DateRange,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dimensions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    filters: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    order_by: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<i64>,
}

impl QueryRequest {
    pub fn new(site_id: impl Into<String>, metrics: Vec<String>, date_range: DateRange) -> Self {
        Self {
            site_id: site_id.into(),
            metrics,
            date_range,
            dimensions: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Group results, e.g. `time:day` or `event:page`.
    pub fn dimensions(mut self, dimensions: Vec<String>) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Filter expressions, e.g. `["is", "visit:country_name", ["Germany"]]`.
    pub fn filters(mut self, filters: Vec<Value>) -> Self {
        self.filters = filters;
        self
    }

    /// Ordering, e.g. `["visitors", "desc"]`.
    pub fn order_by(mut self, order_by: Vec<Value>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    /// Check every field the service would otherwise reject.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.site_id.trim().is_empty() {
            return Err(ApiError::validation("site_id must not be empty"));
        }
        validate_metrics(&self.metrics)?;
        self.date_range.validate()?;
        if let Some(limit) = self.limit {
            if limit <= 0 {
                return Err(ApiError::validation(format!(
                    "limit must be a positive integer, got {}",
                    limit
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_metrics(metrics: &[String]) -> Result<(), ApiError> {
    if metrics.is_empty() {
        return Err(ApiError::validation("at least one metric is required"));
    }
    if metrics.iter().any(|m| m.trim().is_empty()) {
        return Err(ApiError::validation("metric names must not be empty"));
    }
    Ok(())
}

// =============================================================================
// Response Types
// =============================================================================

/// One result row: metric name to value, possibly with a `dimensions` key.
pub type ResultRow = Map<String, Value>;

/// Response from the query endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryResult {
    /// One row per (date x dimension) bucket; a single row for aggregates.
    pub results: Vec<ResultRow>,
    #[serde(default)]
    pub meta: Map<String, Value>,
    /// The query as the service understood it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
}

// =============================================================================
// API Client Methods
// =============================================================================

impl ApiClient {
    /// Run a stats query.
    ///
    /// The query is validated before anything is sent.
    ///
    /// # Errors
    ///
    /// * `ApiError::ValidationError` - the query is malformed
    /// * `ApiError::ParseError` - the body has no `results`
    /// * any other `ApiError` from the request itself
    pub async fn query_stats(&self, query: &QueryRequest) -> Result<QueryResult, ApiError> {
        query.validate()?;

        let url = format!("{}/api/v2/query", self.base_url);
        log::debug!(
            "[API] Querying {} for {} ({} metrics)",
            query.site_id,
            query.date_range,
            query.metrics.len()
        );

        self.send_json("query", |client| client.post(&url).json(query))
            .await
    }

    /// Aggregate stats for one site over a period, with [`DEFAULT_METRICS`]
    /// unless `metrics` is given.
    pub async fn get_period_stats(
        &self,
        site_id: &str,
        date_range: DateRange,
        metrics: Option<&[String]>,
    ) -> Result<QueryResult, ApiError> {
        let metrics = metrics.map(<[String]>::to_vec).unwrap_or_else(default_metrics);
        self.query_stats(&QueryRequest::new(site_id, metrics, date_range))
            .await
    }

    /// Aggregate stats for the current day.
    pub async fn get_last_24h_stats(
        &self,
        site_id: &str,
        metrics: Option<&[String]>,
    ) -> Result<QueryResult, ApiError> {
        self.get_period_stats(site_id, DateRange::period("day"), metrics)
            .await
    }
}
