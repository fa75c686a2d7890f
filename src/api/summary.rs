//! # Summaries
//!
//! Flattening query results into metric maps, and the all-sites batch.

use crate::api::client::{ApiClient, ApiError};
use crate::api::query::{DateRange, QueryRequest, QueryResult, default_metrics, validate_metrics};
use crate::api::sites::DEFAULT_SITES_LIMIT;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const DIMENSIONS_KEY: &str = "dimensions";

/// Metrics from the first result row plus the response metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    pub metrics: Map<String, Value>,
    pub query_info: Map<String, Value>,
}

/// Reduce a query result to its first row's metrics.
///
/// Aggregate queries return exactly one row. The `dimensions` key is
/// dropped. A row in the positional shape (`{"metrics": [10, 20]}`) is
/// expanded using the metric names echoed back in `query.metrics`.
pub fn format_stats_summary(result: &QueryResult) -> StatsSummary {
    let Some(row) = result.results.first() else {
        return StatsSummary {
            metrics: Map::new(),
            query_info: result.meta.clone(),
        };
    };

    let metrics = match positional_metrics(row, result.query.as_ref()) {
        Some(zipped) => zipped,
        None => row
            .iter()
            .filter(|(key, _)| key.as_str() != DIMENSIONS_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    };

    StatsSummary {
        metrics,
        query_info: result.meta.clone(),
    }
}

fn positional_metrics(row: &Map<String, Value>, query: Option<&Value>) -> Option<Map<String, Value>> {
    let values = row.get("metrics")?.as_array()?;
    let names = query?.get("metrics")?.as_array()?;
    if names.len() != values.len() {
        return None;
    }
    names
        .iter()
        .zip(values)
        .map(|(name, value)| Some((name.as_str()?.to_string(), value.clone())))
        .collect()
}

/// Outcome for one site in [`ApiClient::get_all_sites_stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteStatsOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the site's query was refused with HTTP 429.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub rate_limited: bool,
}

impl SiteStatsOutcome {
    fn succeeded(timezone: Option<String>, stats: QueryResult) -> Self {
        Self {
            success: true,
            timezone,
            stats: Some(stats),
            error: None,
            rate_limited: false,
        }
    }

    fn failed(error: &ApiError) -> Self {
        Self {
            success: false,
            timezone: None,
            stats: None,
            error: Some(error.to_string()),
            rate_limited: error.is_rate_limited(),
        }
    }
}

impl ApiClient {
    /// Query every site in the account, one after another.
    ///
    /// Failures for individual sites are recorded in the returned map and do
    /// not stop the batch. Sites without a domain are skipped, and a domain
    /// listed twice keeps its last result. Only listing
    /// the sites, or invalid arguments, fail the whole call.
    pub async fn get_all_sites_stats(
        &self,
        date_range: DateRange,
        metrics: Option<&[String]>,
    ) -> Result<BTreeMap<String, SiteStatsOutcome>, ApiError> {
        let metrics = metrics.map(<[String]>::to_vec).unwrap_or_else(default_metrics);
        validate_metrics(&metrics)?;
        date_range.validate()?;

        let sites = self.list_sites(DEFAULT_SITES_LIMIT).await?;
        let mut outcomes = BTreeMap::new();

        for site in sites {
            let Some(domain) = site.queryable_domain().map(str::to_string) else {
                debug!("[API] Skipping site without a domain: {:?}", site.extra);
                continue;
            };

            let query = QueryRequest::new(domain.clone(), metrics.clone(), date_range.clone());
            let outcome = match self.query_stats(&query).await {
                Ok(stats) => SiteStatsOutcome::succeeded(site.timezone, stats),
                Err(err) => {
                    warn!("Failed to query stats for {}: {}", domain, err);
                    SiteStatsOutcome::failed(&err)
                }
            };
            if outcomes.insert(domain.clone(), outcome).is_some() {
                warn!("Site {} is listed more than once, keeping the last result", domain);
            }
        }

        Ok(outcomes)
    }
}
