//! `--site` and `--all`: aggregate stats for one site or every site.

use anyhow::Result;
use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::api::{ApiClient, SiteStatsOutcome, format_stats_summary};
use crate::commands::{OutputOptions, emit, handle_api_error};
use crate::errors::{display_rate_limit_error, display_warning};
use crate::exit_codes::EXIT_RATE_LIMITED;
use crate::period::{ParsedPeriod, parse_period};

/// Arguments shared by the stats commands.
#[derive(Debug, Clone)]
pub struct StatsArgs {
    /// Raw `--period` value.
    pub period: String,
    /// Metrics to request; the defaults when `None`.
    pub metrics: Option<Vec<String>>,
    pub output: OutputOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteStatsOutput {
    pub timestamp: String,
    pub site: String,
    pub period: String,
    pub metrics: Map<String, Value>,
}

/// Per-domain entry of [`AllSitesOutput`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SiteEntry {
    Success {
        timezone: Option<String>,
        metrics: Map<String, Value>,
    },
    Failure {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct AllSitesOutput {
    pub timestamp: String,
    pub period: String,
    pub total_sites: usize,
    pub successful: usize,
    pub failed: usize,
    pub sites: BTreeMap<String, SiteEntry>,
    /// Failures that were HTTP 429; they decide the exit code.
    #[serde(skip)]
    pub rate_limited: usize,
}

impl AllSitesOutput {
    pub fn new(
        outcomes: BTreeMap<String, SiteStatsOutcome>,
        period: String,
        now: DateTime<Local>,
    ) -> Self {
        let successful = outcomes.values().filter(|o| o.success).count();
        let total_sites = outcomes.len();
        let rate_limited = outcomes.values().filter(|o| o.rate_limited).count();

        let sites = outcomes
            .into_iter()
            .map(|(domain, outcome)| {
                let entry = match outcome.stats {
                    Some(stats) if outcome.success => SiteEntry::Success {
                        timezone: outcome.timezone,
                        metrics: format_stats_summary(&stats).metrics,
                    },
                    _ => SiteEntry::Failure {
                        error: outcome.error.unwrap_or_else(|| "Unknown error".to_string()),
                    },
                };
                (domain, entry)
            })
            .collect();

        Self {
            timestamp: now.to_rfc3339(),
            period,
            total_sites,
            successful,
            failed: total_sites - successful,
            sites,
            rate_limited,
        }
    }
}

fn resolve_period(raw: &str) -> ParsedPeriod {
    let parsed = parse_period(raw);
    if let Some(warning) = &parsed.warning {
        display_warning(warning);
    }
    parsed
}

/// Fetch aggregate stats for a single site.
pub async fn execute_site(client: &ApiClient, site: &str, args: &StatsArgs) -> Result<i32> {
    let parsed = resolve_period(&args.period);
    let period = parsed.date_range.to_string();
    eprintln!(
        "{} Fetching stats for {} (period: {})...",
        "→".cyan(),
        site.cyan(),
        period
    );

    let result = match client
        .get_period_stats(site, parsed.date_range, args.metrics.as_deref())
        .await
    {
        Ok(result) => result,
        Err(e) => {
            return Ok(handle_api_error(
                &format!("Error fetching stats for {}", site),
                e,
            ));
        }
    };

    let now = Local::now();
    let document = SiteStatsOutput {
        timestamp: now.to_rfc3339(),
        site: site.to_string(),
        period,
        metrics: format_stats_summary(&result).metrics,
    };
    emit(&document, &args.output, Some(site), now)
}

/// Fetch aggregate stats for every site in the account.
pub async fn execute_all(client: &ApiClient, args: &StatsArgs) -> Result<i32> {
    let parsed = resolve_period(&args.period);
    let period = parsed.date_range.to_string();
    eprintln!(
        "{} Fetching stats for all sites (period: {})...",
        "→".cyan(),
        period
    );

    let outcomes = match client
        .get_all_sites_stats(parsed.date_range, args.metrics.as_deref())
        .await
    {
        Ok(outcomes) => outcomes,
        Err(e) => return Ok(handle_api_error("Error fetching stats", e)),
    };

    let now = Local::now();
    let document = AllSitesOutput::new(outcomes, period, now);
    if document.failed > 0 {
        eprintln!(
            "{} {} of {} sites failed",
            "⚠".yellow().bold(),
            document.failed,
            document.total_sites
        );
    }
    let exit_code = emit(&document, &args.output, None, now)?;

    if document.rate_limited > 0 {
        display_rate_limit_error(
            &format!(
                "{} of {} sites were refused with HTTP 429",
                document.rate_limited, document.total_sites
            ),
            None,
        );
        return Ok(EXIT_RATE_LIMITED);
    }
    Ok(exit_code)
}
