//! `--list`: print the sites visible to the API key.

use anyhow::Result;
use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;

use crate::api::{ApiClient, DEFAULT_SITES_LIMIT, Site};
use crate::commands::{OutputOptions, emit, handle_api_error};

const OUTPUT_TAG: &str = "sites";

#[derive(Debug, Clone, Serialize)]
pub struct SiteListOutput {
    pub timestamp: String,
    pub total_sites: usize,
    pub sites: Vec<Site>,
}

impl SiteListOutput {
    pub fn new(sites: Vec<Site>, now: DateTime<Local>) -> Self {
        Self {
            timestamp: now.to_rfc3339(),
            total_sites: sites.len(),
            sites,
        }
    }
}

pub async fn execute_list(client: &ApiClient, output: &OutputOptions) -> Result<i32> {
    eprintln!("{} Fetching list of sites...", "→".cyan());

    let sites = match client.list_sites(DEFAULT_SITES_LIMIT).await {
        Ok(sites) => sites,
        Err(e) => return Ok(handle_api_error("Error listing sites", e)),
    };

    let now = Local::now();
    emit(&SiteListOutput::new(sites, now), output, Some(OUTPUT_TAG), now)
}
