//! # plausible-stats
//!
//! Fetch stats from Plausible Analytics and print them as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Last 24h stats for all sites
//! plausible-stats --all
//!
//! # Last 30 days for one site, saved to ./output
//! plausible-stats --site example.com --period 30d --save
//!
//! # List all sites
//! plausible-stats --list
//! ```

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use plausible_stats::api::ApiClient;
use plausible_stats::commands::{self, OutputOptions, stats::StatsArgs};
use plausible_stats::config::Config;
use plausible_stats::errors::{display_config_error, display_error};
use plausible_stats::exit_codes::*;
use plausible_stats::logging::initialize_logging;
use plausible_stats::period::DEFAULT_PERIOD;

const AFTER_HELP: &str = "\
Examples:
  plausible-stats --all
  plausible-stats --all --period 7d
  plausible-stats --site example.com --period 30d
  plausible-stats --site example.com --period 2024-01-01,2024-01-31
  plausible-stats --list
  plausible-stats --all --save

Period options:
  day       Last 24 hours (default)
  7d        Last 7 days
  30d       Last 30 days
  month     Current month
  6mo       Last 6 months
  12mo      Last 12 months
  year      Current year
  all       All time
  realtime  Last 30 minutes
  FROM,TO   Custom range, dates as YYYY-MM-DD

Environment:
  PLAUSIBLE_BASE_URL (or BASE_URL), PLAUSIBLE_API_KEY (or API_KEY), OUTPUT_DIR,
  PLAUSIBLE_TIMEOUT_SECS, PLAUSIBLE_MAX_RETRIES. A .env file is read if present.";

/// Main CLI structure
#[derive(Parser)]
#[command(name = "plausible-stats")]
#[command(about = "Fetch stats from Plausible Analytics", long_about = None)]
#[command(version)]
#[command(after_help = AFTER_HELP)]
#[command(group(ArgGroup::new("action").required(true).args(["all", "site", "list"])))]
struct Cli {
    /// Fetch stats for all sites
    #[arg(long)]
    all: bool,
    /// Fetch stats for a specific site (domain)
    #[arg(long, value_name = "DOMAIN")]
    site: Option<String>,
    /// List all available sites
    #[arg(long)]
    list: bool,
    /// Time period for stats
    #[arg(long, value_name = "PERIOD", default_value = DEFAULT_PERIOD)]
    period: String,
    /// Metrics to fetch, comma-separated (default: visitors, visits, pageviews,
    /// views_per_visit, bounce_rate, visit_duration)
    #[arg(long, value_name = "METRICS", value_delimiter = ',')]
    metrics: Vec<String>,
    /// Save output to a JSON file
    #[arg(long)]
    save: bool,
    /// Directory to save output files (overrides OUTPUT_DIR)
    #[arg(long, value_name = "PATH")]
    output_dir: Option<PathBuf>,
    /// Enable debug logging on stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    initialize_logging(cli.verbose);

    let exit_code = tokio::select! {
        code = run(cli) => code,
        Ok(()) = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted");
            EXIT_INTERRUPTED
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> i32 {
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            display_config_error(&e.to_string());
            return EXIT_CONFIG_ERROR;
        }
    };
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    log::debug!(
        "Using {} (key {}), output dir {}",
        config.base_url,
        config.masked_api_key(),
        config.output_dir.display()
    );

    let client =
        match ApiClient::with_options(&config.base_url, &config.api_key, config.client_options()) {
            Ok(client) => client,
            Err(e) => {
                display_config_error(&e.to_string());
                return EXIT_CONFIG_ERROR;
            }
        };

    let output = OutputOptions {
        save: cli.save,
        output_dir: config.output_dir,
    };
    let args = StatsArgs {
        period: cli.period,
        metrics: if cli.metrics.is_empty() {
            None
        } else {
            Some(cli.metrics)
        },
        output,
    };

    let result = match (cli.list, cli.all, cli.site) {
        (true, _, _) => commands::sites::execute_list(&client, &args.output).await,
        (_, true, _) => commands::stats::execute_all(&client, &args).await,
        (_, _, Some(site)) => commands::stats::execute_site(&client, &site, &args).await,
        _ => {
            display_error("One of --all, --site, or --list is required");
            return EXIT_ERROR;
        }
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(e) => {
            display_error(&format!("Unexpected error: {:#}", e));
            EXIT_ERROR
        }
    }
}
