//! # futwiz_crawl
//!
//! Crawls the career-mode player database of futwiz for several game
//! editions and writes one CSV file per edition.
//!
//! ## Usage
//!
//! ```sh
//! futwiz_crawl --years 18,19 -o ./data -s fieldnames.txt
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture, one edition at a time:
//! 1. **Initialize**: truncate the edition file down to the schema header
//! 2. **List**: fetch listing page `n` and collect its player links
//! 3. **Extract**: fetch each player page and extract a fixed-width record
//! 4. **Write**: append the page's records, then move on to page `n + 1`
//!
//! The crawl of an edition stops when a listing page has no player rows
//! (completed) or when a listing page cannot be fetched (aborted). The
//! process exits non-zero if any edition was aborted.

use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod crawler;
mod error;
mod fetch;
mod models;
mod outputs;
mod schema;
mod scrapers;
mod utils;

use cli::Cli;
use config::CrawlConfig;
use crawler::run_editions;
use fetch::{HttpFetcher, RetryFetch};
use schema::Schema;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("futwiz_crawl starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = CrawlConfig::from_cli(&args).await?;
    info!(
        base_url = %config.base_url,
        years = ?config.years,
        data_dir = %config.data_dir.display(),
        concurrency = config.concurrency,
        retries = config.retries,
        "Resolved configuration"
    );

    if let Err(e) = ensure_writable_dir(&config.data_dir).await {
        error!(
            path = %config.data_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let schema = Schema::load(&config.schema_path).await?;
    let fetcher = RetryFetch::new(
        HttpFetcher::new(config.timeout)?,
        config.retries,
        Duration::from_secs(1),
    );

    let outcomes = run_editions(&config, &fetcher, &schema).await;

    let aborted: Vec<String> = outcomes
        .iter()
        .filter(|(_, outcome)| !outcome.is_terminated())
        .map(|(target, _)| target.slug())
        .collect();
    let players: usize = outcomes.iter().map(|(_, o)| o.stats().players_written).sum();

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        editions = outcomes.len(),
        players,
        "Execution complete"
    );

    if aborted.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(?aborted, "Some editions did not complete");
        Ok(ExitCode::FAILURE)
    }
}
