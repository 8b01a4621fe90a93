//! Command-line interface definitions for futwiz_crawl.
//!
//! Every flag is optional. Unset flags fall back to the YAML config file
//! (when `--config` is given) and then to the built-in defaults, which
//! reproduce the reference crawl: editions 15 through 19, sequential
//! detail fetches, a 0/1/2 second delay before each listing page.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the crawler.
///
/// # Examples
///
/// ```sh
/// # Crawl the default editions into ./data
/// futwiz_crawl
///
/// # Two editions, four detail fetches at a time, no delay
/// futwiz_crawl --years 18,19 --concurrency 4 --delay-choices 0
///
/// # Settings from a file, output directory from the command line
/// futwiz_crawl --config crawl.yaml -o /srv/futwiz
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Edition years to crawl, in order (e.g. `15,16,17`)
    #[arg(short, long, value_delimiter = ',')]
    pub years: Option<Vec<String>>,

    /// Directory receiving one CSV file per edition
    #[arg(short, long, env = "FUTWIZ_DATA_DIR")]
    pub output_dir: Option<PathBuf>,

    /// File listing the output field names, one per line
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum concurrent detail-page fetches per listing page
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Seconds to choose from at random before each listing fetch (e.g. `0,1,2`)
    #[arg(long, value_delimiter = ',')]
    pub delay_choices: Option<Vec<u64>>,

    /// Retries for a failed fetch, with exponential backoff (0 disables)
    #[arg(long)]
    pub retries: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Site root for listing and detail URLs, optionally with a path prefix
    #[arg(long, env = "FUTWIZ_BASE_URL")]
    pub base_url: Option<String>,

    /// Edition slug prefix (`fifa` in `fifa19`)
    #[arg(long)]
    pub edition_prefix: Option<String>,
}
