//! Crawl configuration.
//!
//! Settings are resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults ([`CrawlConfig::default`])
//! 2. An optional YAML file (`--config crawl.yaml`)
//! 3. Command-line flags
//!
//! # YAML Example
//!
//! ```yaml
//! base_url: https://www.futwiz.com
//! edition_prefix: fifa
//! years: ["17", "18", "19"]
//! data_dir: ./data
//! schema_path: fieldnames.txt
//! delay_choices_secs: [0, 1, 2]
//! concurrency: 4
//! timeout_secs: 30
//! retries: 0
//! headers:
//!   user-agent: "Mozilla/5.0 ..."
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::models::EditionTarget;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.futwiz.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                      (KHTML, like Gecko) Chrome/75.0.3770.100 Safari/537.36";
pub const DEFAULT_YEARS: [&str; 5] = ["15", "16", "17", "18", "19"];

static DEFAULT_BASE: Lazy<Url> = Lazy::new(|| Url::parse(DEFAULT_BASE_URL).unwrap());

/// Everything the run driver, crawl controller and fetcher need.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Site root that listing URLs and relative detail links resolve against.
    pub base_url: Url,
    /// Edition slug prefix, `fifa` in `fifa19`.
    pub edition_prefix: String,
    /// Editions to crawl, in order.
    pub years: Vec<String>,
    /// Directory receiving one CSV file per edition.
    pub data_dir: PathBuf,
    /// Field-name schema file.
    pub schema_path: PathBuf,
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Delay before each listing fetch is drawn uniformly from these.
    pub delay_choices: Vec<Duration>,
    /// Maximum concurrent detail fetches per listing page.
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries per failed fetch; 0 disables retrying.
    pub retries: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE.clone(),
            edition_prefix: "fifa".to_string(),
            years: DEFAULT_YEARS.iter().map(|y| y.to_string()).collect(),
            data_dir: PathBuf::from("./data"),
            schema_path: PathBuf::from("fieldnames.txt"),
            headers: default_headers(),
            delay_choices: [0, 1, 2].into_iter().map(Duration::from_secs).collect(),
            concurrency: 1,
            timeout: Duration::from_secs(30),
            retries: 0,
        }
    }
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("user-agent".to_string(), DEFAULT_USER_AGENT.to_string()),
        ("accept-encoding".to_string(), "identity".to_string()),
    ])
}

/// On-disk YAML shape; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub edition_prefix: Option<String>,
    pub years: Option<Vec<String>>,
    pub data_dir: Option<PathBuf>,
    pub schema_path: Option<PathBuf>,
    pub headers: Option<BTreeMap<String, String>>,
    pub delay_choices_secs: Option<Vec<u64>>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<usize>,
}

impl FileConfig {
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let file: FileConfig =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Loaded crawl configuration file");
        Ok(file)
    }
}

impl CrawlConfig {
    /// Resolve defaults, then the YAML file named by `--config`, then CLI flags.
    pub async fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = &cli.config {
            config.apply_file(FileConfig::load(path).await?)?;
        }
        config.apply_cli(cli)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(url) = file.base_url {
            self.base_url = parse_base_url(&url)?;
        }
        if let Some(prefix) = file.edition_prefix {
            self.edition_prefix = prefix;
        }
        if let Some(years) = file.years {
            self.years = years;
        }
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(path) = file.schema_path {
            self.schema_path = path;
        }
        if let Some(headers) = file.headers {
            // File headers extend and override the defaults; names are case-insensitive.
            for (name, value) in headers {
                self.headers.insert(name.to_ascii_lowercase(), value);
            }
        }
        if let Some(secs) = file.delay_choices_secs {
            self.delay_choices = secs.into_iter().map(Duration::from_secs).collect();
        }
        if let Some(n) = file.concurrency {
            self.concurrency = n;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = file.retries {
            self.retries = n;
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &Cli) -> Result<(), ConfigError> {
        if let Some(url) = &cli.base_url {
            self.base_url = parse_base_url(url)?;
        }
        if let Some(prefix) = &cli.edition_prefix {
            self.edition_prefix = prefix.clone();
        }
        if let Some(years) = &cli.years {
            self.years = years.clone();
        }
        if let Some(dir) = &cli.output_dir {
            self.data_dir = dir.clone();
        }
        if let Some(path) = &cli.schema {
            self.schema_path = path.clone();
        }
        if let Some(secs) = &cli.delay_choices {
            self.delay_choices = secs.iter().copied().map(Duration::from_secs).collect();
        }
        if let Some(n) = cli.concurrency {
            self.concurrency = n;
        }
        if let Some(secs) = cli.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = cli.retries {
            self.retries = n;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }

    /// One target per configured year, in order.
    pub fn editions(&self) -> Vec<EditionTarget> {
        self.years
            .iter()
            .map(|year| EditionTarget::new(year, &self.edition_prefix, &self.data_dir))
            .collect()
    }
}

fn parse_base_url(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|source| ConfigError::BaseUrl {
        url: url.to_string(),
        source,
    })
}
