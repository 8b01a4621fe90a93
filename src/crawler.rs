//! Edition crawl controller and run driver.
//!
//! # State Machine
//!
//! Each edition is crawled by [`EditionCrawler::run`]:
//!
//! ```text
//!            ┌───────────────────────────────────────────┐
//!            ▼                                           │
//!   Fetching(page) ──ok──▶ Extracting(page) ──links──▶ Writing(page) ── page += 1
//!        │                      │     │
//!   transport error        end of pages   no results table
//!        ▼                      ▼     ▼
//!     Aborted              Terminated  Aborted
//! ```
//!
//! A failure on one player's detail page only drops that player. A failure
//! fetching a listing page ends the edition, since it points at a wrong URL
//! or an unreachable site rather than a single bad page.
//!
//! [`run_editions`] drives the configured editions in order. Each edition is
//! isolated: an aborted edition does not stop the next one.

use crate::config::CrawlConfig;
use crate::error::ExtractionError;
use crate::fetch::Fetcher;
use crate::models::{
    EditionOutcome, EditionStats, EditionTarget, ListingPage, PageLinkSet, PlayerRecord,
};
use crate::outputs::csv_file::CsvEditionWriter;
use crate::schema::Schema;
use crate::scrapers::listing::read_listing;
use crate::scrapers::player::PlayerExtractor;
use crate::utils::{pick_delay, truncate_for_log};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use scraper::Html;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

enum CrawlState {
    Fetching { page: u32 },
    Extracting { page: u32, body: String },
    Writing { page: u32, batch: Vec<PlayerRecord> },
    Terminated,
    Aborted { page: Option<u32>, reason: String },
}

/// Crawls one edition at a time with a shared fetcher and writer.
pub struct EditionCrawler<'a, F> {
    config: &'a CrawlConfig,
    fetcher: &'a F,
    writer: CsvEditionWriter,
    extractor: PlayerExtractor,
}

impl<'a, F: Fetcher> EditionCrawler<'a, F> {
    pub fn new(
        config: &'a CrawlConfig,
        fetcher: &'a F,
        writer: CsvEditionWriter,
        extractor: PlayerExtractor,
    ) -> Self {
        Self {
            config,
            fetcher,
            writer,
            extractor,
        }
    }

    /// Crawl `target` from page 0 until the listing runs out or an
    /// edition-fatal error occurs. The edition file must be initialized.
    #[instrument(level = "info", skip_all, fields(edition = %target))]
    pub async fn run(&self, target: &EditionTarget) -> EditionOutcome {
        let mut stats = EditionStats::default();
        let mut state = CrawlState::Fetching { page: 0 };

        loop {
            state = match state {
                CrawlState::Fetching { page } => self.fetch_listing(target, page).await,

                CrawlState::Extracting { page, body } => {
                    let listing =
                        read_listing(&Html::parse_document(&body), &self.config.base_url);
                    match listing {
                        Ok(ListingPage::EndOfPages) => {
                            info!(page, "No more players; edition complete");
                            CrawlState::Terminated
                        }
                        Ok(ListingPage::Links(links)) => {
                            info!(page, players = links.len(), "Processing listing page");
                            let (batch, skipped) = self.extract_players(links).await;
                            stats.players_skipped += skipped;
                            CrawlState::Writing { page, batch }
                        }
                        Err(e) => {
                            error!(page, error = %e, "Listing page not understood; aborting edition");
                            CrawlState::Aborted {
                                page: Some(page),
                                reason: e.to_string(),
                            }
                        }
                    }
                }

                CrawlState::Writing { page, batch } => {
                    match self.writer.append_batch(target, &batch).await {
                        Ok(()) => {
                            stats.pages_written += 1;
                            stats.players_written += batch.len();
                            debug!(page, rows = batch.len(), "Page written");
                            CrawlState::Fetching { page: page + 1 }
                        }
                        Err(e) => {
                            error!(page, error = %e, "Failed to append page; aborting edition");
                            CrawlState::Aborted {
                                page: Some(page),
                                reason: e.to_string(),
                            }
                        }
                    }
                }

                CrawlState::Terminated => return EditionOutcome::Terminated(stats),

                CrawlState::Aborted { page, reason } => {
                    return EditionOutcome::Aborted {
                        page,
                        reason,
                        stats,
                    };
                }
            };
        }
    }

    async fn fetch_listing(&self, target: &EditionTarget, page: u32) -> CrawlState {
        let delay = pick_delay(&self.config.delay_choices);
        if !delay.is_zero() {
            sleep(delay).await;
        }

        let url = target.listing_url(self.config.base_url.as_str(), page);
        match self.fetcher.fetch(&url, &self.config.headers).await {
            Ok(body) => CrawlState::Extracting { page, body },
            Err(e) => {
                error!(page, %url, error = %e, "Listing fetch failed; aborting edition");
                CrawlState::Aborted {
                    page: Some(page),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Fetch and extract every link, keeping listing order.
    ///
    /// Returns the extracted records and the number of players skipped.
    async fn extract_players(&self, links: PageLinkSet) -> (Vec<PlayerRecord>, usize) {
        let results: Vec<(usize, String, Result<PlayerRecord, ExtractionError>)> =
            stream::iter(links.into_iter().enumerate())
                .map(|(index, url)| async move {
                    let result = self.extract_player(&url).await;
                    (index, url, result)
                })
                .buffer_unordered(self.config.concurrency.max(1))
                .collect()
                .await;

        let mut skipped = 0;
        let batch = results
            .into_iter()
            .sorted_by_key(|(index, _, _)| *index)
            .filter_map(|(index, url, result)| match result {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        index,
                        %url,
                        error = %truncate_for_log(&e.to_string(), 300),
                        "Skipping player"
                    );
                    skipped += 1;
                    None
                }
            })
            .collect();
        (batch, skipped)
    }

    async fn extract_player(&self, url: &str) -> Result<PlayerRecord, ExtractionError> {
        let body = self.fetcher.fetch(url, &self.config.headers).await?;
        let record = self.extractor.extract(&Html::parse_document(&body))?;
        debug!(
            %url,
            player = record.name(),
            club = record.club(),
            attributes = record.attributes().len(),
            "Extracted player"
        );
        Ok(record)
    }
}

/// Crawl every configured edition in order.
///
/// For each edition the output file is initialized with the schema header
/// and then crawled. An edition whose file cannot be created is reported as
/// aborted without any fetching.
#[instrument(level = "info", skip_all, fields(editions = config.years.len()))]
pub async fn run_editions<F: Fetcher>(
    config: &CrawlConfig,
    fetcher: &F,
    schema: &Schema,
) -> Vec<(EditionTarget, EditionOutcome)> {
    let writer = CsvEditionWriter::new();
    let extractor = PlayerExtractor::with_attribute_count(schema.attribute_count());
    let crawler = EditionCrawler::new(config, fetcher, writer, extractor);

    let mut outcomes = Vec::with_capacity(config.years.len());
    for target in config.editions() {
        info!(edition = %target, path = %target.output_path.display(), "Starting edition");

        let outcome = match writer.initialize(&target, schema).await {
            Ok(()) => crawler.run(&target).await,
            Err(e) => {
                error!(edition = %target, error = %e, "Cannot initialize edition file; skipping edition");
                EditionOutcome::Aborted {
                    page: None,
                    reason: e.to_string(),
                    stats: EditionStats::default(),
                }
            }
        };

        let stats = outcome.stats();
        match &outcome {
            EditionOutcome::Terminated(_) => info!(
                edition = %target,
                pages = stats.pages_written,
                players = stats.players_written,
                skipped = stats.players_skipped,
                "Edition completed"
            ),
            EditionOutcome::Aborted { page, reason, .. } => warn!(
                edition = %target,
                ?page,
                %reason,
                pages = stats.pages_written,
                players = stats.players_written,
                skipped = stats.players_skipped,
                "Edition aborted"
            ),
        }
        outcomes.push((target, outcome));
    }
    outcomes
}
