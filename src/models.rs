//! Data models shared by the crawl pipeline.
//!
//! - [`PlayerRecord`]: one extracted CSV row
//! - [`EditionTarget`]: one game edition and where its rows go
//! - [`ListingPage`] / [`PageLinkSet`]: what a listing page yields
//! - [`EditionOutcome`] / [`EditionStats`]: how an edition's crawl ended

use std::fmt;
use std::path::{Path, PathBuf};

/// Token written in place of any field that could not be located.
pub const PLACEHOLDER: &str = "-";

/// Number of identity/summary fields leading every record.
pub const IDENTITY_FIELD_COUNT: usize = 7;

/// One player's row: 7 identity fields followed by the attribute fields,
/// in attribute-panel order.
///
/// A missing value is always [`PLACEHOLDER`]; a record is never shortened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    fields: Vec<String>,
}

impl PlayerRecord {
    /// Build a record from identity and attribute fields.
    pub fn new(identity: [String; IDENTITY_FIELD_COUNT], attributes: Vec<String>) -> Self {
        let mut fields = Vec::with_capacity(IDENTITY_FIELD_COUNT + attributes.len());
        fields.extend(identity);
        fields.extend(attributes);
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn name(&self) -> &str {
        &self.fields[0]
    }

    pub fn club(&self) -> &str {
        &self.fields[1]
    }

    #[cfg(test)]
    pub fn identity(&self) -> &[String] {
        &self.fields[..IDENTITY_FIELD_COUNT]
    }

    pub fn attributes(&self) -> &[String] {
        &self.fields[IDENTITY_FIELD_COUNT..]
    }
}

/// A game edition to crawl: its year identifier and its output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditionTarget {
    /// Year identifier as it appears in URLs, e.g. `"19"`.
    pub year: String,
    /// Edition prefix, e.g. `"fifa"`.
    pub prefix: String,
    /// CSV file receiving this edition's rows.
    pub output_path: PathBuf,
}

impl EditionTarget {
    /// Target for `year`, writing to `{data_dir}/{prefix}{year}.csv`.
    pub fn new(year: &str, prefix: &str, data_dir: &Path) -> Self {
        Self {
            year: year.to_string(),
            prefix: prefix.to_string(),
            output_path: data_dir.join(format!("{prefix}{year}.csv")),
        }
    }

    /// Edition slug, e.g. `"fifa19"`.
    pub fn slug(&self) -> String {
        format!("{}{}", self.prefix, self.year)
    }

    /// Absolute URL of listing page `page` under `base_url`.
    pub fn listing_url(&self, base_url: &str, page: u32) -> String {
        format!(
            "{}/en/{}/career-mode/players?page={}",
            base_url.trim_end_matches('/'),
            self.slug(),
            page
        )
    }
}

impl fmt::Display for EditionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

/// Absolute detail-page URLs discovered on one listing page, in row order.
pub type PageLinkSet = Vec<String>;

/// What a listing page yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingPage {
    /// Detail links on this page, in listing order.
    Links(PageLinkSet),
    /// The results table has no data rows: the edition is exhausted.
    EndOfPages,
}

/// Counters accumulated while crawling one edition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditionStats {
    pub pages_written: u32,
    pub players_written: usize,
    pub players_skipped: usize,
}

/// Final state of one edition's crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditionOutcome {
    /// The listing ran out of pages.
    Terminated(EditionStats),
    /// The crawl stopped early on an edition-fatal error.
    Aborted {
        /// Page index being processed, if crawling had started.
        page: Option<u32>,
        reason: String,
        stats: EditionStats,
    },
}

impl EditionOutcome {
    pub fn is_terminated(&self) -> bool {
        matches!(self, EditionOutcome::Terminated(_))
    }

    pub fn stats(&self) -> EditionStats {
        match self {
            EditionOutcome::Terminated(stats) => *stats,
            EditionOutcome::Aborted { stats, .. } => *stats,
        }
    }
}
