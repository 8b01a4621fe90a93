//! Error taxonomy for the crawl pipeline.
//!
//! Each error type maps to the scope it is fatal to:
//!
//! | Error | Scope |
//! |-------|-------|
//! | [`TransportError`] | the edition (listing fetch) or the player (detail fetch) |
//! | [`ExtractionError`] | the player |
//! | [`ListingError`] | the edition |
//! | [`StorageError`] | the edition |
//! | [`SchemaError`], [`ConfigError`] | start-up |
//!
//! A missing single-field anchor is not an error at all; the extractor
//! resolves it to the placeholder.

use std::path::PathBuf;
use thiserror::Error;

/// A fetch failed at the transport level.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, DNS, TLS, timeout or body-read failure.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The in-memory fetcher used by tests has no page for this URL.
    #[cfg(test)]
    #[error("no route to {0}")]
    Unreachable(String),
}

/// A single player's record could not be produced.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The detail page does not have the shape a record can be built from.
    #[error("structure mismatch: {reason}")]
    StructureMismatch { reason: String },

    /// The detail page could not be fetched.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ExtractionError {
    pub fn mismatch(reason: impl Into<String>) -> Self {
        ExtractionError::StructureMismatch {
            reason: reason.into(),
        }
    }
}

/// A listing page could not be interpreted.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("listing page has no results table")]
    MissingResultsTable,
}

/// The edition's output file could not be created or written.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("output store {path} unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode CSV row: {0}")]
    Csv(#[from] csv::Error),
}

/// The field-name schema file is unusable.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("cannot read schema file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema lists {found} field names; at least {required} identity fields are required")]
    TooShort { found: usize, required: usize },
}

/// The YAML configuration file or a CLI override is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid base url {url}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message() {
        let e = ExtractionError::mismatch("attribute panel missing");
        assert_eq!(e.to_string(), "structure mismatch: attribute panel missing");
    }

    #[test]
    fn test_transport_converts_into_extraction_error() {
        let t = TransportError::Status {
            url: "https://example.com/p/1".to_string(),
            status: 503,
        };
        let e: ExtractionError = t.into();
        assert!(matches!(e, ExtractionError::Transport(_)));
        assert!(e.to_string().contains("HTTP 503"));
    }
}
