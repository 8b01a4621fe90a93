//! Utility functions for text cleanup, polite delays, logging and file system checks.

use once_cell::sync::Lazy;
use rand::rng;
use rand::seq::IndexedRandom;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Trim and collapse every run of whitespace to a single space.
///
/// Returns `None` for text that is empty after trimming, so callers can
/// treat blank markup the same as missing markup.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_text("  Real\n   Madrid "), Some("Real Madrid".to_string()));
/// assert_eq!(normalize_text(" \n "), None);
/// ```
pub fn normalize_text(s: &str) -> Option<String> {
    let collapsed = WHITESPACE_RUN.replace_all(s.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

/// Pick one delay uniformly from `choices`.
///
/// An empty slice means no delay at all.
pub fn pick_delay(choices: &[Duration]) -> Duration {
    choices
        .choose(&mut rng())
        .copied()
        .unwrap_or(Duration::ZERO)
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last char boundary at or before `max` bytes
/// and get `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and removes a
/// probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Lionel Messi"), Some("Lionel Messi".to_string()));
        assert_eq!(
            normalize_text("\n   Paris\tSaint-Germain \n"),
            Some("Paris Saint-Germain".to_string())
        );
        assert_eq!(normalize_text(""), None);
        assert_eq!(normalize_text(" \n\t "), None);
    }

    #[test]
    fn test_pick_delay_from_choices() {
        let choices = [
            Duration::from_secs(0),
            Duration::from_secs(1),
            Duration::from_secs(2),
        ];
        for _ in 0..50 {
            assert!(choices.contains(&pick_delay(&choices)));
        }
    }

    #[test]
    fn test_pick_delay_empty_is_zero() {
        assert_eq!(pick_delay(&[]), Duration::ZERO);
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let result = truncate_for_log("Müller", 2);
        assert_eq!(result, "M…(+6 bytes)");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("out");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
