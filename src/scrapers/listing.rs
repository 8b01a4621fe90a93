//! Career-mode player listing pages.
//!
//! A listing page carries a `table.playersearchresults` whose first row is
//! the header. Every following row that holds a link points at one player's
//! detail page:
//!
//! ```text
//! https://www.futwiz.com/en/fifa19/career-mode/players?page=3
//!   └── /en/fifa19/career-mode/player/lionel-messi/41
//! ```
//!
//! A results table without any `tr.table-row` marks the end of the edition.

use crate::error::ListingError;
use crate::models::ListingPage;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

static RESULTS_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.playersearchresults").unwrap());
static DATA_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr.table-row").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Resolve `href` against `base`.
///
/// Root-relative links are appended to the base URL, path included, the same
/// way listing URLs are built, so a base such as `https://mirror.test/futwiz`
/// keeps its prefix. Other links follow ordinary URL resolution.
///
/// # Example
///
/// ```text
/// base: https://mirror.test/futwiz
/// href: /en/fifa19/career-mode/player/a/1
///   => https://mirror.test/futwiz/en/fifa19/career-mode/player/a/1
/// ```
fn resolve_link(base: &Url, href: &str) -> Result<Url, url::ParseError> {
    match href.strip_prefix('/') {
        Some(path) if !path.starts_with('/') => {
            Url::parse(&format!("{}/{}", base.as_str().trim_end_matches('/'), path))
        }
        _ => base.join(href),
    }
}

/// Read the detail links off one listing page.
///
/// Rows without a link are skipped. Links are resolved against `base` (see
/// [`resolve_link`]) and returned in row order.
///
/// # Errors
///
/// [`ListingError::MissingResultsTable`] if the page has no results table.
pub fn read_listing(document: &Html, base: &Url) -> Result<ListingPage, ListingError> {
    let table = document
        .select(&RESULTS_TABLE)
        .next()
        .ok_or(ListingError::MissingResultsTable)?;

    if table.select(&DATA_ROW).next().is_none() {
        return Ok(ListingPage::EndOfPages);
    }

    let mut links = Vec::new();
    for row in table.select(&ROW).skip(1) {
        let Some(href) = row
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        match resolve_link(base, href) {
            Ok(resolved) => links.push(resolved.to_string()),
            Err(e) => warn!(%href, error = %e, "Skipping unresolvable player link"),
        }
    }

    debug!(count = links.len(), "Read listing page");
    Ok(ListingPage::Links(links))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.futwiz.com").unwrap()
    }

    fn listing(rows: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><body>
            <table class="table results playersearchresults">
              <tr><th>Name</th><th>OVR</th></tr>
              {rows}
            </table>
            </body></html>"#
        ))
    }

    #[test]
    fn test_links_in_row_order() {
        let doc = listing(
            r#"<tr class="table-row"><td><a href="/en/fifa19/career-mode/player/b/2">B</a></td></tr>
               <tr class="table-row"><td><a href="/en/fifa19/career-mode/player/a/1">A</a></td></tr>
               <tr class="table-row"><td><a href="/en/fifa19/career-mode/player/c/3">C</a></td></tr>"#,
        );
        let page = read_listing(&doc, &base()).unwrap();
        assert_eq!(
            page,
            ListingPage::Links(vec![
                "https://www.futwiz.com/en/fifa19/career-mode/player/b/2".to_string(),
                "https://www.futwiz.com/en/fifa19/career-mode/player/a/1".to_string(),
                "https://www.futwiz.com/en/fifa19/career-mode/player/c/3".to_string(),
            ])
        );
    }

    #[test]
    fn test_rows_without_link_are_skipped() {
        let doc = listing(
            r#"<tr class="table-row"><td><a href="/p/1">A</a></td></tr>
               <tr class="table-row ad"><td>Advertisement</td></tr>
               <tr class="table-row"><td><a>no href</a></td></tr>
               <tr class="table-row"><td><a href="/p/2">B</a></td></tr>"#,
        );
        let page = read_listing(&doc, &base()).unwrap();
        assert_eq!(
            page,
            ListingPage::Links(vec![
                "https://www.futwiz.com/p/1".to_string(),
                "https://www.futwiz.com/p/2".to_string(),
            ])
        );
    }

    #[test]
    fn test_header_only_table_is_end_of_pages() {
        let doc = listing("");
        assert_eq!(read_listing(&doc, &base()).unwrap(), ListingPage::EndOfPages);
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let doc = Html::parse_document("<html><body><p>Maintenance</p></body></html>");
        assert!(matches!(
            read_listing(&doc, &base()),
            Err(ListingError::MissingResultsTable)
        ));
    }

    #[test]
    fn test_absolute_links_kept() {
        let doc = listing(
            r#"<tr class="table-row"><td><a href="https://cdn.example.com/p/9">X</a></td></tr>"#,
        );
        assert_eq!(
            read_listing(&doc, &base()).unwrap(),
            ListingPage::Links(vec!["https://cdn.example.com/p/9".to_string()])
        );
    }

    #[test]
    fn test_root_relative_links_keep_base_path() {
        let base = Url::parse("https://mirror.test/futwiz").unwrap();
        let doc = listing(
            r#"<tr class="table-row"><td><a href="/en/fifa19/career-mode/player/a/1">A</a></td></tr>
               <tr class="table-row"><td><a href="player/b/2">B</a></td></tr>"#,
        );
        assert_eq!(
            read_listing(&doc, &base).unwrap(),
            ListingPage::Links(vec![
                "https://mirror.test/futwiz/en/fifa19/career-mode/player/a/1".to_string(),
                "https://mirror.test/player/b/2".to_string(),
            ])
        );
    }

    #[test]
    fn test_detail_links_share_listing_prefix() {
        let base = Url::parse("https://mirror.test/futwiz/").unwrap();
        let target = crate::models::EditionTarget::new("19", "fifa", std::path::Path::new("data"));
        let listing_url = target.listing_url(base.as_str(), 0);
        let detail = resolve_link(&base, "/en/fifa19/career-mode/player/a/1").unwrap();
        assert!(listing_url.starts_with("https://mirror.test/futwiz/en/fifa19/"));
        assert!(detail.as_str().starts_with("https://mirror.test/futwiz/en/fifa19/"));
    }
}
