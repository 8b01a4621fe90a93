//! Page scrapers for the two page kinds the crawl visits.
//!
//! | Page | Module | Yields |
//! |------|--------|--------|
//! | Career-mode player listing | [`listing`] | detail links, or end of pages |
//! | Player detail | [`player`] | one `PlayerRecord` |
//!
//! Both operate on an already parsed [`scraper::Html`] document and do no
//! I/O, so they can be exercised against fixture markup.

pub mod listing;
pub mod player;
