//! Output stores for crawled records.
//!
//! # Submodules
//!
//! - [`csv_file`]: one delimited text file per edition, header row first,
//!   then rows in crawl order

pub mod csv_file;
