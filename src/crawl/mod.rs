// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Features:
// - Depth-bounded recursion starting from a seed URL
// - Only relative links are followed, so the crawl stays on the seed site
// - One dedup ledger for pages and images: nothing is acted on twice
// - Sibling pages and images are processed concurrently
//
// Submodules:
// - resolve: href/src values -> absolute, query-free URLs
// - ledger: the set of URLs already claimed
// - driver: the recursion itself, plus the end-of-crawl report
// =============================================================================

mod driver;
mod ledger;
pub mod resolve;

pub use driver::{CrawlConfig, CrawlReport, Crawler};
pub use resolve::AbsoluteUrl;
