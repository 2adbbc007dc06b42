// src/harvest/mod.rs
// =============================================================================
// This module contains everything that touches a single page or image.
//
// Submodules:
// - html: Extracts links and images from a page's markup
// - http: Shared HTTP client, page fetches, content-type classification
// - download: Writes accepted images to the save directory
//
// The crawl module decides *what* to fetch; this module knows *how*.
// =============================================================================

mod download;
mod html;
mod http;

pub use download::{download, prepare_save_dir, ImageRecord};
pub use html::extract_refs;
pub use http::{build_client, classify, fetch_page, ImageType};
