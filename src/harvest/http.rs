// src/harvest/http.rs
// =============================================================================
// Network side of harvesting: the shared HTTP client, page fetches, and the
// content classifier that decides whether a URL is an image we keep.
//
// Key functionality:
// - One reqwest Client for the whole crawl (connection pooling)
// - GET a page body as text, failing on non-2xx
// - HEAD an image URL and read the subtype out of its content-type
//
// Rust concepts:
// - FromStr-like parsing into an enum of accepted image types
// - Result<T, E>: every network step reports a typed HarvestError
// =============================================================================

use std::fmt;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;

use crate::crawl::resolve::AbsoluteUrl;
use crate::error::{HarvestError, Result};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The closed set of image subtypes we download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Jpg,
    Jpeg,
    Png,
    Gif,
    Bmp,
}

impl ImageType {
    /// Maps a content-type subtype ("jpeg", "png", ...) to an accepted type.
    ///
    /// Returns None for anything outside the accepted set, which is how
    /// callers spell "not accepted".
    pub fn from_subtype(subtype: &str) -> Option<Self> {
        match subtype {
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// File extension used when saving; the declared subtype, verbatim.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// Creates the HTTP client shared by every fetch, probe and download
//
// The timeout applies per request, so a hung server only stalls the branch
// that is waiting on it.
pub fn build_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

// Fetches a page and returns its body as text
pub async fn fetch_page(client: &Client, url: &AbsoluteUrl) -> Result<String> {
    let response = client.get(url.as_str()).send().await?;

    if !response.status().is_success() {
        return Err(HarvestError::Status(response.status()));
    }

    Ok(response.text().await?)
}

// Probes `url` with a HEAD request and returns the declared subtype
//
// Example: "image/jpeg; charset=binary" -> "jpeg"
//
// Only the header matters here; the status code of the probe is not checked.
pub async fn classify(client: &Client, url: &AbsoluteUrl) -> Result<String> {
    let response = client.head(url.as_str()).send().await?;

    let header = response
        .headers()
        .get(CONTENT_TYPE)
        .ok_or(HarvestError::MissingContentType)?;
    let value = header.to_str().map_err(|_| {
        HarvestError::MalformedContentType(String::from_utf8_lossy(header.as_bytes()).into_owned())
    })?;

    content_subtype(value)
}

/// Extracts the subtype from a content-type value, lowercased.
pub fn content_subtype(content_type: &str) -> Result<String> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    match essence.split_once('/') {
        Some((_, subtype)) if !subtype.trim().is_empty() => Ok(subtype.trim().to_ascii_lowercase()),
        _ => Err(HarvestError::MalformedContentType(content_type.to_string())),
    }
}
