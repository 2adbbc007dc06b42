// src/error.rs
// =============================================================================
// Errors that can happen while harvesting a single resource.
//
// None of these are fatal to a crawl: the driver catches them per page or per
// image, reports them, and moves on. Fatal setup problems (bad seed URL,
// unwritable save directory) are handled with anyhow in main.rs instead.
//
// Rust concepts:
// - thiserror: derives std::error::Error and Display from attributes
// - #[from]: lets the ? operator convert library errors automatically
// =============================================================================

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered, but not with a 2xx status
    #[error("HTTP {0}")]
    Status(StatusCode),

    /// HEAD probe came back without a content-type header
    #[error("missing content-type header")]
    MissingContentType,

    /// content-type header was not of the form "type/subtype"
    #[error("malformed content-type: {0}")]
    MalformedContentType(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
