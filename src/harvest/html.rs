// src/harvest/html.rs
// =============================================================================
// This module pulls links and images out of an HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Is built on html5ever (Mozilla's HTML parser), so broken markup is fine
//
// Every element is visited in document order. <a> tags contribute their href
// as a Link, <img> tags their src as an Image. Each value goes through the
// resolver in crawl/resolve.rs; anything it refuses is dropped here.
//
// Rust concepts:
// - Iterators: descendants() walks the whole tree lazily
// - filter_map: skip nodes that aren't elements or have no usable attribute
// =============================================================================

use scraper::{ElementRef, Html};

use crate::crawl::resolve::{resolve, AbsoluteUrl, RefKind};

/// A reference found on a page, already resolved against the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub kind: RefKind,
    pub url: AbsoluteUrl,
}

// Extracts all followable links and downloadable images from a page
//
// Parameters:
//   html: the page body
//   page_url: the URL the body was fetched from (base for relative refs)
//
// Returns: the references in document order
//
// Example:
//   html = "<a href='/docs'>Docs</a><img src='//cdn.x.com/a.png'>"
//   page_url = "https://example.com/"
//   result = [Link https://example.com/docs, Image https://cdn.x.com/a.png]
pub fn extract_refs(html: &str, page_url: &AbsoluteUrl) -> Vec<PageRef> {
    let document = Html::parse_document(html);

    // scraper's Html is not Send, so the result is collected here before the
    // caller goes back to awaiting network I/O
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter_map(|element| {
            let (kind, attr) = match element.value().name() {
                "a" => (RefKind::Link, "href"),
                "img" => (RefKind::Image, "src"),
                _ => return None,
            };
            let raw = element.value().attr(attr)?;
            let url = resolve(page_url, raw, kind)?;
            Some(PageRef { kind, url })
        })
        .collect()
}
