// src/crawl/resolve.rs
// =============================================================================
// Turns the href/src values found in a page into absolute, query-free URLs.
//
// The rules are textual rather than RFC 3986 resolution:
//   "./x" or "../x"  -> page URL + reference, glued as-is
//   "//host/x"       -> scheme of the page + ":" + reference
//   "/x"             -> scheme://host[:port] of the page + reference
//
// Anchors that match none of these (absolute links, "#frag", "mailto:", bare
// "page.html") are not followed. This keeps the crawl inside the relative
// link graph of the seed site.
//
// Images are more lenient: an absolute src (e.g. a CDN) is taken as-is, and
// a bare relative src like "cat.jpg" is joined onto the page URL.
//
// Whatever comes out has everything from the first '?' removed; that string
// is the key used by the dedup ledger.
// =============================================================================

use std::fmt;

use url::Url;

/// Which tag a reference came from. Links and images resolve differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// `<a href=...>`: a page to recurse into
    Link,
    /// `<img src=...>`: a download candidate
    Image,
}

/// A fully qualified URL (scheme and host present) with no query component.
///
/// The text is kept exactly as produced by the resolution rules, so
/// "https://a.com/dir/" + "../x" stays "https://a.com/dir/../x".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbsoluteUrl(String);

impl AbsoluteUrl {
    /// Validates `raw` as an absolute URL and strips its query string.
    pub fn parse(raw: &str) -> Option<Self> {
        let stripped = strip_query(raw);
        let parsed = Url::parse(stripped).ok()?;
        parsed.host_str()?;
        Some(Self(stripped.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parsed view of the URL, used for scheme/host lookups and joins.
    pub fn to_url(&self) -> Option<Url> {
        Url::parse(&self.0).ok()
    }

    /// Last '/'-separated segment of the URL ("a.jpg" for ".../img/a.jpg").
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }
}

impl fmt::Display for AbsoluteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves `reference` found on page `base` into an absolute URL.
///
/// Returns None when the reference is not something we act on: an anchor
/// outside the relative forms, or anything that does not produce a valid
/// absolute URL.
pub fn resolve(base: &AbsoluteUrl, reference: &str, kind: RefKind) -> Option<AbsoluteUrl> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if reference.starts_with("./") || reference.starts_with("../") {
        return AbsoluteUrl::parse(&format!("{}{}", base.as_str(), reference));
    }

    let base_url = base.to_url()?;

    if reference.starts_with("//") {
        return AbsoluteUrl::parse(&format!("{}:{}", base_url.scheme(), reference));
    }

    if reference.starts_with('/') {
        return AbsoluteUrl::parse(&format!("{}{}", origin(&base_url)?, reference));
    }

    match kind {
        RefKind::Link => None,
        RefKind::Image => match Url::parse(reference) {
            Ok(_) => AbsoluteUrl::parse(reference),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let joined = base_url.join(reference).ok()?;
                AbsoluteUrl::parse(joined.as_str())
            }
            Err(_) => None,
        },
    }
}

/// Drops everything from the first '?' onward.
pub fn strip_query(raw: &str) -> &str {
    match raw.find('?') {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

// "scheme://host" plus ":port" when the URL carries a non-default port
fn origin(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a newtype (AbsoluteUrl) instead of plain String?
//    - The type says "this has been through resolve()", so the ledger and the
//      downloader can't be handed a raw href by mistake
//
// 2. Why not Url::join for everything?
//    - join() normalizes "../" away; we want the textual form kept as-is
//    - We still use join() for bare image paths like "cat.jpg"
//
// 3. What does the ? do on an Option?
//    - Same as on Result: return None early if the value is None
// -----------------------------------------------------------------------------
