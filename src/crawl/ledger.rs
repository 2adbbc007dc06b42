// src/crawl/ledger.rs
// =============================================================================
// The dedup ledger: every URL the crawl has decided to act on.
//
// Pages and images share one namespace, so a URL is either crawled as a page
// or downloaded as an image, never both, and never twice. This is also what
// stops the crawl from looping forever on cyclic link graphs.
//
// Entries are never removed during a crawl.
// =============================================================================

use dashmap::DashSet;

use super::resolve::AbsoluteUrl;

#[derive(Debug, Default)]
pub struct DedupLedger {
    claimed: DashSet<AbsoluteUrl>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` and returns true the first time it is seen; false after.
    ///
    /// Check and insert happen under the same shard lock, so two branches
    /// racing on the same URL get exactly one `true` between them.
    pub fn try_claim(&self, url: &AbsoluteUrl) -> bool {
        self.claimed.insert(url.clone())
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }
}
