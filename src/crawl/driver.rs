// src/crawl/driver.rs
// =============================================================================
// This module drives the crawl: depth-bounded recursion over pages, with
// image harvesting along the way.
//
// How it works:
// 1. Claim the seed URL in the ledger and crawl it with the starting depth
// 2. At depth 0, stop. Otherwise fetch the page and extract its references
// 3. For each link that we manage to claim, crawl it with depth - 1
// 4. For each image, classify it; if it is an accepted type and we manage to
//    claim it, download it
// 5. Sibling branches run concurrently; a semaphore caps in-flight requests
//
// A failed page fetch ends that branch only. A failed download is reported
// and the crawl carries on.
//
// Rust concepts:
// - BoxFuture: async recursion needs a boxed future of known size
// - FuturesUnordered: run sibling branches together, in any order
// - Atomics: counters shared between branches without a lock
// =============================================================================

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use super::ledger::DedupLedger;
use super::resolve::{AbsoluteUrl, RefKind};
use crate::error::Result;
use crate::harvest::{self, ImageRecord, ImageType};

/// Everything the crawler needs to know before it starts.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Directory images are written to; must already exist
    pub save_dir: PathBuf,
    /// Starting depth: 1 fetches only the seed page
    pub depth: usize,
    /// Per-request network timeout
    pub timeout: Duration,
    /// Maximum number of requests in flight at once
    pub concurrency: usize,
}

// A page waiting to be crawled
#[derive(Debug, Clone)]
struct CrawlTask {
    url: AbsoluteUrl,
    remaining_depth: usize,
}

#[derive(Debug, Default)]
struct CrawlStats {
    pages_fetched: AtomicUsize,
    page_failures: AtomicUsize,
    images_rejected: AtomicUsize,
    download_failures: AtomicUsize,
}

/// Summary of one crawl, printed at the end (or as JSON with --json).
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub seed: String,
    pub depth: usize,
    pub pages_fetched: usize,
    pub page_failures: usize,
    pub images_rejected: usize,
    pub download_failures: usize,
    pub downloaded: Vec<ImageRecord>,
}

pub struct Crawler {
    client: Client,
    ledger: DedupLedger,
    permits: Semaphore,
    stats: CrawlStats,
    downloaded: Mutex<Vec<ImageRecord>>,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let client = harvest::build_client(config.timeout)?;
        Ok(Self {
            client,
            ledger: DedupLedger::new(),
            permits: Semaphore::new(config.concurrency.max(1)),
            stats: CrawlStats::default(),
            downloaded: Mutex::new(Vec::new()),
            config,
        })
    }

    /// Crawls from `seed` until every branch has run out of depth or links.
    pub async fn run(self, seed: AbsoluteUrl) -> CrawlReport {
        self.ledger.try_claim(&seed);

        let task = CrawlTask {
            url: seed.clone(),
            remaining_depth: self.config.depth,
        };
        self.crawl_page(task).await;

        debug!(claimed = self.ledger.claimed_count(), "crawl finished");

        CrawlReport {
            seed: seed.to_string(),
            depth: self.config.depth,
            pages_fetched: self.stats.pages_fetched.load(Ordering::Relaxed),
            page_failures: self.stats.page_failures.load(Ordering::Relaxed),
            images_rejected: self.stats.images_rejected.load(Ordering::Relaxed),
            download_failures: self.stats.download_failures.load(Ordering::Relaxed),
            downloaded: self.downloaded.into_inner(),
        }
    }

    fn crawl_page(&self, task: CrawlTask) -> BoxFuture<'_, ()> {
        async move {
            if task.remaining_depth == 0 {
                return;
            }

            let fetched = {
                let _permit = self.permits.acquire().await;
                harvest::fetch_page(&self.client, &task.url).await
            };

            let body = match fetched {
                Ok(body) => body,
                Err(e) => {
                    warn!(url = %task.url, error = %e, "could not fetch page");
                    println!("{} : could not fetch page ({}).", task.url, e);
                    self.stats.page_failures.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            };

            self.stats.pages_fetched.fetch_add(1, Ordering::Relaxed);
            info!(url = %task.url, depth = task.remaining_depth, "crawling page");

            let refs = harvest::extract_refs(&body, &task.url);

            // position of the last <a> pointing at each URL on this page
            let last_link: HashMap<AbsoluteUrl, usize> = refs
                .iter()
                .enumerate()
                .filter(|(_, r)| r.kind == RefKind::Link)
                .map(|(i, r)| (r.url.clone(), i))
                .collect();

            let mut branches = FuturesUnordered::new();
            for (idx, page_ref) in refs.into_iter().enumerate() {
                match page_ref.kind {
                    RefKind::Link => {
                        if self.ledger.try_claim(&page_ref.url) {
                            branches.push(self.crawl_page(CrawlTask {
                                url: page_ref.url,
                                remaining_depth: task.remaining_depth - 1,
                            }));
                        } else {
                            debug!(url = %page_ref.url, "link already claimed");
                        }
                    }
                    // an image that a later link on the same page also points at is
                    // settled before that link gets to claim the URL
                    RefKind::Image if last_link.get(&page_ref.url).is_some_and(|&l| l > idx) => {
                        self.harvest_image(page_ref.url).await;
                    }
                    RefKind::Image => branches.push(self.harvest_image(page_ref.url).boxed()),
                }
            }

            while branches.next().await.is_some() {}
        }
        .boxed()
    }

    // Classify, claim, download. Rejected images are left unclaimed so a
    // later reference to the same URL gets its own probe.
    async fn harvest_image(&self, url: AbsoluteUrl) {
        let probed = {
            let _permit = self.permits.acquire().await;
            harvest::classify(&self.client, &url).await
        };

        let image_type = match probed {
            Ok(subtype) => match ImageType::from_subtype(&subtype) {
                Some(image_type) => image_type,
                None => {
                    debug!(url = %url, subtype = %subtype, "not an accepted image type");
                    self.stats.images_rejected.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            },
            Err(e) => {
                warn!(url = %url, error = %e, "could not classify image");
                self.stats.images_rejected.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        if !self.ledger.try_claim(&url) {
            debug!(url = %url, "image already claimed");
            return;
        }

        let result = {
            let _permit = self.permits.acquire().await;
            harvest::download(&self.client, &url, image_type, &self.config.save_dir).await
        };

        match result {
            Ok(record) => {
                println!("{} : image downloaded.", url);
                info!(
                    url = %url,
                    image_type = %record.image_type,
                    path = %record.local_path.display(),
                    "saved image"
                );
                self.downloaded.lock().await.push(record);
            }
            Err(e) => {
                println!("{} : could not download image ({}).", url, e);
                self.stats.download_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why can't crawl_page just be an `async fn`?
//    - An async fn compiles to a state machine that contains its own awaits
//    - If it awaits itself, the state machine would contain itself (infinite size)
//    - Boxing the future puts the recursive part on the heap, so the size is known
//
// 2. What does FuturesUnordered do here?
//    - It holds all the branches of one page (child pages and images)
//    - .next().await yields whichever finishes first
//    - The loop ends once every branch is done
//
// 3. Why a Semaphore?
//    - Without it, a page with 500 images starts 500 requests at once
//    - Each request holds a permit only while it is on the network
//    - Permits are released before recursing, so branches can't deadlock
//
// 4. Why claim links before running the branches?
//    - try_claim runs synchronously in document order
//    - A URL seen twice on the same page is only ever scheduled once
//    - The one exception is an <img> followed later by an <a> to the same
//      URL: the image is harvested on the spot, so it gets the first claim
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(save_dir: &std::path::Path, depth: usize) -> CrawlConfig {
        CrawlConfig {
            save_dir: save_dir.to_path_buf(),
            depth,
            timeout: Duration::from_secs(5),
            concurrency: 4,
        }
    }

    fn seed(server: &MockServer, p: &str) -> AbsoluteUrl {
        AbsoluteUrl::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    async fn page(server: &MockServer, p: &str, html: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .expect(times)
            .mount(server)
            .await;
    }

    async fn image(server: &MockServer, p: &str, content_type: &str, downloads: u64) {
        Mock::given(method("HEAD"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", content_type))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(p.as_bytes().to_vec()))
            .expect(downloads)
            .mount(server)
            .await;
    }

    fn saved_files(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_single_page_downloads_image_but_not_links() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<a href="./b.html">B</a><img src="cat.jpg">"#, 1).await;
        page(&server, "/b.html", "<html></html>", 0).await;
        image(&server, "/cat.jpg", "image/jpeg", 1).await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 1)).unwrap();
        let report = crawler.run(seed(&server, "/")).await;

        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.downloaded.len(), 1);
        assert_eq!(report.downloaded[0].image_type, ImageType::Jpeg);
        assert_eq!(saved_files(dir.path()), vec!["cat.jpeg"]);
    }

    #[tokio::test]
    async fn test_back_link_to_seed_is_not_refetched() {
        let server = MockServer::start().await;
        page(&server, "/index.html", r#"<a href="/b.html">B</a>"#, 1).await;
        page(&server, "/b.html", r#"<a href="/index.html">Home</a>"#, 1).await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 3)).unwrap();
        let report = crawler.run(seed(&server, "/index.html")).await;

        assert_eq!(report.pages_fetched, 2);
    }

    #[tokio::test]
    async fn test_non_image_content_type_is_rejected() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<img src="/fake.jpg">"#, 1).await;
        image(&server, "/fake.jpg", "text/html; charset=utf-8", 0).await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 1)).unwrap();
        let report = crawler.run(seed(&server, "/")).await;

        assert_eq!(report.images_rejected, 1);
        assert!(report.downloaded.is_empty());
        assert!(saved_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_image_shared_between_pages_downloads_once() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<a href="/a.html">A</a><a href="/b.html">B</a>"#, 1).await;
        page(&server, "/a.html", r#"<img src="/shared.png">"#, 1).await;
        page(&server, "/b.html", r#"<img src="/shared.png?v=2">"#, 1).await;
        image(&server, "/shared.png", "image/png", 1).await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 2)).unwrap();
        let report = crawler.run(seed(&server, "/")).await;

        assert_eq!(report.pages_fetched, 3);
        assert_eq!(report.downloaded.len(), 1);
        assert_eq!(saved_files(dir.path()), vec!["shared.png"]);
    }

    #[tokio::test]
    async fn test_url_claimed_as_link_is_not_downloaded() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<a href="/pic.gif">Pic</a><img src="/pic.gif">"#, 1).await;
        image(&server, "/pic.gif", "image/gif", 0).await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 1)).unwrap();
        let report = crawler.run(seed(&server, "/")).await;

        assert!(report.downloaded.is_empty());
    }

    #[tokio::test]
    async fn test_image_seen_before_link_is_downloaded() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<img src="/pic.gif"><a href="/pic.gif">Pic</a>"#, 1).await;
        image(&server, "/pic.gif", "image/gif", 1).await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 2)).unwrap();
        let report = crawler.run(seed(&server, "/")).await;

        // downloaded as an image, and the later link doesn't fetch it again
        assert_eq!(report.downloaded.len(), 1);
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(saved_files(dir.path()), vec!["pic.gif"]);
    }

    #[tokio::test]
    async fn test_rejected_image_can_be_accepted_later() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<a href="/a.html">A</a><a href="/b.html">B</a>"#, 1).await;
        page(&server, "/a.html", r#"<img src="/x.png">"#, 1).await;
        page(&server, "/b.html", r#"<img src="/x.png">"#, 1).await;
        // first probe says html, every later one says png
        Mock::given(method("HEAD"))
            .and(path("/x.png"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/x.png"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/x.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 2)).unwrap();
        let report = crawler.run(seed(&server, "/")).await;

        assert_eq!(report.images_rejected, 1);
        assert_eq!(report.downloaded.len(), 1);
        assert_eq!(saved_files(dir.path()), vec!["x.png"]);
    }

    #[tokio::test]
    async fn test_same_filename_on_different_paths() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<img src="/x/a.jpg"><img src="/y/a.jpg">"#, 1).await;
        image(&server, "/x/a.jpg", "image/jpg", 1).await;
        image(&server, "/y/a.jpg", "image/jpg", 1).await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 1)).unwrap();
        let report = crawler.run(seed(&server, "/")).await;

        assert_eq!(report.downloaded.len(), 2);
        assert_eq!(saved_files(dir.path()), vec!["a-1.jpg", "a.jpg"]);
    }

    #[tokio::test]
    async fn test_failed_page_does_not_stop_siblings() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<a href="/broken.html">X</a><a href="/ok.html">Y</a>"#, 1).await;
        Mock::given(method("GET"))
            .and(path("/broken.html"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        page(&server, "/ok.html", r#"<img src="/dog.bmp">"#, 1).await;
        image(&server, "/dog.bmp", "image/bmp", 1).await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 2)).unwrap();
        let report = crawler.run(seed(&server, "/")).await;

        assert_eq!(report.page_failures, 1);
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(saved_files(dir.path()), vec!["dog.bmp"]);
    }

    #[tokio::test]
    async fn test_failed_download_is_counted() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<img src="/gone.png">"#, 1).await;
        Mock::given(method("HEAD"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 1)).unwrap();
        let report = crawler.run(seed(&server, "/")).await;

        assert_eq!(report.download_failures, 1);
        assert!(saved_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_depth_zero_fetches_nothing() {
        let server = MockServer::start().await;
        page(&server, "/", "<html></html>", 0).await;

        let dir = tempfile::tempdir().unwrap();
        let crawler = Crawler::new(config(dir.path(), 0)).unwrap();
        let report = crawler.run(seed(&server, "/")).await;

        assert_eq!(report.pages_fetched, 0);
    }
}
