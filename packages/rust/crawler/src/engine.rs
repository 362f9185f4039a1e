//! Sequential crawl driver.
//!
//! URLs are taken from a FIFO frontier one at a time: consult the freshness
//! cache, fetch a capped body, reject empty or binary bodies, transcode to
//! UTF-8, build the page document, queue its outlinks and post it to the
//! index. Nothing overlaps; each page is finished before the next is dequeued.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use polycrawl_shared::{CrawlConfig, PolycrawlError, Result};
use polycrawl_storage::FreshnessCache;
use polycrawl_text::detect_and_decode;

use crate::index::IndexClient;
use crate::page::build_document;

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("polycrawl/", env!("CARGO_PKG_VERSION"));

/// A body is treated as binary when more than `len / BINARY_RATIO` bytes exceed this.
const BINARY_BYTE_THRESHOLD: u8 = 0xF0;
const BINARY_RATIO: usize = 20;

// ---------------------------------------------------------------------------
// Progress + results
// ---------------------------------------------------------------------------

/// Progress callbacks for a running crawl.
pub trait CrawlProgress: Send + Sync {
    /// A page was fetched and processed.
    fn page_fetched(&self, url: &str, fetched: usize, queued: usize);
    /// A URL was not fetched, or its body was rejected.
    fn page_skipped(&self, url: &str, reason: &str);
    /// The crawl finished.
    fn done(&self, result: &CrawlResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl CrawlProgress for SilentProgress {
    fn page_fetched(&self, _url: &str, _fetched: usize, _queued: usize) {}
    fn page_skipped(&self, _url: &str, _reason: &str) {}
    fn done(&self, _result: &CrawlResult) {}
}

/// Summary of a completed crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    /// Pages fetched and turned into documents.
    pub pages_fetched: usize,
    /// URLs the freshness cache reported as fresh.
    pub pages_fresh: usize,
    /// URLs whose fetch failed or whose body was rejected.
    pub pages_skipped: usize,
    /// Documents accepted by the index.
    pub pages_indexed: usize,
    /// Errors encountered (URL, error message).
    pub errors: Vec<(String, String)>,
    /// Total duration of the crawl.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

pub struct Crawler {
    config: CrawlConfig,
    client: Client,
    index: Option<IndexClient>,
}

impl Crawler {
    /// Create a crawler with the given configuration and no index.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PolycrawlError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            index: None,
        })
    }

    /// Post every built document to `endpoint`.
    pub fn with_index(mut self, endpoint: impl Into<String>) -> Self {
        self.index = Some(IndexClient::new(self.client.clone(), endpoint));
        self
    }

    /// Crawl outward from `seeds` until the frontier is empty or the page
    /// budget is spent.
    ///
    /// Per-page failures are logged and recorded in the result. Only a
    /// malformed page URL that cannot serve as a resolution base aborts the run.
    #[instrument(skip_all, fields(seeds = seeds.len()))]
    pub async fn crawl(
        &self,
        seeds: &[String],
        freshness: Option<&FreshnessCache>,
        progress: &dyn CrawlProgress,
    ) -> Result<CrawlResult> {
        let start_time = Instant::now();
        let freshness = freshness.filter(|_| self.config.use_freshness);

        let mut frontier: VecDeque<String> = seeds.iter().cloned().collect();
        let mut visited: HashSet<String> = HashSet::new();
        let mut result = CrawlResult::default();
        let mut first_fetch = true;

        info!(
            delay_ms = self.config.request_delay_ms,
            max_pages = self.config.max_pages,
            freshness = freshness.is_some(),
            index = self.index.is_some(),
            "starting crawl"
        );

        while let Some(url) = frontier.pop_front() {
            if self.config.max_pages > 0 && result.pages_fetched >= self.config.max_pages {
                debug!(remaining = frontier.len() + 1, "page budget reached");
                break;
            }
            if !visited.insert(url.clone()) {
                continue;
            }

            if let Some(cache) = freshness {
                match cache.check(&url).await {
                    Ok(decision) if !decision.should_fetch() => {
                        result.pages_fresh += 1;
                        progress.page_skipped(&url, "fresh");
                        continue;
                    }
                    Ok(decision) => debug!(%url, %decision, "freshness check"),
                    Err(e) => warn!(%url, error = %e, "freshness check failed, fetching anyway"),
                }
            }

            if !first_fetch && self.config.request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
            }
            first_fetch = false;

            let body = match self.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(%url, error = %e, "fetch failed");
                    self.reject(&mut result, progress, &url, e.to_string());
                    continue;
                }
            };
            if body.is_empty() {
                warn!(%url, "empty body");
                self.reject(&mut result, progress, &url, "empty body".into());
                continue;
            }
            if looks_binary(&body) {
                warn!(%url, len = body.len(), "binary body");
                self.reject(&mut result, progress, &url, "binary body".into());
                continue;
            }

            let decoded = detect_and_decode(&body);
            if decoded.had_errors {
                warn!(%url, charset = decoded.label, "malformed bytes replaced while transcoding");
            }
            let html = decoded.into_text();

            let updated = Utc::now().timestamp().max(0) as u32;
            let doc = build_document(&url, &html, updated)?;

            for link in &doc.outlinks {
                if is_crawlable(link) && !visited.contains(link) {
                    frontier.push_back(link.clone());
                }
            }

            match &self.index {
                Some(index) => match index.post(&doc).await {
                    Ok(_) => result.pages_indexed += 1,
                    Err(e) => {
                        warn!(%url, error = %e, "index post failed");
                        result.errors.push((url.clone(), e.to_string()));
                    }
                },
                None => debug!(%url, title = %doc.title, outlinks = doc.outlinks.len(), "document built"),
            }

            result.pages_fetched += 1;
            progress.page_fetched(&url, result.pages_fetched, frontier.len());
        }

        result.duration = start_time.elapsed();
        info!(
            pages_fetched = result.pages_fetched,
            pages_fresh = result.pages_fresh,
            pages_skipped = result.pages_skipped,
            pages_indexed = result.pages_indexed,
            errors = result.errors.len(),
            duration_ms = result.duration.as_millis(),
            "crawl completed"
        );
        progress.done(&result);

        Ok(result)
    }

    fn reject(
        &self,
        result: &mut CrawlResult,
        progress: &dyn CrawlProgress,
        url: &str,
        reason: String,
    ) {
        progress.page_skipped(url, &reason);
        result.pages_skipped += 1;
        result.errors.push((url.to_string(), reason));
    }

    /// GET `url`, reading at most `max_response_bytes` of the body.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(%url, "fetching page");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PolycrawlError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PolycrawlError::Network(format!("{url}: HTTP {status}")));
        }

        let cap = self.config.max_response_bytes;
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PolycrawlError::Network(format!("{url}: body read failed: {e}")))?
        {
            let room = cap - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= cap {
                debug!(%url, cap, "body truncated");
                break;
            }
        }
        Ok(body)
    }
}

/// More than 1/20 of the bytes above 0xF0 marks a body as binary.
fn looks_binary(body: &[u8]) -> bool {
    let high = body.iter().filter(|&&b| b > BINARY_BYTE_THRESHOLD).count();
    high > body.len() / BINARY_RATIO
}

fn is_crawlable(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
