//! Crawl pipeline: link resolution, page documents, indexing, and the driver.
//!
//! This crate provides:
//! - [`resolve`](mod@resolve) — lenient relative-URL resolution
//! - [`page`] — assembly of the [`PageDocument`](polycrawl_shared::PageDocument) for a fetched page
//! - [`index`] — client for the JSON document store
//! - [`engine`] — sequential, freshness-gated crawler

pub mod engine;
pub mod index;
pub mod page;
pub mod resolve;

pub use engine::{CrawlProgress, CrawlResult, Crawler, SilentProgress};
pub use index::IndexClient;
pub use page::{build_document, guid_for};
pub use resolve::resolve;
