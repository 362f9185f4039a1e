//! Core domain types shared by the crawler, the freshness cache and the CLI.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Outcome of a freshness check for one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Never seen before; fetch it.
    New,
    /// Seen recently; skip it.
    Fresh,
    /// Seen, but long enough ago that it should be fetched again.
    Stale,
}

impl Decision {
    /// Whether the caller should go ahead and fetch the URL.
    pub fn should_fetch(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Fresh => "fresh",
            Self::Stale => "stale",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// PageDocument
// ---------------------------------------------------------------------------

/// The document record posted to the search index for each crawled page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    /// Stable identifier derived from the URL (GUID-formatted hash).
    pub id: String,
    /// Page URL as fetched.
    pub url: String,
    /// Unix seconds when the page was processed.
    pub updated: u32,
    /// `<title>` text with whitespace runs flattened.
    pub title: String,
    /// `<meta name="keywords">` content.
    pub keywords: String,
    /// `<meta name="description">` content.
    pub description: String,
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    pub h4: Vec<String>,
    /// Anchor text of every `<a>` in document order.
    pub links: Vec<String>,
    /// Resolved `href` targets, the crawl frontier candidates.
    pub outlinks: Vec<String>,
    /// General (non-CJK) text stream.
    #[serde(rename = "content_txt_en")]
    pub content_general: String,
    /// Chinese-readable text stream.
    #[serde(rename = "content_txt_cn")]
    pub content_chinese: String,
    /// Japanese-readable text stream.
    #[serde(rename = "content_txt_jp")]
    pub content_japanese: String,
}
