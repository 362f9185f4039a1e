//! Assembly of the [`PageDocument`] posted to the index for each fetched page.

use std::sync::LazyLock;

use polycrawl_shared::{PageDocument, Result};
use polycrawl_text::TreeExtractor;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};

use crate::resolve::resolve;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static META_NAMED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name][content]").expect("valid selector"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("valid selector"));
static HEADINGS: LazyLock<[Selector; 4]> = LazyLock::new(|| {
    ["h1", "h2", "h3", "h4"].map(|h| Selector::parse(h).expect("valid selector"))
});

/// Build the index document for a UTF-8 page fetched from `url`.
///
/// Every `href` is resolved against `url`; an [`InvalidBase`] error means
/// `url` itself is malformed.
///
/// [`InvalidBase`]: polycrawl_shared::PolycrawlError::InvalidBase
pub fn build_document(url: &str, html: &str, updated: u32) -> Result<PageDocument> {
    let doc = Html::parse_document(html);
    let text = TreeExtractor.extract_document(&doc);

    let [h1, h2, h3, h4] = HEADINGS
        .each_ref()
        .map(|sel| doc.select(sel).map(element_text).collect::<Vec<_>>());

    let mut links = Vec::new();
    let mut outlinks = Vec::new();
    for a in doc.select(&ANCHOR) {
        links.push(element_text(a));
        if let Some(href) = a.value().attr("href").map(str::trim)
            && is_followable(href)
        {
            outlinks.push(resolve(url, href)?);
        }
    }

    Ok(PageDocument {
        id: guid_for(url),
        url: url.to_string(),
        updated,
        title: doc
            .select(&TITLE)
            .next()
            .map(|t| clean_text(&element_text(t)))
            .unwrap_or_default(),
        keywords: meta_content(&doc, "keywords"),
        description: meta_content(&doc, "description"),
        h1,
        h2,
        h3,
        h4,
        links,
        outlinks,
        content_general: text.general,
        content_chinese: text.chinese,
        content_japanese: text.japanese,
    })
}

/// Stable GUID-shaped identifier: the first 16 bytes of SHA-256(url) as `8-4-4-4-12` hex.
pub fn guid_for(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex = |range: std::ops::Range<usize>| {
        digest[range]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>()
    };
    format!(
        "{}-{}-{}-{}-{}",
        hex(0..4),
        hex(4..6),
        hex(6..8),
        hex(8..10),
        hex(10..16)
    )
}

/// Links worth queueing: no in-page anchors or non-HTTP pseudo-schemes.
fn is_followable(href: &str) -> bool {
    !(href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:"))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Flatten every whitespace run to a single space.
fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn meta_content(doc: &Html, name: &str) -> String {
    doc.select(&META_NAMED)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|el| el.value().attr("content"))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polycrawl_shared::PolycrawlError;

    const PAGE: &str = r##"<html><head>
        <title>
            Example   Page
        </title>
        <meta name="Keywords" content="rust, crawler">
        <meta name="description" content="A test page">
        <script>var s = "hidden";</script>
    </head><body>
        <h1>Top</h1>
        <h2>Second A</h2><h2>Second B</h2>
        <h4>Fourth</h4>
        <p>Hello 世界 こんにちは</p>
        <a href="../up">Up</a>
        <a href="/root">Root</a>
        <a href="javascript:void(0)">JS</a>
        <a href="#section">Anchor</a>
        <a>No href</a>
    </body></html>"##;

    #[test]
    fn builds_all_fields() {
        let doc = build_document("http://example.com/a/b", PAGE, 42).expect("build");

        assert_eq!(doc.url, "http://example.com/a/b");
        assert_eq!(doc.updated, 42);
        assert_eq!(doc.title, "Example Page");
        assert_eq!(doc.keywords, "rust, crawler");
        assert_eq!(doc.description, "A test page");
        assert_eq!(doc.h1, vec!["Top"]);
        assert_eq!(doc.h2, vec!["Second A", "Second B"]);
        assert!(doc.h3.is_empty());
        assert_eq!(doc.h4, vec!["Fourth"]);
    }

    #[test]
    fn collects_anchor_text_and_followable_targets() {
        let doc = build_document("http://example.com/a/b", PAGE, 0).expect("build");

        assert_eq!(doc.links, vec!["Up", "Root", "JS", "Anchor", "No href"]);
        assert_eq!(
            doc.outlinks,
            vec!["http://example.com/up", "http://example.com/root"]
        );
    }

    #[test]
    fn splits_content_by_script() {
        let doc = build_document("http://example.com/", PAGE, 0).expect("build");

        assert!(doc.content_general.contains("Hello"));
        assert!(!doc.content_general.contains("世界"));
        assert!(!doc.content_general.contains("hidden"));
        assert!(doc.content_chinese.contains("Hello 世界"));
        assert!(!doc.content_chinese.contains("こんにちは"));
        assert!(doc.content_japanese.contains("Hello 世界 こんにちは"));
    }

    #[test]
    fn malformed_base_fails_when_links_need_resolving() {
        let err = build_document("mailto:x", r#"<a href="page">p</a>"#, 0).unwrap_err();
        assert!(matches!(err, PolycrawlError::InvalidBase { .. }));
    }

    #[test]
    fn guid_is_stable_and_shaped() {
        let a = guid_for("http://example.com/");
        let b = guid_for("http://example.com/");
        assert_eq!(a, b);
        assert_ne!(a, guid_for("http://example.com/other"));

        let groups: Vec<usize> = a.split('-').map(str::len).collect();
        assert_eq!(groups, vec![8, 4, 4, 4, 12]);
    }
}
