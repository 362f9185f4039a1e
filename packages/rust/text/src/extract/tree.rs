//! Tree-walking extractor over a parsed `scraper` document.

use scraper::{Html, Node};

use super::{SKIPPED_ELEMENTS, ScriptSink, ScriptText, TextExtractor};

/// Extracts text by walking the text nodes of a parsed document in order.
///
/// Entity references were already decoded by the parser, so no further
/// unescaping happens here.
pub struct TreeExtractor;

impl TreeExtractor {
    /// Extract from an already-parsed document.
    pub fn extract_document(&self, doc: &Html) -> ScriptText {
        let mut sink = ScriptSink::default();

        for node in doc.root_element().descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            let skipped = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
            });
            if !skipped {
                sink.push_str(text);
            }
        }

        sink.finish()
    }
}

impl TextExtractor for TreeExtractor {
    fn extract(&self, html: &str) -> ScriptText {
        self.extract_document(&Html::parse_document(html))
    }

    fn name(&self) -> &str {
        "tree"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_parsed_document() {
        let doc = Html::parse_document(
            "<html><head><title>題名</title></head><body><div><span>x</span>y</div></body></html>",
        );
        let text = TreeExtractor.extract_document(&doc);
        assert_eq!(text.general, "xy");
        assert_eq!(text.chinese, "題名xy");
    }

    #[test]
    fn nested_script_text_is_dropped() {
        let text = TreeExtractor.extract(
            "<body><div>keep<script>drop()</script> this</div><noscript>fallback</noscript></body>",
        );
        assert!(text.general.starts_with("keep this"));
        assert!(!text.general.contains("drop"));
    }
}
