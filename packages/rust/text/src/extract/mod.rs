//! Script-partitioned plain-text extraction.
//!
//! Page text is split into three parallel streams while walking the markup:
//!
//! | character class     | general | chinese | japanese |
//! |---------------------|:-------:|:-------:|:--------:|
//! | Han                 |         |    x    |    x     |
//! | Hiragana / Katakana |         |         |    x     |
//! | everything else     |    x    |    x    |    x     |
//!
//! Whitespace collapses to a single space independently in each stream.
//! Text under `script`, `style` and `link` elements is never emitted.
//!
//! Two extractors implement [`TextExtractor`]: [`TreeExtractor`] walks a
//! parsed `scraper` document, [`ScannerExtractor`] skims raw markup without
//! building a tree.

mod scanner;
mod tree;

use unicode_script::{Script, UnicodeScript};

pub use scanner::ScannerExtractor;
pub use tree::TreeExtractor;

/// Elements whose text never reaches any stream.
pub(crate) const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "link"];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The three text streams extracted from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptText {
    /// Every character except Han and kana.
    pub general: String,
    /// General characters plus Han.
    pub chinese: String,
    /// General characters plus Han and kana.
    pub japanese: String,
}

impl ScriptText {
    /// True when all three streams are empty.
    pub fn is_empty(&self) -> bool {
        self.general.is_empty() && self.chinese.is_empty() && self.japanese.is_empty()
    }
}

/// Extracts a [`ScriptText`] bundle from markup.
pub trait TextExtractor: Send + Sync {
    /// Extract the per-script text streams from an HTML string.
    fn extract(&self, html: &str) -> ScriptText;

    /// Human-readable extractor name for tracing.
    fn name(&self) -> &str;
}

/// Routing class of a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    /// Space, tab, newline or carriage return.
    Space,
    /// Han ideographs.
    Han,
    /// Hiragana or Katakana.
    Kana,
    /// Anything else.
    Other,
}

/// Classify a character for stream routing.
pub fn classify(c: char) -> ScriptClass {
    match c {
        ' ' | '\t' | '\n' | '\r' => ScriptClass::Space,
        _ => match c.script() {
            Script::Han => ScriptClass::Han,
            Script::Hiragana | Script::Katakana => ScriptClass::Kana,
            _ => ScriptClass::Other,
        },
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Accumulates routed characters into the three streams.
#[derive(Debug, Default)]
pub(crate) struct ScriptSink {
    text: ScriptText,
}

impl ScriptSink {
    pub(crate) fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            self.push_char(c);
        }
    }

    pub(crate) fn push_char(&mut self, c: char) {
        let t = &mut self.text;
        match classify(c) {
            ScriptClass::Space => {
                push_space(&mut t.general);
                push_space(&mut t.chinese);
                push_space(&mut t.japanese);
            }
            ScriptClass::Kana => t.japanese.push(c),
            ScriptClass::Han => {
                t.chinese.push(c);
                t.japanese.push(c);
            }
            ScriptClass::Other => {
                t.general.push(c);
                t.chinese.push(c);
                t.japanese.push(c);
            }
        }
    }

    /// Append text to the general stream only, unrouted.
    pub(crate) fn push_general_verbatim(&mut self, s: &str) {
        self.text.general.push_str(s);
    }

    /// Trim the trailing collapsed space of every stream and return them.
    pub(crate) fn finish(self) -> ScriptText {
        let ScriptText {
            mut general,
            mut chinese,
            mut japanese,
        } = self.text;
        for s in [&mut general, &mut chinese, &mut japanese] {
            if s.ends_with(' ') {
                s.pop();
            }
        }
        ScriptText {
            general,
            chinese,
            japanese,
        }
    }
}

/// Push a single separating space unless the stream is empty or already ends in one.
fn push_space(buf: &mut String) {
    if !buf.is_empty() && !buf.ends_with(' ') {
        buf.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractors() -> [Box<dyn TextExtractor>; 2] {
        [Box::new(TreeExtractor), Box::new(ScannerExtractor)]
    }

    #[test]
    fn classify_routes_by_script() {
        assert_eq!(classify('A'), ScriptClass::Other);
        assert_eq!(classify('7'), ScriptClass::Other);
        assert_eq!(classify('中'), ScriptClass::Han);
        assert_eq!(classify('あ'), ScriptClass::Kana);
        assert_eq!(classify('カ'), ScriptClass::Kana);
        assert_eq!(classify('한'), ScriptClass::Other);
        assert_eq!(classify('\t'), ScriptClass::Space);
    }

    #[test]
    fn script_only_markup_is_empty() {
        for ex in extractors() {
            let text = ex.extract("<script>var title = \"中文 あ\";</script>");
            assert!(text.is_empty(), "{}: {text:?}", ex.name());
        }
    }

    #[test]
    fn mixed_scripts_route_cumulatively() {
        for ex in extractors() {
            let text = ex.extract("<p>A中あ</p>");
            assert_eq!(text.general, "A", "{}", ex.name());
            assert_eq!(text.chinese, "A中", "{}", ex.name());
            assert_eq!(text.japanese, "A中あ", "{}", ex.name());
        }
    }

    #[test]
    fn japanese_sentence_splits_han_from_kana() {
        for ex in extractors() {
            let text = ex.extract("<p>日本語のテキスト</p>");
            assert_eq!(text.general, "", "{}", ex.name());
            assert_eq!(text.chinese, "日本語", "{}", ex.name());
            assert_eq!(text.japanese, "日本語のテキスト", "{}", ex.name());
        }
    }

    #[test]
    fn whitespace_collapses_per_stream() {
        for ex in extractors() {
            let text = ex.extract("<body>  <p>Hello \n\t  world</p>\n<p>中 中</p>  </body>");
            assert_eq!(text.general, "Hello world", "{}", ex.name());
            assert_eq!(text.chinese, "Hello world 中 中", "{}", ex.name());
            assert_eq!(text.japanese, "Hello world 中 中", "{}", ex.name());
        }
    }

    #[test]
    fn style_and_link_are_skipped() {
        for ex in extractors() {
            let text = ex.extract(
                "<head><link rel=\"stylesheet\" href=\"a.css\"><style>p { color: red }</style></head><body><p>after</p></body>",
            );
            assert_eq!(text.general, "after", "{}", ex.name());
        }
    }

    #[test]
    fn entities_are_decoded_once() {
        for ex in extractors() {
            let text = ex.extract("<p>fish &amp; chips &amp;lt;3</p>");
            assert_eq!(text.general, "fish & chips &lt;3", "{}", ex.name());
        }
    }
}
