//! Tag-skipping scanner over raw markup, for when no tree is available.
//!
//! Text between tags goes straight to the sink. `script`/`style` bodies are
//! dropped wholesale, and entity references are decoded once over each
//! finished stream.

use super::{ScriptSink, ScriptText, TextExtractor};

/// Opening tags longer than this are not markup; their raw text goes to the general stream.
const MAX_TAG_LEN: usize = 512;

/// Elements whose body is raw text up to the matching close tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Extracts text from raw markup without building a tree.
pub struct ScannerExtractor;

impl TextExtractor for ScannerExtractor {
    fn extract(&self, html: &str) -> ScriptText {
        let mut sink = ScriptSink::default();
        let mut rest = html;

        loop {
            let Some(lt) = rest.find('<') else {
                emit_text(&mut sink, rest);
                break;
            };
            emit_text(&mut sink, &rest[..lt]);
            let after = &rest[lt + 1..];

            if let Some(comment) = after.strip_prefix("!--") {
                match comment.find("-->") {
                    Some(end) => {
                        rest = &comment[end + 3..];
                        continue;
                    }
                    None => break,
                }
            }

            // An unterminated tag swallows the rest of the input.
            let Some(gt) = after.find('>') else {
                break;
            };
            let raw = &after[..=gt];
            rest = &after[gt + 1..];

            match parse_tag(raw) {
                Tag::Open(_) if raw.chars().count() > MAX_TAG_LEN => {
                    sink.push_general_verbatim("<");
                    sink.push_general_verbatim(raw);
                }
                Tag::Open(name) => {
                    if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                        rest = skip_raw_text(rest, &name);
                    }
                }
                Tag::Close | Tag::Declaration => {}
            }
        }

        let ScriptText {
            general,
            chinese,
            japanese,
        } = sink.finish();
        ScriptText {
            general: html_escape::decode_html_entities(&general).into_owned(),
            chinese: html_escape::decode_html_entities(&chinese).into_owned(),
            japanese: html_escape::decode_html_entities(&japanese).into_owned(),
        }
    }

    fn name(&self) -> &str {
        "scanner"
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Tag {
    Open(String),
    Close,
    /// `<!DOCTYPE ...>`, `<?xml ...?>` and friends.
    Declaration,
}

/// Parse the text between `<` and `>` (inclusive of the `>`).
fn parse_tag(raw: &str) -> Tag {
    let inner = raw.strip_suffix('>').unwrap_or(raw);
    if inner.starts_with('!') || inner.starts_with('?') {
        return Tag::Declaration;
    }

    if inner.starts_with('/') {
        return Tag::Close;
    }

    let name = inner
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '/' && *c != '>')
        .collect::<String>()
        .to_ascii_lowercase();
    Tag::Open(name)
}

/// Skip past the body of a raw-text element, leaving `rest` at its close tag.
fn skip_raw_text<'a>(rest: &'a str, name: &str) -> &'a str {
    let needle = format!("</{name}");
    // ASCII lowercasing keeps byte offsets intact.
    match rest.to_ascii_lowercase().find(&needle) {
        Some(i) => &rest[i..],
        None => "",
    }
}

fn emit_text(sink: &mut ScriptSink, text: &str) {
    if !text.is_empty() {
        sink.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::TreeExtractor;

    #[test]
    fn parses_tag_names() {
        assert_eq!(parse_tag("DIV class=\"x\">"), Tag::Open("div".into()));
        assert_eq!(parse_tag("/P>"), Tag::Close);
        assert_eq!(parse_tag("br/>"), Tag::Open("br".into()));
        assert_eq!(parse_tag("!DOCTYPE html>"), Tag::Declaration);
    }

    #[test]
    fn text_after_link_tag_is_kept() {
        let html = "<p><link rel=\"stylesheet\" href=\"a.css\">after 中</p>";
        let scanned = ScannerExtractor.extract(html);
        assert_eq!(scanned.general, "after");
        assert_eq!(scanned.chinese, "after 中");

        let tree = TreeExtractor.extract(html);
        assert_eq!(scanned, tree);
    }

    #[test]
    fn oversized_tag_goes_to_general_verbatim() {
        let junk = format!("<x{}>", "a".repeat(600));
        let text = ScannerExtractor.extract(&format!("<p>before</p>{junk}<p>中</p>"));

        assert_eq!(text.general, format!("before{junk}"));
        assert_eq!(text.chinese, "before中");
    }

    #[test]
    fn angle_brackets_inside_script_do_not_leak() {
        let text = ScannerExtractor
            .extract("<script>if (a<b && c>d) { run(\"<p>no</p>\") }</SCRIPT><p>ok</p>");
        assert_eq!(text.general, "ok");
    }

    #[test]
    fn comments_are_skipped() {
        let text = ScannerExtractor.extract("<p>a<!-- <b>hidden</b> -->b</p>");
        assert_eq!(text.general, "ab");
    }

    #[test]
    fn unterminated_tag_ends_input() {
        let text = ScannerExtractor.extract("<p>visible</p><div class=\"broken");
        assert_eq!(text.general, "visible");
    }

    #[test]
    fn unmatched_close_tag_is_ignored() {
        let text = ScannerExtractor.extract("<div>one</span> two</div>");
        assert_eq!(text.general, "one two");
    }
}
