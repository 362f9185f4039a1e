//! Declared-charset detection and whole-document transcoding.
//!
//! Pages in legacy CJK encodings declare themselves through `<meta>` hints.
//! [`detect_and_decode`] reads those hints from a lossy parse of the raw bytes
//! and, when the declared encoding is one we support, converts the entire
//! body to UTF-8 before anything else looks at it.

use std::borrow::Cow;
use std::sync::LazyLock;

use encoding_rs::{
    BIG5_INIT, EUC_JP_INIT, EUC_KR_INIT, Encoding, GB18030_INIT, GBK_INIT, ISO_2022_JP_INIT,
    SHIFT_JIS_INIT,
};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// Label reported when no transcoding happened.
pub const CANONICAL_LABEL: &str = "utf-8";

/// Supported legacy encodings, keyed by lowercase label.
///
/// `gb2312` is decoded as GB18030, a strict superset.
static LEGACY_ENCODINGS: &[(&str, &Encoding)] = &[
    ("gbk", &GBK_INIT),
    ("gb2312", &GB18030_INIT),
    ("gb18030", &GB18030_INIT),
    ("big5", &BIG5_INIT),
    ("x-sjis", &SHIFT_JIS_INIT),
    ("shift_jis", &SHIFT_JIS_INIT),
    ("shift-jis", &SHIFT_JIS_INIT),
    ("x-euc", &EUC_JP_INIT),
    ("x_euc", &EUC_JP_INIT),
    ("euc-jp", &EUC_JP_INIT),
    ("iso-2022-jp", &ISO_2022_JP_INIT),
    ("csiso2022jp", &ISO_2022_JP_INIT),
    ("euc-kr", &EUC_KR_INIT),
    ("euc_kr", &EUC_KR_INIT),
];

static META_CHARSET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[charset]").expect("valid selector"));

static META_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[content]").expect("valid selector"));

/// Result of [`detect_and_decode`].
#[derive(Debug, Clone)]
pub struct Decoded<'a> {
    /// UTF-8 bytes. Borrowed when the input was passed through untouched.
    pub bytes: Cow<'a, [u8]>,
    /// Name of the encoding the bytes were decoded from.
    pub label: &'static str,
    /// Malformed sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

impl Decoded<'_> {
    /// Whether the input was transcoded.
    pub fn transcoded(&self) -> bool {
        matches!(self.bytes, Cow::Owned(_))
    }

    /// Consume into a `String`, replacing invalid UTF-8 in pass-through input.
    pub fn into_text(self) -> String {
        match self.bytes {
            Cow::Borrowed(b) => String::from_utf8_lossy(b).into_owned(),
            Cow::Owned(v) => String::from_utf8(v)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
        }
    }
}

/// Look up a supported legacy encoding by label, ignoring ASCII case.
///
/// Returns `None` for UTF-8 and for anything unrecognized; both mean "no-op".
pub fn lookup_encoding(label: &str) -> Option<&'static Encoding> {
    let label = label.trim();
    LEGACY_ENCODINGS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label))
        .map(|(_, enc)| *enc)
}

/// Find the charset a page declares for itself, lowercased.
///
/// Priority: the first non-empty `<meta charset>`, then the first
/// `<meta content>` carrying `charset="X"` (quoted form checked first) or
/// `charset=X`.
pub fn declared_charset(raw: &[u8]) -> Option<String> {
    static QUOTED: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?i)charset="(\S+?)""#).expect("valid regex"));
    static BARE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?i)charset=([^\s;"']+)"#).expect("valid regex"));

    let doc = Html::parse_document(&String::from_utf8_lossy(raw));

    let from_charset = doc
        .select(&META_CHARSET)
        .filter_map(|el| el.value().attr("charset"))
        .map(str::trim)
        .find(|v| !v.is_empty());
    if let Some(v) = from_charset {
        return Some(v.to_lowercase());
    }

    doc.select(&META_CONTENT)
        .filter_map(|el| el.value().attr("content"))
        .find_map(|content| {
            QUOTED
                .captures(content)
                .or_else(|| BARE.captures(content))
                .map(|caps| caps[1].to_lowercase())
        })
}

/// Detect the declared encoding of `raw` and transcode it to UTF-8.
///
/// Unknown or UTF-8 declarations pass the input through byte-for-byte.
pub fn detect_and_decode(raw: &[u8]) -> Decoded<'_> {
    let passthrough = || Decoded {
        bytes: Cow::Borrowed(raw),
        label: CANONICAL_LABEL,
        had_errors: false,
    };

    let Some(label) = declared_charset(raw) else {
        return passthrough();
    };
    let Some(encoding) = lookup_encoding(&label) else {
        debug!(%label, "declared charset needs no transcoding");
        return passthrough();
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(raw);
    debug!(%label, encoding = encoding.name(), had_errors, "transcoded to utf-8");

    Decoded {
        bytes: Cow::Owned(text.into_owned().into_bytes()),
        label: encoding.name(),
        had_errors,
    }
}
