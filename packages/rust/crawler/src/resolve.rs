//! Lenient, browser-like resolution of link references against a page URL.
//!
//! References are spliced as strings rather than through [`Url::join`];
//! query strings, fragments and unresolvable `..` segments come out exactly
//! as written.

use polycrawl_shared::{PolycrawlError, Result};
use url::{Position, Url};

/// Resolve `reference` against the absolute URL `base`.
///
/// Fails only when `base` is too malformed to split into
/// `scheme://host/path`, which callers should treat as a bug upstream.
pub fn resolve(base: &str, reference: &str) -> Result<String> {
    if reference.is_empty() || reference == "." {
        return Ok(base.to_string());
    }
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Ok(reference.to_string());
    }

    let parsed = Url::parse(base).map_err(|e| PolycrawlError::invalid_base(base, e.to_string()))?;
    let scheme = parsed.scheme();
    let authority = &parsed[Position::BeforeHost..Position::AfterPort];

    let mut lead = format!("{scheme}://{authority}{}", parsed.path());
    if parsed.path().is_empty() {
        lead.push('/');
    }

    if reference.starts_with("//") {
        return Ok(format!("{scheme}:{reference}"));
    }
    if reference.starts_with('#') || reference.starts_with('?') {
        return Ok(lead + reference);
    }
    if reference.starts_with('/') {
        return Ok(format!("{scheme}://{authority}{reference}"));
    }

    let parts: Vec<&str> = lead.split('/').collect();
    if parts.len() < 4 {
        return Err(PolycrawlError::invalid_base(
            base,
            format!("{lead:?} has no host/path separator"),
        ));
    }
    if parts[3].is_empty() {
        return Ok(format!("{scheme}://{authority}/{reference}"));
    }

    let joined = format!("{}/{reference}", parts[..parts.len() - 1].join("/"));
    Ok(collapse_dot_segments(joined))
}

/// Splice out `segment/../` pairs after the scheme separator.
///
/// A `..` with no earlier segment left to consume stays in the output.
fn collapse_dot_segments(mut x: String) -> String {
    loop {
        let Some(sep) = x.find("://") else {
            return x;
        };

        let bytes = x.as_bytes();
        let (mut last, mut prev) = (None, None);
        let mut splice = None;
        let mut i = sep + 3;
        while i < bytes.len() {
            if bytes[i] == b'/' {
                prev = last;
                last = Some(i);
            }
            if bytes[i] == b'.'
                && bytes[i - 1] == b'/'
                && i + 2 < bytes.len()
                && bytes[i + 1] == b'.'
                && bytes[i + 2] == b'/'
            {
                if let Some(p) = prev {
                    splice = Some((p, i));
                    break;
                }
            }
            i += 1;
        }

        match splice {
            Some((p, i)) => x = format!("{}{}", &x[..=p], &x[i + 3..]),
            None => return x,
        }
    }
}
