//! Byte-level and text-level page normalization.
//!
//! This crate provides:
//! - [`charset`] — declared-charset sniffing and one-shot transcoding to UTF-8
//! - [`extract`] — script-partitioned plain-text extraction ([`TreeExtractor`], [`ScannerExtractor`])

pub mod charset;
pub mod extract;

pub use charset::{Decoded, declared_charset, detect_and_decode, lookup_encoding};
pub use extract::{
    ScannerExtractor, ScriptClass, ScriptText, TextExtractor, TreeExtractor, classify,
};
