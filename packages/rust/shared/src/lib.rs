//! Shared types, error model, and configuration for polycrawl.
//!
//! This crate is the foundation depended on by all other polycrawl crates.
//! It provides:
//! - [`PolycrawlError`] — the unified error type
//! - Domain types ([`Decision`], [`PageDocument`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], [`FreshnessOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlerConfig, FreshnessConfig, FreshnessOptions, IndexConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_config,
    validate_service_config,
};
pub use error::{PolycrawlError, Result};
pub use types::{Decision, PageDocument};
