//! CLI command definitions, routing, and tracing setup.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use polycrawl_crawler::{CrawlProgress, CrawlResult, Crawler};
use polycrawl_shared::{
    AppConfig, CrawlConfig, FreshnessOptions, init_config, load_config, load_config_from,
    validate_config, validate_service_config,
};
use polycrawl_storage::{FreshnessCache, fingerprint};

use crate::server::{self, ServiceState};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// polycrawl — crawl pages, split their text per script, and track URL freshness.
#[derive(Parser)]
#[command(
    name = "polycrawl",
    version,
    about = "Freshness-gated web crawler with script-partitioned text extraction.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.polycrawl/polycrawl.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl outward from one or more seed URLs.
    Crawl {
        /// Seed URLs.
        #[arg(required = true)]
        seeds: Vec<String>,

        /// Stop after this many fetched pages (0 = unlimited).
        #[arg(long)]
        max_pages: Option<usize>,

        /// Delay between fetches, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Fetch every URL regardless of the freshness cache.
        #[arg(long)]
        no_freshness: bool,

        /// Build documents without posting them to the index.
        #[arg(long)]
        no_index: bool,

        /// Index endpoint override.
        #[arg(long)]
        index_url: Option<String>,

        /// Freshness database path override.
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Run the freshness HTTP service.
    Serve {
        /// Listen address, e.g. 0.0.0.0:8999.
        #[arg(long)]
        listen: Option<String>,

        /// Shared secret expected in the Password header.
        #[arg(long, env = "POLYCRAWL_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Freshness database path override.
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Record a freshness check for one URL and print the decision.
    Check {
        url: String,

        /// Freshness database path override.
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Show the stored freshness record for a URL without updating it.
    Inspect {
        url: String,

        /// Freshness database path override.
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "polycrawl=info",
        1 => "polycrawl=debug,tower_http=debug",
        _ => "polycrawl=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Crawl {
            seeds,
            max_pages,
            delay_ms,
            no_freshness,
            no_index,
            index_url,
            db,
        } => {
            let mut config = load_app_config(config_path)?;
            if let Some(n) = max_pages {
                config.crawler.max_pages = n;
            }
            if let Some(ms) = delay_ms {
                config.crawler.request_delay_ms = ms;
            }
            if no_freshness {
                config.crawler.use_freshness = false;
            }
            if no_index {
                config.index.enabled = false;
            }
            if let Some(endpoint) = index_url {
                config.index.endpoint = endpoint;
            }
            if let Some(db) = db {
                config.freshness.db_path = db.to_string_lossy().into_owned();
            }
            validate_config(&config)?;
            cmd_crawl(&config, &seeds).await
        }
        Command::Serve {
            listen,
            password,
            db,
        } => {
            let config = serve_config(load_app_config(config_path)?, listen, password, db)?;
            cmd_serve(&config).await
        }
        Command::Check { url, db } => {
            let config = load_app_config(config_path)?;
            cmd_check(&config, db.as_deref(), &url).await
        }
        Command::Inspect { url, db } => {
            let config = load_app_config(config_path)?;
            cmd_inspect(&config, db.as_deref(), &url).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

/// Load the config file named on the command line, or the default one.
///
/// Nothing is validated here; flags still have to be layered on top.
fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Apply `serve` flags over `config`, then check the result.
fn serve_config(
    mut config: AppConfig,
    listen: Option<String>,
    password: Option<String>,
    db: Option<PathBuf>,
) -> Result<AppConfig> {
    if let Some(listen) = listen {
        config.freshness.listen = listen;
    }
    if let Some(password) = password {
        config.freshness.password = password;
    }
    if let Some(db) = db {
        config.freshness.db_path = db.to_string_lossy().into_owned();
    }
    validate_service_config(&config)?;
    Ok(config)
}

async fn open_cache(config: &AppConfig, db_override: Option<&Path>) -> Result<FreshnessCache> {
    let path = db_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.freshness.db_path));
    let cache = FreshnessCache::open(&path, FreshnessOptions::from(config))
        .await
        .wrap_err_with(|| format!("failed to open freshness database {}", path.display()))?;
    Ok(cache)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_crawl(config: &AppConfig, seeds: &[String]) -> Result<()> {
    let crawl_config = CrawlConfig::from(config);

    let cache = if crawl_config.use_freshness {
        Some(open_cache(config, None).await?)
    } else {
        None
    };

    let mut crawler = Crawler::new(crawl_config)?;
    if config.index.enabled {
        crawler = crawler.with_index(config.index.endpoint.clone());
    }

    info!(
        seeds = seeds.len(),
        index = config.index.enabled,
        freshness = cache.is_some(),
        "starting crawl"
    );

    let reporter = CliProgress::new();
    let result = crawler.crawl(seeds, cache.as_ref(), &reporter).await?;

    println!();
    println!("  Crawl finished.");
    println!("  Fetched: {}", result.pages_fetched);
    println!("  Fresh:   {}", result.pages_fresh);
    println!("  Skipped: {}", result.pages_skipped);
    println!("  Indexed: {}", result.pages_indexed);
    println!("  Errors:  {}", result.errors.len());
    println!("  Time:    {:.1}s", result.duration.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_serve(config: &AppConfig) -> Result<()> {
    let addr: SocketAddr = config
        .freshness
        .listen
        .parse()
        .map_err(|e| eyre!("invalid listen address '{}': {e}", config.freshness.listen))?;

    let cache = open_cache(config, None).await?;
    let state = ServiceState {
        cache: Arc::new(cache),
        password: Arc::from(config.freshness.password.as_str()),
    };
    server::serve(addr, state).await
}

async fn cmd_check(config: &AppConfig, db: Option<&Path>, url: &str) -> Result<()> {
    let cache = open_cache(config, db).await?;
    let decision = cache.check(url).await?;
    println!("{decision}");
    Ok(())
}

async fn cmd_inspect(config: &AppConfig, db: Option<&Path>, url: &str) -> Result<()> {
    let cache = open_cache(config, db).await?;

    println!("  URL:         {url}");
    println!("  Fingerprint: {:016x}", fingerprint(url));
    match cache.get(url).await? {
        Some(record) => {
            let seen = chrono::DateTime::from_timestamp(i64::from(record.last_seen), 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| record.last_seen.to_string());
            println!("  Last seen:   {seen}");
            println!("  Weight:      {}", record.weight);
            println!("  Hits:        {}", record.hit_count);
        }
        None => println!("  No record."),
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load_app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl CrawlProgress for CliProgress {
    fn page_fetched(&self, url: &str, fetched: usize, queued: usize) {
        self.spinner
            .set_message(format!("Fetched [{fetched}, {queued} queued] {url}"));
    }

    fn page_skipped(&self, url: &str, reason: &str) {
        self.spinner.set_message(format!("Skipped ({reason}) {url}"));
    }

    fn done(&self, _result: &CrawlResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn crawl_requires_a_seed() {
        assert!(Cli::try_parse_from(["polycrawl", "crawl"]).is_err());

        let cli = Cli::try_parse_from([
            "polycrawl",
            "-vv",
            "crawl",
            "http://example.com/",
            "http://example.org/",
            "--max-pages",
            "10",
            "--no-index",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Crawl {
                seeds,
                max_pages,
                no_index,
                no_freshness,
                ..
            } => {
                assert_eq!(seeds.len(), 2);
                assert_eq!(max_pages, Some(10));
                assert!(no_index);
                assert!(!no_freshness);
            }
            _ => panic!("expected crawl"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "polycrawl",
            "inspect",
            "http://example.com/",
            "--log-format",
            "json",
            "--config",
            "/tmp/p.toml",
        ])
        .expect("parse");
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/p.toml")));
    }

    #[test]
    fn password_flag_overrides_empty_file_password() {
        let dir = std::env::temp_dir().join(format!("polycrawl_cfg_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty_password.toml");
        std::fs::write(&path, "[freshness]\npassword = \"\"\n").unwrap();

        // Commands that never use the password load it as-is.
        let loaded = load_app_config(Some(&path)).expect("load");
        assert_eq!(loaded.freshness.password, "");
        assert!(validate_config(&loaded).is_ok());

        // serve without a flag still refuses to start.
        assert!(serve_config(loaded.clone(), None, None, None).is_err());

        let config = serve_config(
            loaded,
            Some("127.0.0.1:9001".into()),
            Some("s3cret".into()),
            Some(dir.join("fresh.db")),
        )
        .expect("flags rescue the file password");
        assert_eq!(config.freshness.password, "s3cret");
        assert_eq!(config.freshness.listen, "127.0.0.1:9001");
        assert!(config.freshness.db_path.ends_with("fresh.db"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = std::env::temp_dir().join(format!("polycrawl_cfg_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("good.toml");
        std::fs::write(&good, "[freshness]\npassword = \"abc\"\n").unwrap();
        let config = load_app_config(Some(&good)).expect("valid config");
        assert_eq!(config.freshness.password, "abc");

        let broken = dir.join("broken.toml");
        std::fs::write(&broken, "[freshness\n").unwrap();
        assert!(load_app_config(Some(&broken)).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
