//! Freshness cache on an embedded libSQL database.
//!
//! [`FreshnessCache`] decides, per URL, whether a page is new, still fresh,
//! or stale and due for a re-fetch. Records are keyed by the URL's FNV-1
//! fingerprint and packed into 8 bytes (see [`record`]).
//!
//! Every check runs in its own `BEGIN IMMEDIATE` transaction on a fresh
//! connection, so concurrent callers are serialized by the database.

mod migrations;
pub mod record;

use std::path::{Path, PathBuf};

use chrono::Utc;
use libsql::{Connection, Database, TransactionBehavior, params};
use tracing::{debug, info, warn};

use polycrawl_shared::{Decision, FreshnessOptions, PolycrawlError, Result};

pub use record::{FreshnessRecord, fingerprint};

/// Milliseconds a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u32 = 5000;

fn storage_err(e: libsql::Error) -> PolycrawlError {
    PolycrawlError::Storage(e.to_string())
}

/// Handle to the freshness database. Cheap to share behind an `Arc`.
pub struct FreshnessCache {
    db: Database,
    path: PathBuf,
    options: FreshnessOptions,
}

impl FreshnessCache {
    /// Open or create the database at `path` and apply pending migrations.
    pub async fn open(path: &Path, options: FreshnessOptions) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PolycrawlError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let cache = Self {
            db,
            path: path.to_path_buf(),
            options,
        };
        cache.run_migrations().await?;
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &FreshnessOptions {
        &self.options
    }

    async fn connect(&self) -> Result<Connection> {
        let conn = self.db.connect().map_err(storage_err)?;
        // PRAGMA busy_timeout answers with a row, so it goes through query().
        let mut rows = conn
            .query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"), params![])
            .await
            .map_err(storage_err)?;
        while rows.next().await.map_err(storage_err)?.is_some() {}
        Ok(conn)
    }

    async fn run_migrations(&self) -> Result<()> {
        let conn = self.connect().await?;
        let current_version = schema_version(&conn).await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                conn.execute_batch(migration.sql).await.map_err(|e| {
                    PolycrawlError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Check `url` against the current wall clock.
    pub async fn check(&self, url: &str) -> Result<Decision> {
        let now = Utc::now().timestamp().max(0) as u64;
        self.check_at(url, now).await
    }

    /// Check `url` as if the current time were `unix_secs`, updating its record.
    pub async fn check_at(&self, url: &str, unix_secs: u64) -> Result<Decision> {
        let key = record::key_for(url);
        let now = record::truncate(unix_secs);

        let conn = self.connect().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(storage_err)?;

        let existing = match read_raw(&tx, &key).await? {
            None => None,
            Some(raw) => {
                let decoded = raw.as_deref().and_then(FreshnessRecord::decode);
                if decoded.is_none() {
                    warn!(
                        url,
                        len = ?raw.map(|r| r.len()),
                        "malformed freshness record, overwriting"
                    );
                }
                decoded
            }
        };

        let (updated, decision) = record::observe(existing, now, &self.options);

        tx.execute(
            "INSERT INTO freshness (fingerprint, record) VALUES (?1, ?2)
             ON CONFLICT(fingerprint) DO UPDATE SET record = excluded.record",
            params![key.to_vec(), updated.encode().to_vec()],
        )
        .await
        .map_err(storage_err)?;
        tx.commit().await.map_err(storage_err)?;

        match decision {
            Decision::New => debug!(url, "newly added"),
            Decision::Fresh => debug!(url, hits = updated.hit_count, "no update required"),
            Decision::Stale => debug!(url, hits = updated.hit_count, "stale, refetch"),
        }
        Ok(decision)
    }

    /// Read the current record for `url` without touching it.
    ///
    /// A malformed stored value reads as `None`.
    pub async fn get(&self, url: &str) -> Result<Option<FreshnessRecord>> {
        let conn = self.connect().await?;
        let raw = read_raw(&conn, &record::key_for(url)).await?;
        Ok(raw.flatten().as_deref().and_then(FreshnessRecord::decode))
    }
}

/// `None` when no row exists; `Some(None)` when the stored value is not a blob.
async fn read_raw(conn: &Connection, key: &[u8; 8]) -> Result<Option<Option<Vec<u8>>>> {
    let mut rows = conn
        .query(
            "SELECT record FROM freshness WHERE fingerprint = ?1",
            params![key.to_vec()],
        )
        .await
        .map_err(storage_err)?;

    match rows.next().await.map_err(storage_err)? {
        Some(row) => Ok(Some(row.get::<Vec<u8>>(0).ok())),
        None => Ok(None),
    }
}

/// Current schema version, or 0 before the first migration.
async fn schema_version(conn: &Connection) -> u32 {
    let Ok(mut rows) = conn
        .query("SELECT MAX(version) FROM schema_migrations", params![])
        .await
    else {
        return 0;
    };
    match rows.next().await {
        Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
        _ => 0,
    }
}
