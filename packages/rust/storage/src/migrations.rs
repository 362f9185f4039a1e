//! SQL migrations for the freshness database.
//!
//! Applied in order on open; each migration records its version in
//! `schema_migrations`.

pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: freshness records keyed by URL fingerprint",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- 8-byte big-endian FNV-1 key -> 8-byte packed record
CREATE TABLE IF NOT EXISTS freshness (
    fingerprint BLOB PRIMARY KEY,
    record      BLOB NOT NULL
) WITHOUT ROWID;

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
