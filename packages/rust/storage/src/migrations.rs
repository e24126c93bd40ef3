//! SQL migration definitions for the snapshot database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: videos, backup_runs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Latest snapshot of every video ever seen
CREATE TABLE IF NOT EXISTS videos (
    video_id     TEXT PRIMARY KEY,
    title        TEXT,
    description  TEXT,
    published_at TEXT,
    category_id  TEXT,
    tags         TEXT,
    backed_up_at TEXT
);

-- Append-only audit log, one row per backup run
CREATE TABLE IF NOT EXISTS backup_runs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp     TEXT,
    videos_count  INTEGER,
    new_count     INTEGER,
    updated_count INTEGER,
    notes         TEXT
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
