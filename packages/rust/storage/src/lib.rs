//! libSQL storage layer for video snapshots.
//!
//! The [`Storage`] struct wraps a local libSQL database holding two tables:
//! `videos` (latest snapshot per video, overwritten in place) and
//! `backup_runs` (append-only audit log).
//!
//! **Access rules:**
//! - Backup runs: read-write (sole writer) via [`Storage::open`]
//! - Stats and inspection: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use serde::{Deserialize, Serialize};
use tubekeeper_shared::{Result, TubekeeperError, Video};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One row of the `videos` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub category_id: String,
    /// Stored as a JSON array.
    pub tags: Vec<String>,
    /// When this row was last written by a backup run.
    pub backed_up_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Snapshot `video` as of `backed_up_at`.
    pub fn from_video(video: &Video, backed_up_at: DateTime<Utc>) -> Self {
        Self {
            video_id: video.id.clone(),
            title: video.title.clone(),
            description: video.description.clone(),
            published_at: video.published_at,
            category_id: video.category_id.clone(),
            tags: video.tags.clone(),
            backed_up_at,
        }
    }
}

/// Counters for a backup run that is about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBackupRun {
    pub videos_count: u64,
    pub new_count: u64,
    pub updated_count: u64,
    pub notes: String,
}

/// One row of the `backup_runs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRun {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub videos_count: u64,
    pub new_count: u64,
    pub updated_count: u64,
    pub notes: String,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TubekeeperError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TubekeeperError::not_found(format!(
                "backup database {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        TubekeeperError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(TubekeeperError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Video operations
    // -----------------------------------------------------------------------

    /// Whether a snapshot row exists for `video_id`.
    pub async fn video_exists(&self, video_id: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT video_id FROM videos WHERE video_id = ?1",
                params![video_id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Get the snapshot row for `video_id`.
    pub async fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT video_id, title, description, published_at, category_id, tags, backed_up_at
                 FROM videos WHERE video_id = ?1",
                params![video_id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_video_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Insert a snapshot row. Fails if the video is already stored.
    pub async fn insert_video(&self, record: &VideoRecord) -> Result<()> {
        self.check_writable()?;
        let tags = encode_tags(&record.tags)?;
        self.conn
            .execute(
                "INSERT INTO videos (video_id, title, description, published_at, category_id, tags, backed_up_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.video_id.as_str(),
                    record.title.as_str(),
                    record.description.as_str(),
                    record.published_at.to_rfc3339(),
                    record.category_id.as_str(),
                    tags,
                    record.backed_up_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Overwrite every field of an existing snapshot row.
    pub async fn update_video(&self, record: &VideoRecord) -> Result<()> {
        self.check_writable()?;
        let tags = encode_tags(&record.tags)?;
        let changed = self
            .conn
            .execute(
                "UPDATE videos
                 SET title = ?1, description = ?2, published_at = ?3, category_id = ?4, tags = ?5, backed_up_at = ?6
                 WHERE video_id = ?7",
                params![
                    record.title.as_str(),
                    record.description.as_str(),
                    record.published_at.to_rfc3339(),
                    record.category_id.as_str(),
                    tags,
                    record.backed_up_at.to_rfc3339(),
                    record.video_id.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;

        if changed == 0 {
            return Err(TubekeeperError::Storage(format!(
                "no stored video with id {}",
                record.video_id
            )));
        }
        Ok(())
    }

    /// Number of videos in the snapshot table.
    pub async fn count_videos(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM videos", params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(storage_err)? as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(storage_err(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Backup run operations
    // -----------------------------------------------------------------------

    /// Append a backup run record. Returns the generated row id.
    pub async fn insert_backup_run(&self, run: &NewBackupRun) -> Result<i64> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO backup_runs (timestamp, videos_count, new_count, updated_count, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    now.as_str(),
                    run.videos_count as i64,
                    run.new_count as i64,
                    run.updated_count as i64,
                    run.notes.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// The most recent backup run, if any.
    pub async fn latest_backup_run(&self) -> Result<Option<BackupRun>> {
        Ok(self.list_backup_runs(1).await?.into_iter().next())
    }

    /// Backup runs, newest first.
    pub async fn list_backup_runs(&self, limit: u32) -> Result<Vec<BackupRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, timestamp, videos_count, new_count, updated_count, notes
                 FROM backup_runs ORDER BY id DESC LIMIT ?1",
                params![limit as i64],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_backup_run(&row)?);
        }
        Ok(results)
    }
}

fn storage_err(e: impl std::fmt::Display) -> TubekeeperError {
    TubekeeperError::Storage(e.to_string())
}

fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).map_err(|e| storage_err(format!("cannot encode tags: {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TubekeeperError::Storage(format!("invalid date '{s}': {e}")))
}

/// Convert a database row to a [`VideoRecord`].
fn row_to_video_record(row: &libsql::Row) -> Result<VideoRecord> {
    let tags_json = row.get::<String>(5).unwrap_or_else(|_| "[]".into());
    Ok(VideoRecord {
        video_id: row.get::<String>(0).map_err(storage_err)?,
        title: row.get::<String>(1).unwrap_or_default(),
        description: row.get::<String>(2).unwrap_or_default(),
        published_at: parse_timestamp(&row.get::<String>(3).map_err(storage_err)?)?,
        category_id: row.get::<String>(4).unwrap_or_default(),
        tags: serde_json::from_str(&tags_json)
            .map_err(|e| storage_err(format!("invalid tags json: {e}")))?,
        backed_up_at: parse_timestamp(&row.get::<String>(6).map_err(storage_err)?)?,
    })
}

/// Convert a database row to a [`BackupRun`].
fn row_to_backup_run(row: &libsql::Row) -> Result<BackupRun> {
    Ok(BackupRun {
        id: row.get::<i64>(0).map_err(storage_err)?,
        timestamp: parse_timestamp(&row.get::<String>(1).map_err(storage_err)?)?,
        videos_count: row.get::<i64>(2).unwrap_or(0) as u64,
        new_count: row.get::<i64>(3).unwrap_or(0) as u64,
        updated_count: row.get::<i64>(4).unwrap_or(0) as u64,
        notes: row.get::<String>(5).unwrap_or_default(),
    })
}
