//! Backup pipeline: channel uploads → detail batches → snapshot store → audit row.
//!
//! Pages and batches are processed strictly in sequence. Each batch is
//! upserted before the next page is requested, so an aborted run keeps
//! everything it had already stored.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use tubekeeper_shared::{BackupConfig, Result, TubekeeperError, Video};
use tubekeeper_storage::{BackupRun, NewBackupRun, Storage, VideoRecord};
use tubekeeper_youtube::{MAX_BATCH_SIZE, VideoSource};

/// Ids per detail request.
pub const BATCH_SIZE: usize = MAX_BATCH_SIZE;

// ---------------------------------------------------------------------------
// Phases & progress
// ---------------------------------------------------------------------------

/// Stage a backup run is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Authenticating,
    Listing,
    Paginating,
    PerBatchDetail,
    Upserting,
    RunRecorded,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authenticating => "authenticating",
            Self::Listing => "listing",
            Self::Paginating => "paginating",
            Self::PerBatchDetail => "fetching details",
            Self::Upserting => "upserting",
            Self::RunRecorded => "recording run",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Progress callback for reporting backup status.
pub trait SnapshotProgress: Send + Sync {
    /// Called whenever the run enters a phase (repeatedly for per-page and per-batch phases).
    fn phase(&self, phase: RunPhase);
    /// Called after each batch is stored.
    fn batch_stored(&self, processed: u64, expected: u64);
    /// Called when the run completes.
    fn done(&self, report: &SnapshotReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl SnapshotProgress for SilentProgress {
    fn phase(&self, _phase: RunPhase) {}
    fn batch_stored(&self, _processed: u64, _expected: u64) {}
    fn done(&self, _report: &SnapshotReport) {}
}

// ---------------------------------------------------------------------------
// Config & report
// ---------------------------------------------------------------------------

/// Configuration for [`run_snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Note stored on the audit row.
    pub note: String,
    /// Write a partial audit row when the run aborts.
    pub record_aborted_runs: bool,
}

impl SnapshotConfig {
    pub fn from_config(config: &BackupConfig) -> Self {
        Self {
            note: config.note.clone(),
            record_aborted_runs: config.record_aborted_runs,
        }
    }
}

/// Result of a completed backup run.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    /// Id of the `backup_runs` row.
    pub run_id: i64,
    /// Video items returned by the detail requests, failed ones included.
    ///
    /// Stored as `videos_count` on the audit row. Listed ids the service
    /// did not return details for are not counted.
    pub total: u64,
    pub new: u64,
    pub updated: u64,
    /// Items that could not be stored (malformed or store failure).
    pub errors: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Lazy walk over the uploads playlist, one page per call.
///
/// Not restartable: once the last page has been returned it keeps
/// returning `None`.
pub struct IdPager<'a> {
    source: &'a dyn VideoSource,
    playlist_id: String,
    next_token: Option<String>,
    exhausted: bool,
    pages: u32,
}

impl<'a> IdPager<'a> {
    pub fn new(source: &'a dyn VideoSource, playlist_id: impl Into<String>) -> Self {
        Self {
            source,
            playlist_id: playlist_id.into(),
            next_token: None,
            exhausted: false,
            pages: 0,
        }
    }

    /// Next page of ids, or `None` once the playlist is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .source
            .list_uploads_page(&self.playlist_id, self.next_token.as_deref())
            .await?;
        self.pages += 1;

        match page.next_page_token {
            Some(token) => self.next_token = Some(token),
            None => {
                self.next_token = None;
                self.exhausted = true;
            }
        }

        debug!(page = self.pages, ids = page.video_ids.len(), "uploads page listed");
        Ok(Some(page.video_ids))
    }

    /// Drain every remaining page into one list, in service order.
    pub async fn collect_all(mut self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        while let Some(page) = self.next_page().await? {
            ids.extend(page);
        }
        Ok(ids)
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages
    }
}

/// Details for one batch of at most [`BATCH_SIZE`] ids.
pub async fn fetch_details_batch(
    source: &dyn VideoSource,
    ids: &[String],
) -> Result<Vec<Result<Video>>> {
    if ids.len() > BATCH_SIZE {
        return Err(TubekeeperError::validation(format!(
            "batch of {} ids exceeds the limit of {BATCH_SIZE}",
            ids.len()
        )));
    }
    source.get_videos(ids).await
}

// ---------------------------------------------------------------------------
// Store operations
// ---------------------------------------------------------------------------

/// Whether [`upsert_video`] created or overwrote a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    New,
    Updated,
}

/// Store `video`, overwriting any previous snapshot of the same id.
pub async fn upsert_video(storage: &Storage, video: &Video) -> Result<UpsertOutcome> {
    let record = VideoRecord::from_video(video, Utc::now());
    if storage.video_exists(&video.id).await? {
        storage.update_video(&record).await?;
        Ok(UpsertOutcome::Updated)
    } else {
        storage.insert_video(&record).await?;
        Ok(UpsertOutcome::New)
    }
}

/// Append one row to the audit log.
pub async fn record_run(
    storage: &Storage,
    total: u64,
    new: u64,
    updated: u64,
    note: &str,
) -> Result<i64> {
    storage
        .insert_backup_run(&NewBackupRun {
            videos_count: total,
            new_count: new,
            updated_count: updated,
            notes: note.to_string(),
        })
        .await
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RunState {
    phase: RunPhase,
    expected: u64,
    total: u64,
    new: u64,
    updated: u64,
    errors: u64,
}

impl RunState {
    fn enter(&mut self, phase: RunPhase, progress: &dyn SnapshotProgress) {
        self.phase = phase;
        progress.phase(phase);
    }
}

/// Back up every upload of the authenticated channel.
///
/// 1. Authenticate and look up the uploads playlist
/// 2. Page through the playlist, buffering ids
/// 3. For every full batch (and the final partial one): fetch details, upsert
/// 4. Record the run in the audit log
#[instrument(skip_all, fields(note = %config.note))]
pub async fn run_snapshot(
    source: &dyn VideoSource,
    storage: &Storage,
    config: &SnapshotConfig,
    progress: &dyn SnapshotProgress,
) -> Result<SnapshotReport> {
    let start = Instant::now();
    let mut state = RunState {
        phase: RunPhase::Authenticating,
        expected: 0,
        total: 0,
        new: 0,
        updated: 0,
        errors: 0,
    };

    if let Err(err) = store_all(source, storage, progress, &mut state).await {
        warn!(phase = %state.phase, error = %err, stored = state.new + state.updated, "backup aborted");
        if config.record_aborted_runs {
            let note = format!("{} (aborted while {}: {err})", config.note, state.phase);
            match record_run(storage, state.total, state.new, state.updated, &note).await {
                Ok(id) => info!(run_id = id, "partial run recorded"),
                Err(record_err) => warn!(error = %record_err, "could not record partial run"),
            }
        }
        return Err(err);
    }

    state.enter(RunPhase::RunRecorded, progress);
    let note = if state.errors > 0 {
        format!("{} ({} errors)", config.note, state.errors)
    } else {
        config.note.clone()
    };
    let run_id = record_run(storage, state.total, state.new, state.updated, &note).await?;

    let report = SnapshotReport {
        run_id,
        total: state.total,
        new: state.new,
        updated: state.updated,
        errors: state.errors,
        elapsed: start.elapsed(),
    };

    info!(
        run_id,
        total = report.total,
        new = report.new,
        updated = report.updated,
        errors = report.errors,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "backup complete"
    );

    state.enter(RunPhase::Done, progress);
    progress.done(&report);
    Ok(report)
}

async fn store_all(
    source: &dyn VideoSource,
    storage: &Storage,
    progress: &dyn SnapshotProgress,
    state: &mut RunState,
) -> Result<()> {
    state.enter(RunPhase::Authenticating, progress);
    source.authenticate().await?;

    state.enter(RunPhase::Listing, progress);
    let channel = source
        .channel()
        .await?
        .ok_or_else(|| TubekeeperError::not_found("channel for the authenticated account"))?;
    state.expected = channel.video_count;
    info!(channel = %channel.title, videos = channel.video_count, "backing up channel");

    let mut pager = IdPager::new(source, channel.uploads_playlist_id);
    let mut pending: Vec<String> = Vec::new();

    loop {
        state.enter(RunPhase::Paginating, progress);
        let Some(page) = pager.next_page().await? else {
            break;
        };
        pending.extend(page);

        while pending.len() >= BATCH_SIZE {
            let batch: Vec<String> = pending.drain(..BATCH_SIZE).collect();
            store_batch(source, storage, progress, state, &batch).await?;
        }
    }

    if !pending.is_empty() {
        store_batch(source, storage, progress, state, &pending).await?;
    }

    debug!(pages = pager.pages_fetched(), "uploads listing finished");
    Ok(())
}

async fn store_batch(
    source: &dyn VideoSource,
    storage: &Storage,
    progress: &dyn SnapshotProgress,
    state: &mut RunState,
    ids: &[String],
) -> Result<()> {
    state.enter(RunPhase::PerBatchDetail, progress);
    let items = fetch_details_batch(source, ids).await?;
    if items.len() < ids.len() {
        debug!(requested = ids.len(), returned = items.len(), "some videos were not returned");
    }

    state.enter(RunPhase::Upserting, progress);
    for item in items {
        state.total += 1;
        let outcome = match item {
            Ok(video) => upsert_video(storage, &video).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(UpsertOutcome::New) => state.new += 1,
            Ok(UpsertOutcome::Updated) => state.updated += 1,
            Err(err) if err.is_per_record() => {
                warn!(error = %err, "skipping video");
                state.errors += 1;
            }
            Err(err) => return Err(err),
        }
    }

    progress.batch_stored(state.total, state.expected);
    Ok(())
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Summary of what the snapshot store holds.
#[derive(Debug, Clone, Serialize)]
pub struct BackupStats {
    pub stored_videos: u64,
    pub latest_run: Option<BackupRun>,
    /// Most recent runs, newest first.
    pub recent_runs: Vec<BackupRun>,
}

/// Read the store's counters and recent audit rows.
pub async fn backup_stats(storage: &Storage, recent: u32) -> Result<BackupStats> {
    let stored_videos = storage.count_videos().await?;
    let recent_runs = storage.list_backup_runs(recent.max(1)).await?;
    Ok(BackupStats {
        stored_videos,
        latest_run: recent_runs.first().cloned(),
        recent_runs,
    })
}
