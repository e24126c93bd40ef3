//! Workflows for tubekeeper.
//!
//! This crate ties the section editor, the YouTube source and the snapshot
//! store together into end-to-end operations: previewing and applying a
//! description section, backing up every upload, and summarizing the channel.

pub mod channel;
pub mod snapshot;
pub mod updater;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{ChannelOverview, channel_overview};
pub use snapshot::{
    BATCH_SIZE, BackupStats, IdPager, RunPhase, SilentProgress, SnapshotConfig,
    SnapshotProgress, SnapshotReport, UpsertOutcome, backup_stats, fetch_details_batch,
    record_run, run_snapshot, upsert_video,
};
pub use updater::{Applied, DescriptionUpdater, Preview};
