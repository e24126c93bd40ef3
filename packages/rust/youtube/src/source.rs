//! The document source/sink seam used by the pipelines.

use async_trait::async_trait;
use tubekeeper_shared::{ChannelInfo, Result, Video, VideoUpdate};

/// Hard cap on ids per detail request, set by the Data API.
pub const MAX_BATCH_SIZE: usize = 50;

/// One page of the channel's uploads listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadsPage {
    /// Video ids in the order the service returned them.
    pub video_ids: Vec<String>,
    /// Continuation token; `None` on the last page.
    pub next_page_token: Option<String>,
}

/// Read/write access to the account's videos.
///
/// Every call may fail with [`TubekeeperError::Source`] or
/// [`TubekeeperError::QuotaExceeded`]; callers do not retry.
///
/// [`TubekeeperError::Source`]: tubekeeper_shared::TubekeeperError::Source
/// [`TubekeeperError::QuotaExceeded`]: tubekeeper_shared::TubekeeperError::QuotaExceeded
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Make sure credentials are usable before a long run starts.
    async fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    /// The authenticated account's channel, `None` if it has none.
    async fn channel(&self) -> Result<Option<ChannelInfo>>;

    /// One page of the uploads playlist.
    async fn list_uploads_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<UploadsPage>;

    /// Details for at most [`MAX_BATCH_SIZE`] videos in a single request.
    ///
    /// The outer `Result` fails when the request fails. Each inner `Result`
    /// is one returned item, `Err(MalformedRecord)` when the item lacks
    /// required fields. Ids the service does not know are simply absent.
    async fn get_videos(&self, ids: &[String]) -> Result<Vec<Result<Video>>>;

    /// Write a complete snippet back to the service.
    async fn update_video(&self, update: &VideoUpdate) -> Result<()>;

    /// Details for one video, `None` if the service does not return it.
    async fn get_video(&self, id: &str) -> Result<Option<Video>> {
        let mut items = self.get_videos(&[id.to_string()]).await?;
        if items.is_empty() {
            return Ok(None);
        }
        items.swap_remove(0).map(Some)
    }
}
