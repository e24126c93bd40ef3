//! Channel summary with the most recent upload.

use serde::Serialize;
use tracing::instrument;

use tubekeeper_shared::{ChannelInfo, Result, TubekeeperError, Video};
use tubekeeper_youtube::VideoSource;

#[derive(Debug, Clone, Serialize)]
pub struct ChannelOverview {
    pub info: ChannelInfo,
    /// Newest upload; `None` for a channel without videos.
    pub latest: Option<Video>,
}

/// Look up the authenticated channel and its newest upload.
#[instrument(skip_all)]
pub async fn channel_overview(source: &dyn VideoSource) -> Result<ChannelOverview> {
    let info = source
        .channel()
        .await?
        .ok_or_else(|| TubekeeperError::not_found("channel for the authenticated account"))?;

    // The uploads playlist lists newest first.
    let first_page = source
        .list_uploads_page(&info.uploads_playlist_id, None)
        .await?;
    let latest = match first_page.video_ids.first() {
        Some(id) => source.get_video(id).await?,
        None => None,
    };

    Ok(ChannelOverview { info, latest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    #[tokio::test]
    async fn overview_includes_newest_upload() {
        let source = FakeSource::with_pages(&[3, 2]);
        let overview = channel_overview(&source).await.unwrap();
        assert_eq!(overview.info.title, "Fake Channel");
        assert_eq!(overview.latest.unwrap().id, "vid000");
        assert_eq!(source.calls(), vec!["page:0", "details:1"]);
    }

    #[tokio::test]
    async fn empty_channel_has_no_latest() {
        let source = FakeSource::with_pages(&[0]);
        let overview = channel_overview(&source).await.unwrap();
        assert!(overview.latest.is_none());
    }

    #[tokio::test]
    async fn account_without_channel() {
        let err = channel_overview(&FakeSource::default()).await.unwrap_err();
        assert!(matches!(err, TubekeeperError::NotFound { .. }));
    }
}
