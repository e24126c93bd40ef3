//! In-memory [`VideoSource`] used by the workflow tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tubekeeper_shared::{ChannelInfo, Result, TubekeeperError, Video, VideoUpdate};
use tubekeeper_youtube::{UploadsPage, VideoSource};

pub(crate) const PLAYLIST: &str = "UU_fake";

pub(crate) fn video(id: &str, description: &str) -> Video {
    Video {
        id: id.into(),
        title: format!("Title of {id}"),
        description: description.into(),
        tags: vec!["health".into(), "brain".into()],
        category_id: "27".into(),
        default_language: Some("en".into()),
        published_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    }
}

#[derive(Default)]
pub(crate) struct FakeSource {
    pub channel: Option<ChannelInfo>,
    pub pages: Vec<Vec<String>>,
    pub videos: HashMap<String, Video>,
    pub malformed: HashSet<String>,
    /// Index of the page request that fails.
    pub fail_page: Option<usize>,
    /// Index of the detail request that fails.
    pub fail_details: Option<usize>,
    pub fail_auth: bool,
    pub reject_updates: bool,
    /// Ordered log of calls: `page:N`, `details:LEN`, `update:ID`.
    pub calls: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<VideoUpdate>>,
}

impl FakeSource {
    /// A channel whose uploads come back in pages of the given sizes.
    pub fn with_pages(sizes: &[usize]) -> Self {
        let mut pages = Vec::new();
        let mut videos = HashMap::new();
        let mut n = 0;
        for &size in sizes {
            let mut page = Vec::new();
            for _ in 0..size {
                let id = format!("vid{n:03}");
                videos.insert(id.clone(), video(&id, "Some description"));
                page.push(id);
                n += 1;
            }
            pages.push(page);
        }

        Self {
            channel: Some(ChannelInfo {
                id: "UC_fake".into(),
                title: "Fake Channel".into(),
                subscriber_count: Some(100),
                video_count: n as u64,
                uploads_playlist_id: PLAYLIST.into(),
            }),
            pages,
            videos,
            ..Self::default()
        }
    }

    /// A single video and no channel listing.
    pub fn with_video(video: Video) -> Self {
        let mut source = Self::default();
        source.videos.insert(video.id.clone(), video);
        source
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<VideoUpdate> {
        self.updates.lock().unwrap().clone()
    }

    fn log(&self, entry: String) {
        self.calls.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl VideoSource for FakeSource {
    async fn authenticate(&self) -> Result<()> {
        if self.fail_auth {
            return Err(TubekeeperError::Auth("no credentials".into()));
        }
        Ok(())
    }

    async fn channel(&self) -> Result<Option<ChannelInfo>> {
        Ok(self.channel.clone())
    }

    async fn list_uploads_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<UploadsPage> {
        assert_eq!(playlist_id, PLAYLIST);
        let index: usize = match page_token {
            Some(token) => token.trim_start_matches("page-").parse().unwrap(),
            None => 0,
        };
        self.log(format!("page:{index}"));

        if self.fail_page == Some(index) {
            return Err(TubekeeperError::Source("listing failed".into()));
        }

        let video_ids = self.pages.get(index).cloned().unwrap_or_default();
        let next_page_token =
            (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));
        Ok(UploadsPage {
            video_ids,
            next_page_token,
        })
    }

    async fn get_videos(&self, ids: &[String]) -> Result<Vec<Result<Video>>> {
        let index = self
            .calls()
            .iter()
            .filter(|c| c.starts_with("details:"))
            .count();
        self.log(format!("details:{}", ids.len()));

        if self.fail_details == Some(index) {
            return Err(TubekeeperError::Source("detail request failed".into()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| {
                if self.malformed.contains(id) {
                    Some(Err(TubekeeperError::malformed(format!("video {id} has no snippet"))))
                } else {
                    self.videos.get(id).cloned().map(Ok)
                }
            })
            .collect())
    }

    async fn update_video(&self, update: &VideoUpdate) -> Result<()> {
        self.log(format!("update:{}", update.id));
        if self.reject_updates {
            return Err(TubekeeperError::Source("update rejected".into()));
        }
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }
}
