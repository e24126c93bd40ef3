//! Description updater: rewrite the delimited section of one video.
//!
//! Every operation re-fetches the video, computes the new description locally
//! and only then talks to the sink. Nothing is written on preview.

use tracing::{info, instrument, warn};

use tubekeeper_section::SectionEditor;
use tubekeeper_shared::{Result, TubekeeperError, Video, VideoUpdate};
use tubekeeper_youtube::VideoSource;

/// What an update would do, computed without writing anything.
#[derive(Debug, Clone)]
pub struct Preview {
    /// The video as currently stored remotely.
    pub video: Video,
    /// Content of the existing section, if the description had one.
    pub old_section: Option<String>,
    /// Description after the upsert.
    pub new_description: String,
}

impl Preview {
    pub fn old_description(&self) -> &str {
        &self.video.description
    }

    /// Whether the upsert leaves the description as it is.
    pub fn is_unchanged(&self) -> bool {
        self.video.description == self.new_description
    }
}

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct Applied {
    pub video_id: String,
    pub old_section: Option<String>,
    /// Description that was written.
    pub description: String,
}

/// Applies a [`SectionEditor`] to videos from a [`VideoSource`].
pub struct DescriptionUpdater<'a> {
    source: &'a dyn VideoSource,
    editor: &'a SectionEditor,
}

impl<'a> DescriptionUpdater<'a> {
    pub fn new(source: &'a dyn VideoSource, editor: &'a SectionEditor) -> Self {
        Self { source, editor }
    }

    /// Compute the new description for `video_id` without writing it.
    #[instrument(skip_all, fields(video_id = %video_id))]
    pub async fn preview(&self, video_id: &str, content: &str) -> Result<Preview> {
        let video = self.fetch(video_id).await?;

        if self.editor.section_count(&video.description) > 1 {
            warn!("description has more than one section");
        }

        let old_section = self.editor.extract(&video.description);
        let new_description = self.editor.upsert_section(&video.description, content)?;

        Ok(Preview {
            video,
            old_section,
            new_description,
        })
    }

    /// Upsert `content` into the description of `video_id` and write it back.
    ///
    /// Title, tags, category and language are sent back unchanged. The write
    /// is the only remote mutation and happens after the new body is known.
    #[instrument(skip_all, fields(video_id = %video_id))]
    pub async fn apply(&self, video_id: &str, content: &str) -> Result<Applied> {
        let preview = self.preview(video_id, content).await?;
        if preview.is_unchanged() {
            info!("section already up to date, writing anyway");
        }

        let update = preview.video.with_description(&preview.new_description);
        self.source.update_video(&update).await?;

        info!(policy = %self.editor.policy(), "description updated");
        Ok(Applied {
            video_id: preview.video.id,
            old_section: preview.old_section,
            description: preview.new_description,
        })
    }

    /// Replace the whole description, optionally also the title and tags.
    #[instrument(skip_all, fields(video_id = %video_id))]
    pub async fn replace_description(
        &self,
        video_id: &str,
        description: &str,
        title: Option<&str>,
        tags: Option<Vec<String>>,
    ) -> Result<VideoUpdate> {
        if let Some(title) = title {
            if title.trim().is_empty() {
                return Err(TubekeeperError::validation("title must not be empty"));
            }
        }

        let video = self.fetch(video_id).await?;
        let mut update = video.with_description(description);
        if let Some(title) = title {
            update.title = title.to_string();
        }
        if let Some(tags) = tags {
            update.tags = tags;
        }

        self.source.update_video(&update).await?;
        info!("description replaced");
        Ok(update)
    }

    async fn fetch(&self, video_id: &str) -> Result<Video> {
        self.source
            .get_video(video_id)
            .await?
            .ok_or_else(|| TubekeeperError::not_found(format!("video {video_id}")))
    }
}
