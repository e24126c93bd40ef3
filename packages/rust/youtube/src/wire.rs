//! Serde mirrors of the YouTube Data API v3 payloads we touch.
//!
//! Fields are optional wherever the service may omit them; conversion into
//! domain types decides what is required.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tubekeeper_shared::{ChannelInfo, Result, TubekeeperError, Video, VideoUpdate};

/// Error reasons that mean the project ran out of quota.
const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded", "rateLimitExceeded"];

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorItem {
    #[serde(default)]
    pub reason: String,
}

impl ApiError {
    pub fn is_quota(&self) -> bool {
        self.errors
            .iter()
            .any(|item| QUOTA_REASONS.contains(&item.reason.as_str()))
    }
}

// ---------------------------------------------------------------------------
// channels.list
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelResource {
    pub id: String,
    pub snippet: Option<ChannelSnippet>,
    pub statistics: Option<ChannelStatistics>,
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelSnippet {
    #[serde(default)]
    pub title: String,
}

/// Counts arrive as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelStatistics {
    pub subscriber_count: Option<String>,
    pub video_count: Option<String>,
    #[serde(default)]
    pub hidden_subscriber_count: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelatedPlaylists {
    pub uploads: Option<String>,
}

impl TryFrom<ChannelResource> for ChannelInfo {
    type Error = TubekeeperError;

    fn try_from(resource: ChannelResource) -> Result<Self> {
        let uploads_playlist_id = resource
            .content_details
            .and_then(|details| details.related_playlists.uploads)
            .ok_or_else(|| {
                TubekeeperError::malformed(format!(
                    "channel {} has no uploads playlist",
                    resource.id
                ))
            })?;

        let (subscriber_count, video_count) = match resource.statistics {
            Some(stats) => {
                let subscribers = if stats.hidden_subscriber_count {
                    None
                } else {
                    stats.subscriber_count.as_deref().and_then(|s| s.parse().ok())
                };
                let videos = stats
                    .video_count
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                (subscribers, videos)
            }
            None => (None, 0),
        };

        Ok(ChannelInfo {
            id: resource.id,
            title: resource.snippet.map(|s| s.title).unwrap_or_default(),
            subscriber_count,
            video_count,
            uploads_playlist_id,
        })
    }
}

// ---------------------------------------------------------------------------
// playlistItems.list
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemResource {
    pub snippet: Option<PlaylistItemSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemSnippet {
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourceId {
    pub video_id: Option<String>,
}

impl PlaylistItemResource {
    pub fn video_id(self) -> Option<String> {
        self.snippet?.resource_id?.video_id
    }
}

// ---------------------------------------------------------------------------
// videos.list / videos.update
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct VideoResource {
    pub id: Option<String>,
    pub snippet: Option<VideoSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category_id: Option<String>,
    pub default_language: Option<String>,
    pub published_at: Option<String>,
}

impl TryFrom<VideoResource> for Video {
    type Error = TubekeeperError;

    /// `id`, `snippet`, `categoryId`, and a valid `publishedAt` are required.
    /// Missing title, description, or tags default to empty.
    fn try_from(resource: VideoResource) -> Result<Self> {
        let id = resource
            .id
            .ok_or_else(|| TubekeeperError::malformed("video item has no id"))?;
        let snippet = resource
            .snippet
            .ok_or_else(|| TubekeeperError::malformed(format!("video {id} has no snippet")))?;
        let category_id = snippet.category_id.ok_or_else(|| {
            TubekeeperError::malformed(format!("video {id} has no categoryId"))
        })?;
        let published_raw = snippet.published_at.ok_or_else(|| {
            TubekeeperError::malformed(format!("video {id} has no publishedAt"))
        })?;
        let published_at = DateTime::parse_from_rfc3339(&published_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                TubekeeperError::malformed(format!(
                    "video {id} has invalid publishedAt '{published_raw}': {e}"
                ))
            })?;

        Ok(Video {
            id,
            title: snippet.title.unwrap_or_default(),
            description: snippet.description.unwrap_or_default(),
            tags: snippet.tags.unwrap_or_default(),
            category_id,
            default_language: snippet.default_language,
            published_at,
        })
    }
}

/// Body of `PUT /videos?part=snippet`.
#[derive(Debug, Serialize)]
pub(crate) struct VideoUpdateBody<'a> {
    pub id: &'a str,
    pub snippet: UpdateSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateSnippet<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub tags: &'a [String],
    pub category_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_language: Option<&'a str>,
}

impl<'a> From<&'a VideoUpdate> for VideoUpdateBody<'a> {
    fn from(update: &'a VideoUpdate) -> Self {
        Self {
            id: &update.id,
            snippet: UpdateSnippet {
                title: &update.title,
                description: &update.description,
                tags: &update.tags,
                category_id: &update.category_id,
                default_language: update.default_language.as_deref(),
            },
        }
    }
}
