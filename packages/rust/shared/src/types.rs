//! Core domain types for tubekeeper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

/// A video's editable metadata, as fetched from the remote service.
///
/// Instances are transient: they are re-fetched for every operation and
/// never cached between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Opaque, stable video identifier.
    pub id: String,
    /// Video title.
    pub title: String,
    /// Free-text description (may be empty, may contain stale markers).
    pub description: String,
    /// Tags in the order the service returned them.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Category identifier (required by the service on write-back).
    pub category_id: String,
    /// Default language of the title/description, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    /// When the video was published.
    pub published_at: DateTime<Utc>,
}

impl Video {
    /// Build the write-back payload for this video with a new description.
    ///
    /// Every other snippet field is carried over unchanged so the write
    /// cannot drop unrelated metadata.
    pub fn with_description(&self, description: impl Into<String>) -> VideoUpdate {
        VideoUpdate {
            id: self.id.clone(),
            title: self.title.clone(),
            description: description.into(),
            tags: self.tags.clone(),
            category_id: self.category_id.clone(),
            default_language: self.default_language.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// VideoUpdate
// ---------------------------------------------------------------------------

/// Full snippet sent to the service when updating a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoUpdate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
}

// ---------------------------------------------------------------------------
// ChannelInfo
// ---------------------------------------------------------------------------

/// Summary of the authenticated account's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel identifier.
    pub id: String,
    /// Channel display name.
    pub title: String,
    /// Subscriber count; `None` when the owner hides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_count: Option<u64>,
    /// Number of public videos.
    pub video_count: u64,
    /// Playlist that lists every upload, newest first.
    pub uploads_playlist_id: String,
}

// ---------------------------------------------------------------------------
// UpsertPolicy
// ---------------------------------------------------------------------------

/// Where a replaced section ends up relative to the rest of the description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpsertPolicy {
    /// Keep the section where it was; text after it stays after it.
    #[default]
    PreservePosition,
    /// Strip any existing section and append the new one at the very end.
    AppendAtEnd,
}

impl std::fmt::Display for UpsertPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreservePosition => f.write_str("preserve-position"),
            Self::AppendAtEnd => f.write_str("append-at-end"),
        }
    }
}
