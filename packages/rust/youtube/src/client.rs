//! HTTP client for the YouTube Data API v3.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use tubekeeper_shared::{AppConfig, ChannelInfo, Result, TubekeeperError, Video, VideoUpdate};
use url::Url;

use crate::auth::{self, TokenProvider};
use crate::source::{MAX_BATCH_SIZE, UploadsPage, VideoSource};
use crate::wire::{
    ChannelResource, ErrorResponse, ListResponse, PlaylistItemResource, VideoResource,
    VideoUpdateBody,
};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("tubekeeper/", env!("CARGO_PKG_VERSION"));

/// Largest page the playlistItems endpoint serves.
const PAGE_SIZE: &str = "50";

/// YouTube Data API client authenticated through a [`TokenProvider`].
pub struct YouTubeClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl YouTubeClient {
    /// Create a client against `base_url` (e.g. `https://www.googleapis.com/youtube/v3`).
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        Url::parse(base_url).map_err(|e| {
            TubekeeperError::config(format!("invalid YouTube API base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Build a client and token provider from the application config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.youtube.timeout_secs);
        let tokens = auth::provider_from_config(&config.auth, build_client(timeout)?)?;
        Self::new(&config.youtube.api_base_url, timeout, tokens)
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/{resource}", self.base_url)
    }

    /// Authenticated GET returning a decoded JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.endpoint(resource);
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| TubekeeperError::Source(format!("{url}: {e}")))?;

        let response = check_status(&url, response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TubekeeperError::Source(format!("{url}: invalid response body: {e}")))
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn authenticate(&self) -> Result<()> {
        self.tokens.access_token().await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn channel(&self) -> Result<Option<ChannelInfo>> {
        let response: ListResponse<ChannelResource> = self
            .get_json(
                "channels",
                &[("part", "snippet,statistics,contentDetails"), ("mine", "true")],
            )
            .await?;

        response
            .items
            .into_iter()
            .next()
            .map(ChannelInfo::try_from)
            .transpose()
    }

    #[instrument(skip_all, fields(playlist_id = %playlist_id))]
    async fn list_uploads_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<UploadsPage> {
        let mut query = vec![
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", PAGE_SIZE),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response: ListResponse<PlaylistItemResource> =
            self.get_json("playlistItems", &query).await?;

        let total = response.items.len();
        let video_ids: Vec<String> = response
            .items
            .into_iter()
            .filter_map(PlaylistItemResource::video_id)
            .collect();
        if video_ids.len() < total {
            warn!(
                skipped = total - video_ids.len(),
                "playlist items without a video id"
            );
        }

        debug!(count = video_ids.len(), has_next = response.next_page_token.is_some(), "uploads page");
        Ok(UploadsPage {
            video_ids,
            next_page_token: response.next_page_token,
        })
    }

    #[instrument(skip_all, fields(count = ids.len()))]
    async fn get_videos(&self, ids: &[String]) -> Result<Vec<Result<Video>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_BATCH_SIZE {
            return Err(TubekeeperError::validation(format!(
                "cannot fetch {} videos in one request (max {MAX_BATCH_SIZE})",
                ids.len()
            )));
        }

        let joined = ids.join(",");
        let response: ListResponse<VideoResource> = self
            .get_json("videos", &[("part", "snippet"), ("id", joined.as_str())])
            .await?;

        Ok(response.items.into_iter().map(Video::try_from).collect())
    }

    #[instrument(skip_all, fields(video_id = %update.id))]
    async fn update_video(&self, update: &VideoUpdate) -> Result<()> {
        let url = self.endpoint("videos");
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .query(&[("part", "snippet")])
            .json(&VideoUpdateBody::from(update))
            .send()
            .await
            .map_err(|e| TubekeeperError::Source(format!("{url}: {e}")))?;

        check_status(&url, response).await?;
        debug!("video snippet updated");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| TubekeeperError::Source(format!("failed to build HTTP client: {e}")))
}

/// Turn non-success responses into errors, singling out quota exhaustion.
async fn check_status(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) if parsed.error.is_quota() => Err(TubekeeperError::QuotaExceeded(format!(
            "{url}: {}",
            parsed.error.message
        ))),
        Ok(parsed) => Err(TubekeeperError::Source(format!(
            "{url}: HTTP {status}: {}",
            parsed.error.message
        ))),
        Err(_) => Err(TubekeeperError::Source(format!("{url}: HTTP {status}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> YouTubeClient {
        YouTubeClient::new(
            &server.uri(),
            Duration::from_secs(5),
            Arc::new(StaticToken::new("test-token")),
        )
        .expect("build client")
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = YouTubeClient::new(
            "not a url",
            Duration::from_secs(5),
            Arc::new(StaticToken::new("t")),
        );
        assert!(matches!(result, Err(TubekeeperError::Config { .. })));
    }

    #[tokio::test]
    async fn channel_info_is_parsed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("mine", "true"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "id": "UC123",
                    "snippet": {"title": "Brain Lab"},
                    "statistics": {"videoCount": "112", "subscriberCount": "4821"},
                    "contentDetails": {"relatedPlaylists": {"uploads": "UU123"}}
                }]
            })))
            .mount(&server)
            .await;

        let info = client_for(&server).channel().await.unwrap().expect("channel");
        assert_eq!(info.id, "UC123");
        assert_eq!(info.subscriber_count, Some(4821));
        assert_eq!(info.video_count, 112);
        assert_eq!(info.uploads_playlist_id, "UU123");
    }

    #[tokio::test]
    async fn account_without_channel() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/channels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
            .mount(&server)
            .await;

        assert!(client_for(&server).channel().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn uploads_page_follows_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .and(query_param("playlistId", "UU123"))
            .and(query_param("maxResults", "50"))
            .and(query_param("pageToken", "PAGE2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"snippet": {"resourceId": {"videoId": "v3"}}},
                    {"snippet": {"resourceId": {"kind": "youtube#video"}}},
                    {"snippet": {"resourceId": {"videoId": "v4"}}}
                ]
            })))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .list_uploads_page("UU123", Some("PAGE2"))
            .await
            .unwrap();
        assert_eq!(page.video_ids, vec!["v3".to_string(), "v4".to_string()]);
        assert_eq!(page.next_page_token, None);
    }

    #[tokio::test]
    async fn video_batch_keeps_malformed_items_separate() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/videos"))
            .and(query_param("id", "good,broken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"id": "good", "snippet": {
                        "title": "Good", "categoryId": "22",
                        "publishedAt": "2024-01-01T00:00:00Z"
                    }},
                    {"id": "broken"}
                ]
            })))
            .mount(&server)
            .await;

        let ids = vec!["good".to_string(), "broken".to_string()];
        let items = client_for(&server).get_videos(&ids).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().title, "Good");
        assert!(matches!(items[1], Err(TubekeeperError::MalformedRecord { .. })));
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_without_request() {
        let server = MockServer::start().await;
        let ids: Vec<String> = (0..51).map(|i| format!("v{i}")).collect();
        let err = client_for(&server).get_videos(&ids).await.unwrap_err();
        assert!(matches!(err, TubekeeperError::Validation { .. }));
    }

    #[tokio::test]
    async fn get_video_uses_fixture() {
        let server = MockServer::start().await;
        let fixture = std::fs::read_to_string("../../../fixtures/youtube/videos_list.json")
            .expect("read fixture");

        Mock::given(method("GET"))
            .and(path("/videos"))
            .and(query_param("id", "dp3Di1Hdgfk"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
            .mount(&server)
            .await;

        let video = client_for(&server)
            .get_video("dp3Di1Hdgfk")
            .await
            .unwrap()
            .expect("video");
        assert_eq!(video.title, "What your ApoE result really means");
    }

    #[tokio::test]
    async fn unknown_video_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
            .mount(&server)
            .await;

        assert!(client_for(&server).get_video("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_sends_full_snippet() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/videos"))
            .and(query_param("part", "snippet"))
            .and(body_partial_json(serde_json::json!({
                "id": "abc",
                "snippet": {
                    "title": "Kept title",
                    "description": "New body",
                    "tags": ["a", "b"],
                    "categoryId": "27",
                    "defaultLanguage": "en"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "abc"})))
            .expect(1)
            .mount(&server)
            .await;

        let update = VideoUpdate {
            id: "abc".into(),
            title: "Kept title".into(),
            description: "New body".into(),
            tags: vec!["a".into(), "b".into()],
            category_id: "27".into(),
            default_language: Some("en".into()),
        };
        client_for(&server).update_video(&update).await.unwrap();
    }

    #[tokio::test]
    async fn quota_errors_are_distinguished() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {
                    "code": 403,
                    "message": "The request cannot be completed because you have exceeded your quota.",
                    "errors": [{"reason": "quotaExceeded", "domain": "youtube.quota"}]
                }
            })))
            .mount(&server)
            .await;

        let update = VideoUpdate {
            id: "abc".into(),
            title: "T".into(),
            description: "D".into(),
            tags: vec![],
            category_id: "22".into(),
            default_language: None,
        };
        let err = client_for(&server).update_video(&update).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(err.to_string().contains("exceeded your quota"));
    }

    #[tokio::test]
    async fn server_errors_are_source_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/channels"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let err = client_for(&server).channel().await.unwrap_err();
        assert!(matches!(err, TubekeeperError::Source(_)));
        assert!(err.to_string().contains("500"));
    }
}
