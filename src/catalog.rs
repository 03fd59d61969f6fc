//! Minimal client for the external video catalog.
//!
//! Only the call contract the matching core needs: parse a seed reference,
//! look up one item's details, and list a channel's items bounded at a
//! sane maximum. Pagination mechanics stay behind the trait.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;

/// Search pages are requested at the API maximum.
const PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogVideo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: String,
    pub view_count: String,
    pub duration: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog API key missing (set YOUTUBE_API_KEY)")]
    MissingCredentials,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog returned status {0}")]
    Status(u16),
}

pub trait VideoCatalog: Send + Sync {
    /// Full details for one item, or None when the catalog has no such id.
    fn video_details(&self, video_id: &str) -> Result<Option<CatalogVideo>, CatalogError>;

    /// Items for a channel, newest first, bounded at the configured cap.
    fn channel_videos(&self, channel_id: &str) -> Result<Vec<CatalogVideo>, CatalogError>;
}

static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/shorts/)([^&\n?#/]+)",
        r"youtube\.com/embed/([^&\n?#/]+)",
        r"^([A-Za-z0-9_-]{11})$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static video id pattern"))
    .collect()
});

/// Extract a video id from a watch/short/embed URL or a bare id.
pub fn extract_video_id(reference: &str) -> Option<String> {
    let reference = reference.trim();
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|p| p.captures(reference))
        .map(|c| c[1].to_string())
}

pub struct YouTubeCatalog {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
    max_channel_videos: usize,
    page_delay: Duration,
}

impl YouTubeCatalog {
    pub fn new(config: &CatalogConfig) -> Self {
        let api_key = std::env::var("YOUTUBE_API_KEY").ok();
        if api_key.is_none() {
            log::warn!("YOUTUBE_API_KEY is missing; catalog lookups will fail");
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("reqwest client with static options");

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
            max_channel_videos: config.max_channel_videos,
            page_delay: Duration::from_millis(config.page_delay_ms),
        }
    }

    fn key(&self) -> Result<&str, CatalogError> {
        self.api_key.as_deref().ok_or(CatalogError::MissingCredentials)
    }

    /// Batch details lookup for a comma-joined id list.
    fn videos_by_ids(&self, ids: &str) -> Result<Vec<CatalogVideo>, CatalogError> {
        let resp = self
            .client
            .get(format!("{}/videos", self.base_url))
            .query(&[
                ("part", "snippet,statistics,contentDetails"),
                ("id", ids),
                ("key", self.key()?),
            ])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let details: VideosResponse = resp.json()?;
        Ok(details.items.into_iter().map(CatalogVideo::from).collect())
    }
}

impl VideoCatalog for YouTubeCatalog {
    fn video_details(&self, video_id: &str) -> Result<Option<CatalogVideo>, CatalogError> {
        Ok(self.videos_by_ids(video_id)?.into_iter().next())
    }

    fn channel_videos(&self, channel_id: &str) -> Result<Vec<CatalogVideo>, CatalogError> {
        let key = self.key()?.to_string();
        let mut videos: Vec<CatalogVideo> = vec![];
        let mut page_token = String::new();

        loop {
            let mut query = vec![
                ("part", "snippet".to_string()),
                ("channelId", channel_id.to_string()),
                ("type", "video".to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
                ("order", "date".to_string()),
                ("key", key.clone()),
            ];
            if !page_token.is_empty() {
                query.push(("pageToken", page_token.clone()));
            }

            let resp = match self
                .client
                .get(format!("{}/search", self.base_url))
                .query(&query)
                .send()
            {
                Ok(resp) => resp,
                Err(err) => {
                    // Keep whatever pages were already fetched.
                    log::warn!("channel listing aborted: {err}");
                    break;
                }
            };

            if !resp.status().is_success() {
                log::warn!("channel listing aborted: status {}", resp.status());
                break;
            }

            let page: SearchResponse = match resp.json() {
                Ok(page) => page,
                Err(err) => {
                    log::warn!("channel listing aborted: {err}");
                    break;
                }
            };
            if page.items.is_empty() {
                break;
            }

            let ids = page
                .items
                .iter()
                .filter_map(|item| item.id.video_id.as_deref())
                .collect::<Vec<_>>()
                .join(",");

            match self.videos_by_ids(&ids) {
                Ok(batch) => videos.extend(batch),
                Err(err) => {
                    log::warn!("channel listing aborted: {err}");
                    break;
                }
            }

            log::debug!("fetched {} channel videos so far", videos.len());

            page_token = page.next_page_token.unwrap_or_default();
            if page_token.is_empty() || videos.len() >= self.max_channel_videos {
                break;
            }

            std::thread::sleep(self.page_delay);
        }

        videos.truncate(self.max_channel_videos);
        Ok(videos)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(rename = "contentDetails", default)]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt", default)]
    published_at: String,
    #[serde(rename = "channelId", default)]
    channel_id: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
}

#[derive(Debug, Default, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount", default)]
    view_count: String,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

impl From<VideoItem> for CatalogVideo {
    fn from(item: VideoItem) -> Self {
        CatalogVideo {
            id: item.id,
            title: item.snippet.title,
            description: item.snippet.description,
            channel_id: item.snippet.channel_id,
            channel_title: item.snippet.channel_title,
            published_at: item.snippet.published_at,
            view_count: item.statistics.view_count,
            duration: item.content_details.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_watch_url_with_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_short_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_shorts_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/abc123xyz_-"),
            Some("abc123xyz_-".to_string())
        );
    }

    #[test]
    fn test_extract_embed_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_bare_id() {
        assert_eq!(
            extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_rejects_garbage() {
        assert_eq!(extract_video_id("not a video reference"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=zzz"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_video_item_deserializes_sparse_payload() {
        // Statistics and contentDetails are omitted for some item kinds.
        let item: VideoItem = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "snippet": { "title": "A title", "channelId": "chan" },
        }))
        .unwrap();

        let video = CatalogVideo::from(item);
        assert_eq!(video.id, "abc");
        assert_eq!(video.title, "A title");
        assert_eq!(video.view_count, "");
        assert_eq!(video.duration, "");
    }
}
