//! Cross-module tests driving the engine with stub collaborators.
//!
//! The fallback embedding path is deterministic, so everything here runs
//! offline; scripted embedders stand in for the remote model where exact
//! similarity values matter.

mod store_csv;

use std::collections::HashMap;

use crate::catalog::{CatalogError, CatalogVideo, VideoCatalog};
use crate::embedding::fallback::fallback_embedding;
use crate::embedding::{TextEmbedder, EMBEDDING_DIM};

pub fn video(id: &str, title: &str, description: &str, channel_id: &str) -> CatalogVideo {
    CatalogVideo {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        channel_id: channel_id.to_string(),
        channel_title: format!("Channel {channel_id}"),
        published_at: "2024-05-01T12:00:00Z".to_string(),
        view_count: "1000".to_string(),
        duration: "PT1M".to_string(),
    }
}

/// All components equal: unit norm, dense, max well below 1.
pub fn dense_unit() -> Vec<f32> {
    vec![1.0 / (EMBEDDING_DIM as f32).sqrt(); EMBEDDING_DIM]
}

/// Dense unit vector with the given cosine against `dense_unit()`.
pub fn dense_with_similarity(cos: f32) -> Vec<f32> {
    let a = 1.0 / (EMBEDDING_DIM as f32).sqrt();
    let sin = (1.0 - cos * cos).sqrt();
    (0..EMBEDDING_DIM)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            cos * a + sign * sin * a
        })
        .collect()
}

/// Embedder that always takes the deterministic fallback path.
pub struct OfflineEmbedder;

impl TextEmbedder for OfflineEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        fallback_embedding(text)
    }
}

/// Embedder with scripted vectors for known texts, fallback otherwise.
#[derive(Default)]
pub struct StubEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, video: &CatalogVideo, vector: Vec<f32>) -> Self {
        self.vectors
            .insert(format!("{} {}", video.title, video.description), vector);
        self
    }
}

impl TextEmbedder for StubEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        self.vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| fallback_embedding(text))
    }
}

/// In-memory catalog with fixed videos and channel listings.
#[derive(Default)]
pub struct StubCatalog {
    videos: HashMap<String, CatalogVideo>,
    channels: HashMap<String, Vec<CatalogVideo>>,
}

impl StubCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, video: CatalogVideo) -> Self {
        self.channels
            .entry(video.channel_id.clone())
            .or_default()
            .push(video.clone());
        self.videos.insert(video.id.clone(), video);
        self
    }
}

impl VideoCatalog for StubCatalog {
    fn video_details(&self, video_id: &str) -> Result<Option<CatalogVideo>, CatalogError> {
        Ok(self.videos.get(video_id).cloned())
    }

    fn channel_videos(&self, channel_id: &str) -> Result<Vec<CatalogVideo>, CatalogError> {
        Ok(self.channels.get(channel_id).cloned().unwrap_or_default())
    }
}

/// Catalog that fails every call, for degraded-path tests.
pub struct UnreachableCatalog;

impl VideoCatalog for UnreachableCatalog {
    fn video_details(&self, _video_id: &str) -> Result<Option<CatalogVideo>, CatalogError> {
        Err(CatalogError::MissingCredentials)
    }

    fn channel_videos(&self, _channel_id: &str) -> Result<Vec<CatalogVideo>, CatalogError> {
        Err(CatalogError::MissingCredentials)
    }
}
