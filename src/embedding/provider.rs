//! Quality-aware embedding provider.
//!
//! The remote inference service is the primary path; any failure there
//! degrades to the deterministic local fallback. `embed` therefore never
//! fails and always returns a unit-normalized 384-dimension vector.

use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::embedding::fallback::fallback_embedding;
use crate::embedding::math::normalize;
use crate::embedding::remote::{EmbedError, RemoteEmbedder};

/// Seam for everything that needs text embeddings.
pub trait TextEmbedder: Send + Sync {
    /// Embed arbitrary text. Infallible: degraded output beats no output.
    fn embed(&self, text: &str) -> Vec<f32>;
}

pub struct Embedder {
    remote: Option<RemoteEmbedder>,
}

impl Embedder {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let remote = if config.enabled {
            Some(RemoteEmbedder::new(
                &config.endpoint,
                Duration::from_secs(config.request_timeout_secs),
                Duration::from_millis(config.loading_retry_delay_ms),
            ))
        } else {
            log::info!("remote embeddings disabled; using local fallback only");
            None
        };

        Self { remote }
    }

    /// Strip non-word characters and collapse whitespace runs.
    fn clean(text: &str) -> String {
        let replaced: String = text
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();

        replaced.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl TextEmbedder for Embedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let cleaned = Self::clean(text);
        if cleaned.is_empty() {
            log::warn!("empty input after cleaning, using fallback");
            return fallback_embedding(text);
        }

        if let Some(remote) = &self.remote {
            match remote.embed(&cleaned) {
                Ok(vector) => return normalize(vector),
                Err(EmbedError::Disabled) => {}
                Err(err) => {
                    log::warn!("remote embedding failed ({err}), using fallback");
                }
            }
        }

        fallback_embedding(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::math::l2_norm;
    use crate::embedding::EMBEDDING_DIM;

    fn offline_embedder() -> Embedder {
        let config = EmbeddingConfig {
            enabled: false,
            ..Default::default()
        };
        Embedder::new(&config)
    }

    #[test]
    fn test_clean_strips_punctuation() {
        assert_eq!(
            Embedder::clean("Part 3: The Finale!! (official)"),
            "Part 3 The Finale official"
        );
    }

    #[test]
    fn test_clean_collapses_whitespace() {
        assert_eq!(Embedder::clean("  a \t b \n  c  "), "a b c");
    }

    #[test]
    fn test_clean_keeps_underscores() {
        assert_eq!(Embedder::clean("snake_case stays"), "snake_case stays");
    }

    #[test]
    fn test_embed_never_wrong_dimension() {
        let embedder = offline_embedder();
        for text in ["", "?!", "normal text", "part 4"] {
            let v = embedder.embed(text);
            assert_eq!(v.len(), EMBEDDING_DIM);
            assert!(v.iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn test_embed_deterministic_offline() {
        let embedder = offline_embedder();
        assert_eq!(embedder.embed("same text"), embedder.embed("same text"));
    }

    #[test]
    fn test_embed_normalized() {
        let embedder = offline_embedder();
        let v = embedder.embed("a normalized embedding");
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_punctuation_only_input_takes_fallback_path() {
        let embedder = offline_embedder();
        // Cleaning empties the text; the fallback sees the original, which
        // has no usable tokens either, so the vector is all zeros.
        let v = embedder.embed("?!...");
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
