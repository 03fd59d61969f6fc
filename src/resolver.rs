//! Series resolution: ranking a channel's videos against a seed video.
//!
//! Base semantic similarity is blended with pattern features learned from
//! the reference corpus, then cut at a threshold that adapts to embedding
//! quality: degraded (fallback) embeddings compress absolute similarity
//! values, so mixed-quality batches use the lower threshold.

use std::sync::Arc;
use std::thread;

use serde::Serialize;

use crate::catalog::CatalogVideo;
use crate::config::MatchingConfig;
use crate::embedding::{cosine_similarity, EmbeddingQuality, QualityReport, TextEmbedder};
use crate::patterns::{series_indicator_score, PatternModel};

/// One ranked candidate with its blended score and sub-scores.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    #[serde(flatten)]
    pub video: CatalogVideo,
    /// Blended score in [0, 1].
    pub score: f32,
    pub base_similarity: f32,
    pub title_pattern: f32,
    pub content_pattern: f32,
    pub series_indicator: f32,
    pub embedding_quality: EmbeddingQuality,
}

pub struct SeriesResolver {
    embedder: Arc<dyn TextEmbedder>,
    config: MatchingConfig,
}

impl SeriesResolver {
    pub fn new(embedder: Arc<dyn TextEmbedder>, config: MatchingConfig) -> Self {
        Self { embedder, config }
    }

    /// Rank `candidates` by series affinity to `seed`.
    ///
    /// An empty pool, or zero candidates above the threshold, yields an
    /// empty vector: a valid "no series match found" outcome.
    pub fn resolve(
        &self,
        seed: &CatalogVideo,
        candidates: &[CatalogVideo],
        patterns: &PatternModel,
    ) -> Vec<MatchResult> {
        let seed_embedding = self.embedder.embed(&embed_text(seed));
        let seed_quality = QualityReport::analyze(&seed_embedding);
        log::info!(
            "seed embedding quality: {:?} ({})",
            seed_quality.kind,
            seed_quality.details
        );

        let pool: Vec<&CatalogVideo> = candidates.iter().filter(|c| c.id != seed.id).collect();
        if pool.is_empty() {
            return vec![];
        }

        if patterns.is_empty() {
            log::debug!("pattern model is empty, pattern features contribute nothing");
        }

        let embeddings = self.embed_pool(&pool);

        let mut any_dense_candidate = false;
        let mut results = Vec::with_capacity(pool.len());

        for (candidate, embedding) in pool.iter().zip(embeddings) {
            let (base, quality) = match embedding {
                Some(vector) => {
                    let quality = QualityReport::analyze(&vector);
                    let base = if quality.is_invalid() {
                        0.0
                    } else {
                        cosine_similarity(&seed_embedding, &vector)
                    };
                    (base, quality.kind)
                }
                None => (0.0, EmbeddingQuality::Invalid),
            };

            if quality == EmbeddingQuality::DenseNormalized {
                any_dense_candidate = true;
            }

            let title_pattern = patterns.title_similarity(&seed.title, &candidate.title);
            let content_pattern = patterns.content_similarity(
                &seed.title,
                &seed.description,
                &candidate.title,
                &candidate.description,
            );
            let series_indicator = series_indicator_score(&seed.title, &candidate.title);

            let score = (self.config.semantic_weight * base
                + self.config.title_pattern_weight * title_pattern
                + self.config.content_pattern_weight * content_pattern
                + self.config.series_indicator_weight * series_indicator)
                .min(1.0);

            results.push(MatchResult {
                video: (*candidate).clone(),
                score,
                base_similarity: base,
                title_pattern,
                content_pattern,
                series_indicator,
                embedding_quality: quality,
            });
        }

        let threshold = if seed_quality.is_dense() && any_dense_candidate {
            self.config.dense_threshold
        } else {
            log::info!(
                "mixed embedding quality, using degraded threshold {}",
                self.config.degraded_threshold
            );
            self.config.degraded_threshold
        };

        results.retain(|r| r.score > threshold);
        // Stable sort: ties keep candidate input order.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(self.config.max_results);

        log::info!(
            "{} candidates above {:.0}% threshold",
            results.len(),
            threshold * 100.0
        );
        results
    }

    /// Embed candidates in bounded parallel batches.
    ///
    /// Candidates are independent, so each batch fans out on scoped
    /// threads; a failed worker only loses its own slot.
    fn embed_pool(&self, pool: &[&CatalogVideo]) -> Vec<Option<Vec<f32>>> {
        let parallelism = self.config.embed_parallelism.max(1);
        let mut embeddings = Vec::with_capacity(pool.len());

        for batch in pool.chunks(parallelism) {
            let batch_embeddings: Vec<Option<Vec<f32>>> = thread::scope(|s| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|candidate| {
                        let embedder = &self.embedder;
                        let text = embed_text(candidate);
                        s.spawn(move || embedder.embed(&text))
                    })
                    .collect();

                handles
                    .into_iter()
                    .enumerate()
                    .map(|(idx, handle)| match handle.join() {
                        Ok(vector) => Some(vector),
                        Err(_) => {
                            log::warn!("failed to embed candidate {}", batch[idx].id);
                            None
                        }
                    })
                    .collect()
            });

            embeddings.extend(batch_embeddings);
        }

        embeddings
    }
}

fn embed_text(video: &CatalogVideo) -> String {
    format!("{} {}", video.title, video.description)
}
