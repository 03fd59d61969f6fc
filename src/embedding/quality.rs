//! Statistical quality classification of embeddings.
//!
//! Remote-model and fallback vectors are told apart purely by shape;
//! nothing tags a stored embedding with its origin. A real model output is
//! unit-normalized and dense, the hash fallback is sparse, and anything
//! with the wrong dimension is excluded from scoring entirely.
//!
//! Analysis is cheap but not free: callers compute a report once per
//! vector and carry it, rather than re-deriving it inside scoring loops.

use serde::Serialize;

use crate::embedding::math::l2_norm;
use crate::embedding::EMBEDDING_DIM;

/// Statistical class of an embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingQuality {
    /// Unit norm, mostly non-zero components: a real model output.
    DenseNormalized,
    /// Sparse hash-bucket vector from the local fallback.
    SparseFallback,
    /// Wrong dimension; excluded from scoring.
    Invalid,
}

/// Quality classification with a confidence scalar and diagnostic text.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub kind: EmbeddingQuality,
    pub confidence: f32,
    pub details: String,
}

impl QualityReport {
    pub fn analyze(embedding: &[f32]) -> Self {
        if embedding.len() != EMBEDDING_DIM {
            return Self {
                kind: EmbeddingQuality::Invalid,
                confidence: 0.0,
                details: format!("wrong dimension: {}", embedding.len()),
            };
        }

        let norm = l2_norm(embedding);
        let non_zero = embedding.iter().filter(|v| v.abs() > 0.001).count();
        let max_value = embedding.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));

        let is_normalized = (norm - 1.0).abs() < 0.1;
        let is_dense = non_zero > 200;
        let is_reasonable_range = max_value < 1.0;

        if is_normalized && is_dense && is_reasonable_range {
            return Self {
                kind: EmbeddingQuality::DenseNormalized,
                confidence: 0.9,
                details: format!(
                    "normalized ({norm:.3}), dense ({non_zero}/{EMBEDDING_DIM} non-zero)"
                ),
            };
        }

        if non_zero < 50 {
            return Self {
                kind: EmbeddingQuality::SparseFallback,
                confidence: 0.8,
                details: format!("sparse ({non_zero}/{EMBEDDING_DIM} non-zero), norm: {norm:.3}"),
            };
        }

        Self {
            kind: EmbeddingQuality::SparseFallback,
            confidence: 0.6,
            details: format!("uncertain quality, norm: {norm:.3}, non-zero: {non_zero}"),
        }
    }

    pub fn is_dense(&self) -> bool {
        self.kind == EmbeddingQuality::DenseNormalized
    }

    pub fn is_invalid(&self) -> bool {
        self.kind == EmbeddingQuality::Invalid
    }
}
