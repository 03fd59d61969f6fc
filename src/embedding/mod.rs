//! Embedding generation and vector analysis.
//!
//! This module turns arbitrary text into fixed-length vectors and provides
//! the math used to compare them:
//!
//! - `provider`: remote-first embedding with a local fallback
//! - `remote`: inference service client
//! - `fallback`: deterministic hash-based embedding
//! - `math`: cosine similarity and normalization
//! - `quality`: statistical quality classification

pub mod fallback;
pub mod math;
pub mod provider;
pub mod quality;
pub mod remote;

pub use math::cosine_similarity;
pub use provider::{Embedder, TextEmbedder};
pub use quality::{EmbeddingQuality, QualityReport};

/// Vector dimension produced by both the remote model and the fallback.
pub const EMBEDDING_DIM: usize = 384;
