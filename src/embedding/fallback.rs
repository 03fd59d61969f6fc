//! Deterministic hash-based fallback embeddings.
//!
//! Used whenever the remote inference service is unavailable. Every token
//! longer than two characters is hashed at three offsets into one of the
//! 384 buckets, weighted by `1/(1+position)` so earlier tokens dominate.
//! The result is sparse, content-sensitive, and order-sensitive, with no
//! network dependency: identical text always yields an identical vector.

use crate::embedding::math::normalize;
use crate::embedding::EMBEDDING_DIM;

/// Number of independent hash offsets per token.
const HASH_ROUNDS: u32 = 3;

/// Build a fallback embedding for arbitrary text.
pub fn fallback_embedding(text: &str) -> Vec<f32> {
    let lowered = text.to_lowercase();
    let words = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| w.len() > 2);

    let mut embedding = vec![0.0f32; EMBEDDING_DIM];

    for (position, word) in words.enumerate() {
        for offset in 0..HASH_ROUNDS {
            let bucket = simple_hash(&format!("{word}{offset}")) as usize % EMBEDDING_DIM;
            embedding[bucket] += 1.0 / (position as f32 + 1.0);
        }
    }

    normalize(embedding)
}

/// Rolling polynomial hash folded into the 32-bit signed range, then made
/// non-negative.
fn simple_hash(s: &str) -> u32 {
    let mut hash: i32 = 0;
    for ch in s.chars() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(ch as i32);
    }
    hash.unsigned_abs()
}
