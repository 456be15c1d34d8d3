//! Bundled fixed-model sentence encoder (§4.10): deterministic feature
//! hashing into [`forge_protocol::memory::EMBEDDING_DIM`] dimensions.
//!
//! A real deployment can swap this for a loaded ONNX/GGUF encoder
//! without touching any caller — every store/search path only depends on
//! `embed` producing a fixed-length, L2-normalized vector for the same
//! input text.

use forge_protocol::memory::EMBEDDING_DIM;

/// Embeds `text` deterministically: each whitespace-delimited token is
/// hashed into a signed bucket (the "hashing trick"), buckets are summed,
/// and the result is L2-normalized so cosine similarity behaves like it
/// would for a trained encoder.
pub fn embed(text: &str) -> Vec<f32> {
    let mut buckets = vec![0f32; EMBEDDING_DIM];
    for token in text.split_whitespace() {
        let hash = fnv1a(token.as_bytes());
        let index = (hash % EMBEDDING_DIM as u64) as usize;
        let sign = if hash & 1 == 0 { 1.0 } else { -1.0 };
        buckets[index] += sign;
    }

    let norm = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut buckets {
            *value /= norm;
        }
    }
    buckets
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn embedding_has_fixed_dimension() {
        assert_eq!(embed("hello world").len(), EMBEDDING_DIM);
    }

    #[test]
    fn identical_text_embeds_identically() {
        assert_eq!(embed("same text"), embed("same text"));
    }

    #[test]
    fn similar_text_scores_higher_than_unrelated_text() {
        let a = embed("database connection pool timeout retry");
        let b = embed("database connection pool timeout backoff");
        let c = embed("frontend stylesheet color palette");
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }
}
