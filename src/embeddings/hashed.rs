//! Deterministic feature-hashing embedder.
//!
//! Buckets each token of the input into a fixed-length vector using a
//! SHA-256 digest, then L2-normalizes. No model download, no network, and
//! the same text always embeds to the same vector, so relevance ranking is
//! stable across runs. Texts sharing tokens score high on cosine
//! similarity; it is a lexical signal, not a semantic one.

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::traits::EmbeddingProvider;

pub const DEFAULT_DIMENSIONS: usize = 256;

/// Local embedder hashing tokens into a fixed-dimension vector.
pub struct HashedEmbedding {
    dimensions: usize,
}

impl HashedEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let hash = u64::from_be_bytes(bytes);
        let index = (hash % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashedEmbedding {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let (index, sign) = self.bucket(&token.to_lowercase());
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for component in &mut vector {
                *component /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::similarity::cosine_similarity;

    #[tokio::test]
    async fn embedding_is_deterministic() {
        let embedder = HashedEmbedding::default();
        let a = embedder.embed("the quick brown fox").await.unwrap();
        let b = embedder.embed("the quick brown fox").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn embedding_has_declared_dimensions() {
        let embedder = HashedEmbedding::new(64);
        let v = embedder.embed("hello world").await.unwrap();
        assert_eq!(v.len(), 64);
        assert_eq!(embedder.dimensions(), 64);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let embedder = HashedEmbedding::default();
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn output_is_unit_length() {
        let embedder = HashedEmbedding::default();
        let v = embedder.embed("normalize me please").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn tokenization_ignores_case_and_punctuation() {
        let embedder = HashedEmbedding::default();
        let a = embedder.embed("Hello, World!").await.unwrap();
        let b = embedder.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn overlapping_text_ranks_above_disjoint_text() {
        let embedder = HashedEmbedding::default();
        let query = embedder.embed("refund for my order").await.unwrap();
        let close = embedder.embed("I want a refund on this order").await.unwrap();
        let far = embedder.embed("sunny weather in lisbon").await.unwrap();
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }
}
