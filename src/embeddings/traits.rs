//! Embedding provider trait for semantic recall.

use anyhow::Result;
use async_trait::async_trait;

/// Turns text into a fixed-length vector for similarity ranking.
///
/// All vectors produced by one provider instance share the same length;
/// mixing providers within a session invalidates relevance search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a piece of text into a vector of `dimensions()` components.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The fixed output vector length.
    fn dimensions(&self) -> usize;

    /// The name of this embedding provider.
    fn name(&self) -> &str;
}
