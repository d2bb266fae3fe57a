pub mod hashed;
pub mod openai;
pub mod traits;

pub use hashed::HashedEmbedding;
pub use openai::OpenAiCompatibleEmbedding;
pub use traits::EmbeddingProvider;

use std::sync::Arc;

/// Factory: create the right embedding backend from config
pub fn create_embedder(
    kind: &str,
    api_key: Option<&str>,
    api_url: Option<&str>,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "hashed" => Ok(Arc::new(HashedEmbedding::default())),
        "openai" => Ok(Arc::new(OpenAiCompatibleEmbedding::new(api_key, api_url))),
        "" => anyhow::bail!("embedding backend cannot be empty. Supported values: hashed, openai"),
        other => anyhow::bail!(
            "Unknown embedding backend '{other}'. Supported values: hashed, openai"
        ),
    }
}
