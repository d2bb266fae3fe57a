pub mod similarity;
pub mod store;
pub mod types;

pub use similarity::cosine_similarity;
pub use store::{apply_retention, MessageStore};
pub use types::{FunctionCall, Message, MessageMetadata, Role};

use serde::{Deserialize, Serialize};

/// Retention and embedding options for a session transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MemoryOptions {
    /// Compute an embedding for each appended message.
    pub use_embeddings: bool,
    /// Hard cap on stored messages when no compaction has happened.
    pub max_messages: usize,
    /// Transcript length at which compaction kicks in; 0 disables it.
    pub summarize_threshold: usize,
    /// Time-to-live applied to the stored transcript; 0 disables expiry.
    pub ttl_seconds: u64,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            use_embeddings: true,
            max_messages: 100,
            summarize_threshold: 50,
            ttl_seconds: 60 * 60 * 24 * 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let options = MemoryOptions::default();
        assert!(options.use_embeddings);
        assert_eq!(options.max_messages, 100);
        assert_eq!(options.summarize_threshold, 50);
        assert_eq!(options.ttl_seconds, 2_592_000);
    }

    #[test]
    fn options_deserialize_with_partial_fields() {
        let options: MemoryOptions = toml::from_str("max_messages = 10").unwrap();
        assert_eq!(options.max_messages, 10);
        assert_eq!(options.summarize_threshold, 50);
    }
}
