//! Key-value store traits backing session and transcript persistence.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Persistent string-keyed storage for session records and transcripts.
///
/// The store knows nothing about sessions: values are opaque JSON strings
/// and expiry is a per-key time-to-live. Writes are last-writer-wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value for a key, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set the value for a key, overwriting any prior value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Apply a time-to-live to an existing key. No-op for absent keys.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// The name of this store implementation.
    fn name(&self) -> &str;
}
