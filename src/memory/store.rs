//! Transcript storage with retention and recall.
//!
//! Appends are read-modify-write against the key-value store: the stored
//! list is loaded, extended, run through the retention policy, and written
//! back whole. Concurrent appends against one session can therefore race
//! and drop one side's update; callers needing stronger guarantees must
//! serialize per-session mutation themselves.

use anyhow::Result;
use chrono::Utc;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::similarity::cosine_similarity;
use super::types::{Message, Role};
use super::MemoryOptions;
use crate::embeddings::EmbeddingProvider;
use crate::sessions::SessionManager;
use crate::store::KeyValueStore;

/// Compacted transcripts keep at most this many recent messages.
const RECENT_BOUND: usize = 20;

fn memory_key(session_id: &str) -> String {
    format!("chat:memory:{session_id}")
}

/// Per-session transcript store.
pub struct MessageStore {
    store: Arc<dyn KeyValueStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    sessions: Arc<SessionManager>,
    options: MemoryOptions,
}

impl MessageStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        sessions: Arc<SessionManager>,
        options: MemoryOptions,
    ) -> Self {
        Self {
            store,
            embedder,
            sessions,
            options,
        }
    }

    /// Append a message using the store's configured retention options.
    pub async fn append(&self, session_id: &str, message: Message) -> Result<()> {
        let options = self.options.clone();
        self.append_with(session_id, message, &options).await
    }

    /// Append a message with per-call retention options.
    ///
    /// Fills a missing timestamp, computes an embedding unless disabled
    /// (failures are logged and the message is stored without one), applies
    /// retention, persists the list with the configured TTL, and refreshes
    /// the session's `updated_at`.
    pub async fn append_with(
        &self,
        session_id: &str,
        mut message: Message,
        options: &MemoryOptions,
    ) -> Result<()> {
        let mut messages = self.get_all(session_id).await?;

        if message.metadata.timestamp.is_none() {
            message.metadata.timestamp = Some(Utc::now());
        }

        if options.use_embeddings {
            match self.embedder.embed(message.content_str()).await {
                Ok(vector) => message.metadata.embedding = Some(vector),
                Err(err) => {
                    warn!("embedding failed for message in {session_id}: {err}");
                }
            }
        }

        messages.push(message);
        let retained = apply_retention(messages, options);

        let key = memory_key(session_id);
        self.store.set(&key, &serde_json::to_string(&retained)?).await?;
        if options.ttl_seconds > 0 {
            self.store
                .expire(&key, Duration::from_secs(options.ttl_seconds))
                .await?;
        }

        self.sessions.touch(session_id).await?;
        Ok(())
    }

    /// The stored transcript, verbatim. Absent or unparsable records yield
    /// an empty list.
    pub async fn get_all(&self, session_id: &str) -> Result<Vec<Message>> {
        let Some(raw) = self.store.get(&memory_key(session_id)).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) => Ok(messages),
            Err(err) => {
                warn!("failed to parse transcript for {session_id}: {err}");
                Ok(Vec::new())
            }
        }
    }

    /// The last `count` messages, in original order.
    pub async fn get_recent(&self, session_id: &str, count: usize) -> Result<Vec<Message>> {
        let messages = self.get_all(session_id).await?;
        let start = messages.len().saturating_sub(count);
        Ok(messages[start..].to_vec())
    }

    /// The `count` messages most similar to `query`, best first.
    ///
    /// Falls back to `get_recent` when no stored message carries an
    /// embedding, or when embedding the query fails.
    pub async fn get_relevant(
        &self,
        session_id: &str,
        query: &str,
        count: usize,
    ) -> Result<Vec<Message>> {
        let messages = self.get_all(session_id).await?;

        let with_embeddings: Vec<&Message> = messages
            .iter()
            .filter(|m| m.metadata.embedding.is_some())
            .collect();
        if with_embeddings.is_empty() {
            return self.get_recent(session_id, count).await;
        }

        let query_vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!("embedding query failed for {session_id}: {err}");
                return self.get_recent(session_id, count).await;
            }
        };

        let mut scored: Vec<(f32, &Message)> = with_embeddings
            .into_iter()
            .map(|m| {
                let embedding = m.metadata.embedding.as_deref().unwrap_or_default();
                (cosine_similarity(&query_vector, embedding), m)
            })
            .collect();
        // Stable sort: ties keep stored order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(count)
            .map(|(_, m)| m.clone())
            .collect())
    }
}

/// Bound the transcript per the retention policy.
///
/// At `summarize_threshold` the list is compacted to the prior `system`
/// messages, one synthetic summary message naming the original count, and
/// the most recent non-system messages (half the list, bounded to
/// [`RECENT_BOUND`]). Below that, anything over `max_messages` keeps only
/// the newest entries. Compaction is irreversible.
pub fn apply_retention(messages: Vec<Message>, options: &MemoryOptions) -> Vec<Message> {
    if options.summarize_threshold > 0 && messages.len() >= options.summarize_threshold {
        compact(messages)
    } else if messages.len() > options.max_messages {
        let start = messages.len() - options.max_messages;
        messages[start..].to_vec()
    } else {
        messages
    }
}

fn compact(messages: Vec<Message>) -> Vec<Message> {
    let total = messages.len();
    let recent_count = RECENT_BOUND.min(total / 2);

    let (mut compacted, non_system): (Vec<Message>, Vec<Message>) =
        messages.into_iter().partition(|m| m.role == Role::System);

    let mut summary = Message::system(format!(
        "This conversation contains {total} previous messages that have been summarized."
    ));
    summary.metadata.timestamp = Some(Utc::now());
    compacted.push(summary);

    let tail_start = non_system.len().saturating_sub(recent_count);
    compacted.extend_from_slice(&non_system[tail_start..]);
    compacted
}
