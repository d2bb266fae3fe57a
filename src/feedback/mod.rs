//! Append-only feedback records for assistant outputs.
//!
//! Feedback is keyed by session and message, stored as a JSON list per
//! session in the key-value store. Records are never updated in place.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::store::KeyValueStore;

fn feedback_key(session_id: &str) -> String {
    format!("chat:feedback:{session_id}")
}

/// Where a piece of feedback came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    User,
    System,
    Model,
    External,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// The payload of a feedback record, tagged by type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackKind {
    Rating {
        /// 1 (worst) through 5 (best).
        rating: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        aspect: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
    Comment {
        comment: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sentiment: Option<Sentiment>,
    },
    Correction {
        original_text: String,
        corrected_text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// One recorded piece of feedback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: String,
    pub session_id: String,
    pub message_id: String,
    pub source: FeedbackSource,
    #[serde(flatten)]
    pub kind: FeedbackKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Aggregate view over a session's feedback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackSummary {
    pub total: usize,
    pub average_rating: Option<f64>,
    pub corrections: usize,
}

/// Per-session feedback log over the key-value store.
pub struct FeedbackLog {
    store: Arc<dyn KeyValueStore>,
}

impl FeedbackLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Append a feedback record and return it with its assigned id.
    pub async fn record(
        &self,
        session_id: &str,
        message_id: &str,
        source: FeedbackSource,
        kind: FeedbackKind,
        tags: Vec<String>,
    ) -> Result<Feedback> {
        if let FeedbackKind::Rating { rating, .. } = &kind {
            anyhow::ensure!(
                (1..=5).contains(rating),
                "rating must be between 1 and 5, got {rating}"
            );
        }

        let feedback = Feedback {
            id: format!("fb-{}", Uuid::new_v4()),
            session_id: session_id.to_string(),
            message_id: message_id.to_string(),
            source,
            kind,
            timestamp: Utc::now(),
            tags,
        };

        let mut all = self.for_session(session_id).await?;
        all.push(feedback.clone());
        self.store
            .set(&feedback_key(session_id), &serde_json::to_string(&all)?)
            .await?;
        Ok(feedback)
    }

    /// All feedback recorded for a session, oldest first.
    pub async fn for_session(&self, session_id: &str) -> Result<Vec<Feedback>> {
        let Some(raw) = self.store.get(&feedback_key(session_id)).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Feedback>>(&raw) {
            Ok(list) => Ok(list),
            Err(err) => {
                warn!("failed to parse feedback for {session_id}: {err}");
                Ok(Vec::new())
            }
        }
    }

    /// Aggregate counts and average rating for a session.
    pub async fn summary(&self, session_id: &str) -> Result<FeedbackSummary> {
        let all = self.for_session(session_id).await?;
        let ratings: Vec<u8> = all
            .iter()
            .filter_map(|f| match &f.kind {
                FeedbackKind::Rating { rating, .. } => Some(*rating),
                _ => None,
            })
            .collect();
        let corrections = all
            .iter()
            .filter(|f| matches!(f.kind, FeedbackKind::Correction { .. }))
            .count();
        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64)
        };
        Ok(FeedbackSummary {
            total: all.len(),
            average_rating,
            corrections,
        })
    }
}
