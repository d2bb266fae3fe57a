//! Session record types for conversation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Lifecycle status of a conversation session.
///
/// Transitions move only along defined edges: `Active` loops on normal
/// turns, a queued handoff moves to `WaitingForHuman`, an explicit takeover
/// moves to `WithHuman`, a transfer back to the AI returns to `Active`, and
/// `Ended` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    WaitingForHuman,
    WithHuman,
    Ended,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::WaitingForHuman => "waiting_for_human",
            SessionStatus::WithHuman => "with_human",
            SessionStatus::Ended => "ended",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked conversation session.
///
/// `human_agent_id` is set exactly while status is `WithHuman`; the
/// orchestrator's transition operations maintain that invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied to a session record.
///
/// `human_agent_id` distinguishes "leave unchanged" (`None`) from
/// "clear the assignment" (`Some(None)`). A supplied metadata map replaces
/// the stored one wholesale; callers merge first when they want additive
/// updates.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    pub human_agent_id: Option<Option<String>>,
    pub metadata: Option<HashMap<String, Value>>,
}

impl SessionPatch {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}
