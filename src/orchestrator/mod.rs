//! Conversation orchestration: the top-level state machine that routes an
//! inbound user message to the completion provider or a human agent,
//! executes requested tools, and emits the outbound message plus handoff
//! signal.

pub mod conversation;
pub mod human;


pub use conversation::Orchestrator;

use serde::{Deserialize, Serialize};

use crate::memory::Message;

/// Signal that a session has been (or remains) queued for a human agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Handoff {
    pub requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of one `send_message` turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    pub response: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<Handoff>,
}
