//! Error taxonomy for the public chat operations.
//!
//! Structural misuse (`SessionNotFound`, `InvalidState`, `NotAssigned`,
//! `ToolNotFound`) is raised to the caller. Provider failures during a
//! message turn are absorbed by the orchestrator and surfaced as a degraded
//! assistant message, never as an error from `send_message`.

use crate::sessions::SessionStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session {session_id} is {actual}, expected {expected}")]
    InvalidState {
        session_id: String,
        expected: &'static str,
        actual: SessionStatus,
    },

    #[error("agent {agent_id} is not assigned to session {session_id}")]
    NotAssigned {
        session_id: String,
        agent_id: String,
    },

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
