//! Human-agent operations outside the AI turn loop.

use crate::error::ChatError;
use crate::memory::Message;
use crate::sessions::{Session, SessionPatch, SessionStatus};

use super::conversation::Orchestrator;

impl Orchestrator {
    /// A human agent takes over a session queued for handoff.
    ///
    /// Fails with `InvalidState` unless the session is `waiting_for_human`.
    pub async fn human_takeover(
        &self,
        session_id: &str,
        agent_id: &str,
        agent_name: &str,
    ) -> crate::Result<Session> {
        let session = self.load_session(session_id).await?;
        if session.status != SessionStatus::WaitingForHuman {
            return Err(ChatError::InvalidState {
                session_id: session_id.to_string(),
                expected: "waiting_for_human",
                actual: session.status,
            });
        }

        let updated = self
            .sessions
            .update(
                session_id,
                SessionPatch {
                    status: Some(SessionStatus::WithHuman),
                    human_agent_id: Some(Some(agent_id.to_string())),
                    metadata: None,
                },
            )
            .await?;

        self.memory
            .append(
                session_id,
                Message::human_agent(
                    format!("{agent_name} has joined the conversation and will assist you."),
                    agent_name,
                    agent_id,
                ),
            )
            .await?;

        Ok(updated)
    }

    /// An assigned human agent sends a message into the transcript.
    ///
    /// Fails with `NotAssigned` unless the session is `with_human` and held
    /// by the requesting agent.
    pub async fn send_human_agent_message(
        &self,
        session_id: &str,
        text: &str,
        agent_id: &str,
        agent_name: &str,
    ) -> crate::Result<()> {
        let session = self.load_session(session_id).await?;
        self.ensure_assigned(&session, agent_id)?;

        self.memory
            .append(session_id, Message::human_agent(text, agent_name, agent_id))
            .await?;
        Ok(())
    }

    /// The assigned human agent hands the session back to the AI.
    ///
    /// Fails with `NotAssigned` unless the requesting agent holds the
    /// session. Clears the assignment and returns the session to `active`.
    pub async fn transfer_to_ai(
        &self,
        session_id: &str,
        agent_id: &str,
        transfer_message: Option<&str>,
    ) -> crate::Result<Session> {
        let session = self.load_session(session_id).await?;
        self.ensure_assigned(&session, agent_id)?;

        if let Some(text) = transfer_message {
            let mut farewell = Message::new(crate::memory::Role::HumanAgent, text);
            farewell.metadata.agent_id = Some(agent_id.to_string());
            self.memory.append(session_id, farewell).await?;
        }

        self.memory
            .append(
                session_id,
                Message::system("This conversation has been transferred back to the AI assistant."),
            )
            .await?;

        self.sessions
            .update(
                session_id,
                SessionPatch {
                    status: Some(SessionStatus::Active),
                    human_agent_id: Some(None),
                    metadata: None,
                },
            )
            .await
    }

    /// Terminally end a session.
    pub async fn end_session(&self, session_id: &str) -> crate::Result<Session> {
        self.load_session(session_id).await?;
        self.sessions
            .update(
                session_id,
                SessionPatch {
                    status: Some(SessionStatus::Ended),
                    human_agent_id: Some(None),
                    metadata: None,
                },
            )
            .await
    }

    fn ensure_assigned(&self, session: &Session, agent_id: &str) -> crate::Result<()> {
        if session.status != SessionStatus::WithHuman
            || session.human_agent_id.as_deref() != Some(agent_id)
        {
            return Err(ChatError::NotAssigned {
                session_id: session.session_id.clone(),
                agent_id: agent_id.to_string(),
            });
        }
        Ok(())
    }
}
