//! Default human-handoff tool.
//!
//! The orchestrator watches for this tool by name: a `queued` result
//! transitions the session to `waiting_for_human`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::traits::Tool;
use crate::sessions::{Session, SessionManager};

/// Name the completion provider uses to request a handoff.
pub const HANDOFF_TOOL_NAME: &str = "transferToHuman";

/// User-facing text returned alongside a queued handoff.
pub const HANDOFF_MESSAGE: &str = "I'm transferring you to a human agent who can better \
assist you. Please wait a few moments while I connect you.";

/// Queues the conversation for a human support agent.
pub struct HumanHandoffTool {
    sessions: Arc<SessionManager>,
}

impl HumanHandoffTool {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Tool for HumanHandoffTool {
    fn name(&self) -> &str {
        HANDOFF_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Transfer this conversation to a human support agent"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "reason": {
                    "type": "string",
                    "description": "Reason for transferring to human"
                },
                "urgency": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "description": "Urgency level of the request"
                }
            },
            "required": ["reason"]
        })
    }

    async fn execute(&self, params: &Value, session: &Session) -> Result<Value> {
        let reason = params
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("unspecified");
        let urgency = params
            .get("urgency")
            .and_then(Value::as_str)
            .unwrap_or("medium");

        self.sessions
            .merge_metadata(
                &session.session_id,
                [
                    ("handoff_reason".to_string(), Value::from(reason)),
                    ("handoff_urgency".to_string(), Value::from(urgency)),
                ],
            )
            .await?;

        Ok(json!({
            "status": "queued",
            "estimated_wait": "2-5 minutes",
            "ticket_id": format!("ticket-{}", Uuid::new_v4()),
            "message": HANDOFF_MESSAGE,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    async fn setup() -> (Arc<SessionManager>, Session) {
        let sessions = Arc::new(SessionManager::new(Arc::new(InMemoryStore::new())));
        let session = sessions.create("u1", None).await.unwrap();
        (sessions, session)
    }

    #[tokio::test]
    async fn returns_queued_acknowledgement() {
        let (sessions, session) = setup().await;
        let tool = HumanHandoffTool::new(sessions);

        let result = tool
            .execute(&json!({"reason": "billing dispute"}), &session)
            .await
            .unwrap();
        assert_eq!(result["status"], "queued");
        assert!(result["ticket_id"].as_str().unwrap().starts_with("ticket-"));
        assert!(!result["message"].as_str().unwrap().is_empty());
        assert_eq!(result["estimated_wait"], "2-5 minutes");
    }

    #[tokio::test]
    async fn records_reason_and_urgency_in_metadata() {
        let (sessions, session) = setup().await;
        let tool = HumanHandoffTool::new(sessions.clone());

        tool.execute(
            &json!({"reason": "billing dispute", "urgency": "high"}),
            &session,
        )
        .await
        .unwrap();

        let updated = sessions.get(&session.session_id).await.unwrap().unwrap();
        assert_eq!(updated.metadata["handoff_reason"], "billing dispute");
        assert_eq!(updated.metadata["handoff_urgency"], "high");
    }

    #[tokio::test]
    async fn urgency_defaults_to_medium() {
        let (sessions, session) = setup().await;
        let tool = HumanHandoffTool::new(sessions.clone());

        tool.execute(&json!({"reason": "confused"}), &session)
            .await
            .unwrap();

        let updated = sessions.get(&session.session_id).await.unwrap().unwrap();
        assert_eq!(updated.metadata["handoff_urgency"], "medium");
    }

    #[tokio::test]
    async fn ticket_ids_are_unique() {
        let (sessions, session) = setup().await;
        let tool = HumanHandoffTool::new(sessions);

        let a = tool
            .execute(&json!({"reason": "r"}), &session)
            .await
            .unwrap();
        let b = tool
            .execute(&json!({"reason": "r"}), &session)
            .await
            .unwrap();
        assert_ne!(a["ticket_id"], b["ticket_id"]);
    }
}
