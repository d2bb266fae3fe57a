//! AI-facing message turns.

use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use super::{Handoff, SendOutcome};
use crate::error::ChatError;
use crate::memory::{Message, MessageStore};
use crate::providers::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderConfig};
use crate::sessions::{Session, SessionManager, SessionPatch, SessionStatus};
use crate::tools::{Tool, ToolRegistry, ToolSpec, HANDOFF_TOOL_NAME};

/// Transcript window handed to the provider on each turn.
const RECENT_WINDOW: usize = 20;

/// Session metadata key naming the tool subset enabled for the session.
const ENABLED_TOOLS_KEY: &str = "enabled_tools";

const APOLOGY_TEXT: &str =
    "I'm sorry, I encountered an error processing your message. Please try again.";
const QUEUE_WAIT_TEXT: &str =
    "You're still in the queue waiting for a human agent. We appreciate your patience.";
const HUMAN_ACK_TEXT: &str =
    "I've received your message and am reviewing your situation. I'll respond shortly.";

/// The conversation state machine.
///
/// All collaborators are injected explicitly; there is no process-wide
/// singleton. One orchestrator serves any number of sessions.
pub struct Orchestrator {
    pub(super) sessions: Arc<SessionManager>,
    pub(super) memory: Arc<MessageStore>,
    tools: Arc<ToolRegistry>,
    provider: Arc<dyn CompletionProvider>,
}

impl Orchestrator {
    pub fn new(
        sessions: Arc<SessionManager>,
        memory: Arc<MessageStore>,
        tools: Arc<ToolRegistry>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            sessions,
            memory,
            tools,
            provider,
        }
    }

    /// Create a new session, optionally seeding the transcript with a
    /// system message.
    pub async fn create_session(
        &self,
        user_id: &str,
        initial_metadata: Option<HashMap<String, Value>>,
        initial_system_message: Option<&str>,
    ) -> crate::Result<String> {
        let session = self.sessions.create(user_id, initial_metadata).await?;
        if let Some(text) = initial_system_message {
            self.memory
                .append(&session.session_id, Message::system(text))
                .await?;
        }
        Ok(session.session_id)
    }

    /// Run one message turn.
    ///
    /// Sessions queued for or held by a human agent never reach the
    /// completion provider. Provider and tool failures are absorbed into a
    /// degraded apology response; only structural misuse is raised.
    pub async fn send_message(
        &self,
        session_id: &str,
        text: &str,
        config: &ProviderConfig,
    ) -> crate::Result<SendOutcome> {
        let session = self.load_session(session_id).await?;

        match session.status {
            SessionStatus::WithHuman | SessionStatus::WaitingForHuman => {
                return self.route_to_human(&session, text).await.map_err(Into::into);
            }
            SessionStatus::Ended => {
                return Err(ChatError::InvalidState {
                    session_id: session_id.to_string(),
                    expected: "active",
                    actual: session.status,
                });
            }
            SessionStatus::Active => {}
        }

        self.memory
            .append(
                session_id,
                Message::user(text).with_user_id(&session.user_id),
            )
            .await?;

        let recent = self.memory.get_recent(session_id, RECENT_WINDOW).await?;
        let tools = self.enabled_tools(&session);
        let specs: Vec<ToolSpec> = tools.iter().map(|t| t.spec()).collect();

        let request = CompletionRequest {
            messages: &recent,
            tools: &specs,
        };
        let turn = match self.provider.complete(request, config).await {
            Ok(response) => self.apply_provider_response(&session, response).await,
            Err(err) => Err(err),
        };

        match turn {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!("provider turn failed for {session_id}: {err:#}");
                let apology = Message::assistant(APOLOGY_TEXT).with_error(format!("{err:#}"));
                self.memory.append(session_id, apology.clone()).await?;
                Ok(SendOutcome {
                    response: apology,
                    handoff: None,
                })
            }
        }
    }

    /// Act on the provider's answer: plain text is appended and returned;
    /// a tool call is dispatched, recorded as a `function`-role message,
    /// and either converted into a handoff or answered with a synthesized
    /// follow-up (single-shot; the result does not loop back through the
    /// provider).
    async fn apply_provider_response(
        &self,
        session: &Session,
        response: CompletionResponse,
    ) -> Result<SendOutcome> {
        let Some(call) = response.function_call else {
            let assistant = Message::assistant(response.content.unwrap_or_default());
            self.memory
                .append(&session.session_id, assistant.clone())
                .await?;
            return Ok(SendOutcome {
                response: assistant,
                handoff: None,
            });
        };

        let params: Value = serde_json::from_str(&call.arguments)?;
        let result = self
            .tools
            .execute(session, &call.name, &params)
            .await
            .map_err(anyhow::Error::new)?;

        self.memory
            .append(
                &session.session_id,
                Message::function(&call.name, serde_json::to_string(&result)?),
            )
            .await?;

        if call.name == HANDOFF_TOOL_NAME && result["status"] == "queued" {
            let reason = params
                .get("reason")
                .and_then(Value::as_str)
                .map(ToString::to_string);

            self.sessions
                .update(
                    &session.session_id,
                    SessionPatch::status(SessionStatus::WaitingForHuman),
                )
                .await
                .map_err(anyhow::Error::new)?;
            info!(
                "session {} queued for human handoff: {}",
                session.session_id,
                reason.as_deref().unwrap_or("unspecified")
            );

            let text = result["message"]
                .as_str()
                .unwrap_or(crate::tools::handoff::HANDOFF_MESSAGE);
            let assistant = Message::assistant(text);
            self.memory
                .append(&session.session_id, assistant.clone())
                .await?;
            return Ok(SendOutcome {
                response: assistant,
                handoff: Some(Handoff {
                    requested: true,
                    reason,
                }),
            });
        }

        let summary = result
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or_else(|| result.to_string());
        let follow_up = Message::assistant(format!("I've processed your request. {summary}"));
        self.memory
            .append(&session.session_id, follow_up.clone())
            .await?;
        Ok(SendOutcome {
            response: follow_up,
            handoff: None,
        })
    }

    /// Reply path for sessions queued for or held by a human agent.
    async fn route_to_human(&self, session: &Session, text: &str) -> Result<SendOutcome> {
        self.memory
            .append(
                &session.session_id,
                Message::user(text).with_user_id(&session.user_id),
            )
            .await?;

        if session.status == SessionStatus::WaitingForHuman {
            let waiting = Message::assistant(QUEUE_WAIT_TEXT);
            self.memory
                .append(&session.session_id, waiting.clone())
                .await?;
            let reason = session
                .metadata
                .get("handoff_reason")
                .and_then(Value::as_str)
                .map(ToString::to_string);
            return Ok(SendOutcome {
                response: waiting,
                handoff: Some(Handoff {
                    requested: true,
                    reason,
                }),
            });
        }

        let agent_id = session.human_agent_id.clone().unwrap_or_default();
        let ack = Message::human_agent(HUMAN_ACK_TEXT, "Agent", agent_id);
        self.memory.append(&session.session_id, ack.clone()).await?;
        Ok(SendOutcome {
            response: ack,
            handoff: None,
        })
    }

    /// Tools enabled for a session: the subset named by the
    /// `enabled_tools` metadata key, or every registered tool.
    pub fn enabled_tools(&self, session: &Session) -> Vec<Arc<dyn Tool>> {
        let Some(names) = session
            .metadata
            .get(ENABLED_TOOLS_KEY)
            .and_then(Value::as_array)
        else {
            return self.tools.all();
        };

        names
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|name| self.tools.get(name))
            .collect()
    }

    /// Dispatch a tool by name on behalf of a session.
    pub async fn execute_tool(
        &self,
        session_id: &str,
        tool_name: &str,
        params: &Value,
    ) -> crate::Result<Value> {
        let session = self.load_session(session_id).await?;
        self.tools.execute(&session, tool_name, params).await
    }

    pub fn register_tool(&self, tool: Arc<dyn Tool>) {
        self.tools.register(tool);
    }

    pub fn tools(&self) -> Vec<ToolSpec> {
        self.tools.specs()
    }

    // ── transcript and session delegations ──

    pub async fn messages(&self, session_id: &str) -> crate::Result<Vec<Message>> {
        Ok(self.memory.get_all(session_id).await?)
    }

    pub async fn recent_messages(
        &self,
        session_id: &str,
        count: usize,
    ) -> crate::Result<Vec<Message>> {
        Ok(self.memory.get_recent(session_id, count).await?)
    }

    pub async fn relevant_messages(
        &self,
        session_id: &str,
        query: &str,
        count: usize,
    ) -> crate::Result<Vec<Message>> {
        Ok(self.memory.get_relevant(session_id, query, count).await?)
    }

    pub async fn session(&self, session_id: &str) -> crate::Result<Option<Session>> {
        Ok(self.sessions.get(session_id).await?)
    }

    pub async fn update_session(
        &self,
        session_id: &str,
        patch: SessionPatch,
    ) -> crate::Result<Session> {
        self.sessions.update(session_id, patch).await
    }

    pub(super) async fn load_session(&self, session_id: &str) -> crate::Result<Session> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }
}
