//! Transcript message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Function,
    HumanAgent,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Function => "function",
            Role::HumanAgent => "human_agent",
        };
        f.write_str(s)
    }
}

/// A structured tool-invocation request attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, exactly as the provider produced them.
    pub arguments: String,
}

/// Per-message metadata. Every field is optional; absent fields are not
/// serialized, so stored transcripts stay compact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One turn in a session transcript. Append-only: the retention policy may
/// replace the whole list with a shorter derived one, but never edits an
/// individual message in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    /// Nullable: a structured tool call may substitute for content.
    pub content: Option<String>,
    /// Tool or agent display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            function_call: None,
            metadata: MessageMetadata::default(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// A `function`-role message carrying a serialized tool result.
    pub fn function(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut message = Self::new(Role::Function, content);
        message.name = Some(tool_name.into());
        message
    }

    pub fn human_agent(
        content: impl Into<String>,
        agent_name: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        let mut message = Self::new(Role::HumanAgent, content);
        message.name = Some(agent_name.into());
        message.metadata.agent_id = Some(agent_id.into());
        message
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.metadata.user_id = Some(user_id.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.metadata.error = Some(error.into());
        self
    }

    /// Content as a &str, empty when the message has none.
    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}
