//! Offline completion provider.
//!
//! No network, no key: answers deterministically from the latest user
//! message. Requests a human handoff when the message matches one of the
//! escalation keywords and the handoff tool is offered; otherwise replies
//! with a short acknowledgement. Used by the CLI demo and by tests.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::traits::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderConfig};
use crate::memory::Role;
use crate::tools::HANDOFF_TOOL_NAME;

/// Phrases in a user message that trigger an escalation to a human agent.
const HANDOFF_KEYWORDS: [&str; 8] = [
    "speak to human",
    "speak to a human",
    "talk to agent",
    "talk to a human",
    "human agent",
    "real person",
    "customer service",
    "representative",
];

const SNIPPET_CHARS: usize = 30;

pub struct OfflineProvider;

impl OfflineProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn wants_handoff(text: &str) -> bool {
    let lowered = text.to_lowercase();
    HANDOFF_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

fn snippet(text: &str) -> String {
    let truncated: String = text.chars().take(SNIPPET_CHARS).collect();
    if truncated.len() < text.len() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

#[async_trait]
impl CompletionProvider for OfflineProvider {
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
        _config: &ProviderConfig,
    ) -> Result<CompletionResponse> {
        let latest = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content_str().to_string())
            .unwrap_or_default();

        let handoff_offered = request.tools.iter().any(|t| t.name == HANDOFF_TOOL_NAME);
        if handoff_offered && wants_handoff(&latest) {
            let arguments = json!({
                "reason": "Customer explicitly requested human assistance",
                "urgency": "medium",
            });
            return Ok(CompletionResponse::tool_call(
                HANDOFF_TOOL_NAME,
                arguments.to_string(),
            ));
        }

        Ok(CompletionResponse::text(format!(
            "I understand your message about \"{}\". How else can I help you?",
            snippet(&latest)
        )))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Message;
    use crate::tools::ToolSpec;

    fn handoff_spec() -> ToolSpec {
        ToolSpec {
            name: HANDOFF_TOOL_NAME.into(),
            description: "Transfer to a human".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    #[tokio::test]
    async fn escalation_keyword_triggers_handoff_call() {
        let provider = OfflineProvider::new();
        let messages = [Message::user("I need to speak to a human agent now")];
        let tools = [handoff_spec()];
        let resp = provider
            .complete(
                CompletionRequest {
                    messages: &messages,
                    tools: &tools,
                },
                &ProviderConfig::default(),
            )
            .await
            .unwrap();

        assert!(resp.content.is_none());
        let call = resp.function_call.unwrap();
        assert_eq!(call.name, HANDOFF_TOOL_NAME);
        assert!(call.arguments.contains("requested human assistance"));
    }

    #[tokio::test]
    async fn no_handoff_without_the_tool_offered() {
        let provider = OfflineProvider::new();
        let messages = [Message::user("give me a real person")];
        let resp = provider
            .complete(
                CompletionRequest {
                    messages: &messages,
                    tools: &[],
                },
                &ProviderConfig::default(),
            )
            .await
            .unwrap();
        assert!(resp.function_call.is_none());
        assert!(resp.content.is_some());
    }

    #[tokio::test]
    async fn plain_message_gets_acknowledgement() {
        let provider = OfflineProvider::new();
        let messages = [Message::user("what are your opening hours?")];
        let tools = [handoff_spec()];
        let resp = provider
            .complete(
                CompletionRequest {
                    messages: &messages,
                    tools: &tools,
                },
                &ProviderConfig::default(),
            )
            .await
            .unwrap();
        let content = resp.content.unwrap();
        assert!(content.contains("what are your opening hours?"));
        assert!(resp.function_call.is_none());
    }

    #[tokio::test]
    async fn long_message_is_snipped() {
        let provider = OfflineProvider::new();
        let long = "a".repeat(100);
        let messages = [Message::user(long)];
        let resp = provider
            .complete(
                CompletionRequest {
                    messages: &messages,
                    tools: &[],
                },
                &ProviderConfig::default(),
            )
            .await
            .unwrap();
        assert!(resp.content.unwrap().contains("..."));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        assert!(wants_handoff("CUSTOMER SERVICE please"));
        assert!(!wants_handoff("how is the weather"));
    }
}
