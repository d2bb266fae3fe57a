//! Completion provider traits and request/response types.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::memory::{FunctionCall, Message};
use crate::tools::ToolSpec;

/// One completion call: a transcript window plus the tools the model may
/// request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
}

/// The provider's answer: either plain text, or a structured tool call
/// (in which case `content` is typically absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub function_call: Option<FunctionCall>,
}

impl CompletionResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            function_call: None,
        }
    }

    pub fn tool_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            content: None,
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }
}

/// Model selection and sampling settings for a completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name override; the orchestrator's provider is used either way,
    /// this field is carried for host-engine bookkeeping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f64 {
    0.7
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: "gpt-4o-mini".to_string(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run one completion over the supplied transcript window.
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
        config: &ProviderConfig,
    ) -> Result<CompletionResponse>;

    /// The name of this provider.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_response_has_no_call() {
        let resp = CompletionResponse::text("hi");
        assert_eq!(resp.content.as_deref(), Some("hi"));
        assert!(resp.function_call.is_none());
    }

    #[test]
    fn tool_call_response_has_no_content() {
        let resp = CompletionResponse::tool_call("getWeather", r#"{"location":"Paris"}"#);
        assert!(resp.content.is_none());
        assert_eq!(resp.function_call.unwrap().name, "getWeather");
    }

    #[test]
    fn config_defaults_fill_in() {
        let config: ProviderConfig = serde_json::from_str(r#"{"model":"m1"}"#).unwrap();
        assert_eq!(config.model, "m1");
        assert_eq!(config.temperature, 0.7);
        assert!(config.max_tokens.is_none());
    }
}
