//! Generic OpenAI-compatible provider.
//! Most hosted LLM APIs follow the same `/v1/chat/completions` format; this
//! single implementation works for all of them.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::traits::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderConfig};
use crate::memory::{FunctionCall, Message};
use crate::tools::ToolSpec;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// How the provider expects the API key to be sent.
#[derive(Debug, Clone)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key: <key>`
    XApiKey,
    /// Custom header name
    Custom(String),
}

/// A provider that speaks the OpenAI-compatible chat completions API.
pub struct OpenAiCompatibleProvider {
    pub(crate) name: String,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) auth_header: AuthStyle,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>, auth_style: AuthStyle) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToString::to_string),
            auth_header: auth_style,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn openai(api_key: Option<&str>, api_url: Option<&str>) -> Self {
        Self::new(
            "openai",
            api_url.unwrap_or(DEFAULT_BASE_URL),
            api_key,
            AuthStyle::Bearer,
        )
    }

    /// Build the full URL for chat completions, tolerating a base URL that
    /// already includes the endpoint path.
    fn chat_completions_url(&self) -> String {
        let has_full_endpoint = reqwest::Url::parse(&self.base_url)
            .map(|url| {
                url.path()
                    .trim_end_matches('/')
                    .ends_with("/chat/completions")
            })
            .unwrap_or_else(|_| {
                self.base_url
                    .trim_end_matches('/')
                    .ends_with("/chat/completions")
            });

        if has_full_endpoint {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    fn apply_auth_header(
        &self,
        req: reqwest::RequestBuilder,
        api_key: &str,
    ) -> reqwest::RequestBuilder {
        match &self.auth_header {
            AuthStyle::Bearer => req.header("Authorization", format!("Bearer {api_key}")),
            AuthStyle::XApiKey => req.header("x-api-key", api_key),
            AuthStyle::Custom(header) => req.header(header, api_key),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.to_string(),
            content: message.content.clone(),
            name: message.name.clone(),
        }
    }
}

fn tool_descriptor(spec: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": spec.parameters,
        }
    })
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    function: Option<WireFunction>,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Reduce a parsed API response to the first choice's content and tool call.
fn parse_response(response: ApiChatResponse, provider: &str) -> Result<CompletionResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No response from {provider}"))?;

    let function_call = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .find_map(|tc| {
            let function = tc.function?;
            Some(FunctionCall {
                name: function.name?,
                arguments: function.arguments.unwrap_or_else(|| "{}".to_string()),
            })
        });

    Ok(CompletionResponse {
        content: choice.message.content,
        function_call,
    })
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
        config: &ProviderConfig,
    ) -> Result<CompletionResponse> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "{} API key not set. Set it in config or the appropriate env var.",
                self.name
            )
        })?;

        let tools: Vec<Value> = request.tools.iter().map(tool_descriptor).collect();
        let body = ChatRequest {
            model: config.model.clone(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            tools: if tools.is_empty() { None } else { Some(tools) },
        };

        let response = self
            .apply_auth_header(self.client.post(self.chat_completions_url()).json(&body), api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::api_error(&self.name, response).await);
        }

        let parsed: ApiChatResponse = response.json().await?;
        parse_response(parsed, &self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_provider(name: &str, url: &str, key: Option<&str>) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(name, url, key, AuthStyle::Bearer)
    }

    #[test]
    fn creates_with_key() {
        let p = make_provider("openai", "https://api.openai.com/v1", Some("sk-key"));
        assert_eq!(p.name, "openai");
        assert_eq!(p.api_key.as_deref(), Some("sk-key"));
    }

    #[test]
    fn strips_trailing_slash() {
        let p = make_provider("test", "https://example.com/", None);
        assert_eq!(p.base_url, "https://example.com");
    }

    #[test]
    fn appends_chat_completions_path() {
        let p = make_provider("test", "https://example.com/v1", None);
        assert_eq!(
            p.chat_completions_url(),
            "https://example.com/v1/chat/completions"
        );
    }

    #[test]
    fn keeps_explicit_chat_completions_path() {
        let p = make_provider("test", "https://example.com/api/v3/chat/completions", None);
        assert_eq!(
            p.chat_completions_url(),
            "https://example.com/api/v3/chat/completions"
        );
    }

    #[tokio::test]
    async fn complete_fails_without_key() {
        let p = make_provider("openai", DEFAULT_BASE_URL, None);
        let request = CompletionRequest {
            messages: &[],
            tools: &[],
        };
        let err = p
            .complete(request, &ProviderConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key not set"));
    }

    #[test]
    fn request_serializes_messages_and_tools() {
        let spec = ToolSpec {
            name: "getWeather".into(),
            description: "Get current weather".into(),
            parameters: json!({"type": "object", "properties": {}}),
        };
        let body = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![WireMessage::from(&Message::user("hello"))],
            temperature: 0.7,
            max_tokens: None,
            tools: Some(vec![tool_descriptor(&spec)]),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("gpt-4o-mini"));
        assert!(json.contains(r#""role":"user""#));
        assert!(json.contains(r#""type":"function""#));
        assert!(json.contains("getWeather"));
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn wire_message_keeps_function_role_name() {
        let wire = WireMessage::from(&Message::function("getWeather", "{}"));
        assert_eq!(wire.role, "function");
        assert_eq!(wire.name.as_deref(), Some("getWeather"));
    }

    #[test]
    fn parses_text_response() {
        let json = r#"{"choices":[{"message":{"content":"Hello!"}}]}"#;
        let api: ApiChatResponse = serde_json::from_str(json).unwrap();
        let resp = parse_response(api, "test").unwrap();
        assert_eq!(resp.content.as_deref(), Some("Hello!"));
        assert!(resp.function_call.is_none());
    }

    #[test]
    fn parses_tool_call_response() {
        let json = r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"function":{"name":"getWeather","arguments":"{\"location\":\"Paris\"}"}}
        ]}}]}"#;
        let api: ApiChatResponse = serde_json::from_str(json).unwrap();
        let resp = parse_response(api, "test").unwrap();
        assert!(resp.content.is_none());
        let call = resp.function_call.unwrap();
        assert_eq!(call.name, "getWeather");
        assert!(call.arguments.contains("Paris"));
    }

    #[test]
    fn tool_call_without_arguments_defaults_to_empty_object() {
        let json = r#"{"choices":[{"message":{"tool_calls":[{"function":{"name":"ping"}}]}}]}"#;
        let api: ApiChatResponse = serde_json::from_str(json).unwrap();
        let resp = parse_response(api, "test").unwrap();
        assert_eq!(resp.function_call.unwrap().arguments, "{}");
    }

    #[test]
    fn empty_choices_errors() {
        let api: ApiChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(parse_response(api, "test").is_err());
    }
}
