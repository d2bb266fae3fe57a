//! Tool trait and descriptor types.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sessions::Session;

/// A capability the completion provider may request be invoked
/// mid-conversation.
///
/// `parameters_schema` is a JSON-schema-like object with `type`,
/// `properties`, and an optional `required` subset; the registry validates
/// required parameters before dispatch.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name, as offered to the provider.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Invoke the tool against a session. The result is an arbitrary JSON
    /// value; failures propagate unchanged to the dispatcher.
    async fn execute(&self, params: &Value, session: &Session) -> Result<Value>;

    /// Descriptor handed to the completion provider.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Serializable tool descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}
