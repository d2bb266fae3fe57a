//! In-memory tool registry and dispatch.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::schema::missing_required;
use super::traits::{Tool, ToolSpec};
use crate::error::ChatError;
use crate::sessions::Session;

/// Mapping from tool name to its handler, held for the process lifetime.
///
/// Registration is last-writer-wins: re-registering a name overwrites the
/// prior entry without error.
pub struct ToolRegistry {
    tools: Mutex<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        info!("Registered chat tool: {name}");
        self.tools.lock().insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.lock().get(name).cloned()
    }

    pub fn all(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.lock().values().cloned().collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.lock().values().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.lock().is_empty()
    }

    /// Dispatch a call to a registered tool.
    ///
    /// Fails with `ToolNotFound` for unregistered names. Declared required
    /// parameters are validated before invocation; the handler's own result
    /// or failure is propagated unchanged, with no retry or timeout layer.
    pub async fn execute(
        &self,
        session: &Session,
        name: &str,
        params: &Value,
    ) -> crate::Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| ChatError::ToolNotFound(name.to_string()))?;

        let missing = missing_required(&tool.parameters_schema(), params);
        if !missing.is_empty() {
            return Err(ChatError::Other(anyhow::anyhow!(
                "invalid parameters for tool {name}: missing required {}",
                missing.join(", ")
            )));
        }

        tool.execute(params, session).await.map_err(ChatError::Other)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    use crate::sessions::SessionStatus;

    fn test_session() -> Session {
        let now = Utc::now();
        Session {
            session_id: "s1".into(),
            user_id: "u1".into(),
            metadata: HashMap::new(),
            status: SessionStatus::Active,
            human_agent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    struct NamedTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "A test tool"
        }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"input": {"type": "string"}},
                "required": ["input"]
            })
        }
        async fn execute(&self, _params: &Value, _session: &Session) -> Result<Value> {
            Ok(json!({"reply": self.reply}))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _params: &Value, _session: &Session) -> Result<Value> {
            anyhow::bail!("upstream exploded")
        }
    }

    #[test]
    fn register_and_get() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool {
            name: "first",
            reply: "one",
        }));
        assert!(registry.get("first").is_some());
        assert!(registry.get("second").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reregistration_overwrites_by_name() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool {
            name: "dup",
            reply: "old",
        }));
        registry.register(Arc::new(NamedTool {
            name: "dup",
            reply: "new",
        }));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dup").unwrap().description(), "A test tool");
    }

    #[test]
    fn specs_cover_all_tools() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool {
            name: "a",
            reply: "x",
        }));
        registry.register(Arc::new(NamedTool {
            name: "b",
            reply: "y",
        }));
        let mut names: Vec<String> = registry.specs().into_iter().map(|s| s.name).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn execute_unknown_tool_fails() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute(&test_session(), "ghost", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn execute_validates_required_params() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool {
            name: "strict",
            reply: "ok",
        }));
        let err = registry
            .execute(&test_session(), "strict", &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing required input"));
    }

    #[tokio::test]
    async fn execute_returns_handler_result() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool {
            name: "strict",
            reply: "ok",
        }));
        let result = registry
            .execute(&test_session(), "strict", &json!({"input": "hi"}))
            .await
            .unwrap();
        assert_eq!(result["reply"], "ok");
    }

    #[tokio::test]
    async fn execute_propagates_handler_failure() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool));
        let err = registry
            .execute(&test_session(), "broken", &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("upstream exploded"));
    }
}
