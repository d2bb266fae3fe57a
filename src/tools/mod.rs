//! Tool subsystem for provider-callable capabilities.
//!
//! Each tool implements the [`Tool`] trait defined in [`traits`], which
//! requires a name, description, JSON parameter schema, and an async
//! `execute` method taking the parsed parameters and the owning session.
//!
//! Tools live in a [`ToolRegistry`]; [`default_registry`] seeds it with the
//! human-handoff tool the orchestrator relies on. Hosts register further
//! tools at runtime via [`ToolRegistry::register`].

pub mod handoff;
pub mod registry;
pub mod schema;
pub mod traits;

pub use handoff::{HumanHandoffTool, HANDOFF_TOOL_NAME};
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolSpec};

use crate::sessions::SessionManager;
use std::sync::Arc;

/// Create the default tool set.
pub fn default_tools(sessions: Arc<SessionManager>) -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(HumanHandoffTool::new(sessions))]
}

/// Create a registry seeded with the default tools.
pub fn default_registry(sessions: Arc<SessionManager>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    for tool in default_tools(sessions) {
        registry.register(tool);
    }
    registry
}
