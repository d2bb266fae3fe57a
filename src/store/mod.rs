pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::KeyValueStore;

use std::path::Path;
use std::sync::Arc;

/// Factory: create the right store backend from config
pub fn create_store(backend: &str, workspace_dir: &Path) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match backend.trim().to_ascii_lowercase().as_str() {
        "sqlite" => Ok(Arc::new(SqliteStore::new(workspace_dir)?)),
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        "" => anyhow::bail!("store backend cannot be empty. Supported values: sqlite, memory"),
        other => anyhow::bail!("Unknown store backend '{other}'. Supported values: sqlite, memory"),
    }
}
