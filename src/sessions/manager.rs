//! Session CRUD over the key-value store.

use anyhow::Result;
use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::traits::{Session, SessionPatch, SessionStatus};
use crate::error::ChatError;
use crate::store::KeyValueStore;

fn session_key(session_id: &str) -> String {
    format!("chat:session:{session_id}")
}

/// Creates, reads, and patches session records.
///
/// All writes are whole-record last-writer-wins; there is no optimistic
/// concurrency token. Stored records that fail to parse are treated as
/// absent, not as errors.
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Generate a session identifier unique with overwhelming probability.
    fn generate_session_id(user_id: &str) -> String {
        let suffix = rand::thread_rng().gen_range(0..1000);
        format!("chat-{user_id}-{}-{suffix}", Utc::now().timestamp_millis())
    }

    /// Create and persist a new session with status `active`.
    pub async fn create(
        &self,
        user_id: &str,
        initial_metadata: Option<HashMap<String, Value>>,
    ) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            session_id: Self::generate_session_id(user_id),
            user_id: user_id.to_string(),
            metadata: initial_metadata.unwrap_or_default(),
            status: SessionStatus::Active,
            human_agent_id: None,
            created_at: now,
            updated_at: now,
        };
        self.save(&session).await?;
        Ok(session)
    }

    /// Get a session by id. Absent keys and unparsable records both yield
    /// `None`.
    pub async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let Some(raw) = self.store.get(&session_key(session_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!("failed to parse session record {session_id}: {err}");
                Ok(None)
            }
        }
    }

    /// Apply a partial update and refresh `updated_at`.
    pub async fn update(
        &self,
        session_id: &str,
        patch: SessionPatch,
    ) -> crate::Result<Session> {
        let mut session = self
            .get(session_id)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;

        if let Some(status) = patch.status {
            session.status = status;
        }
        if let Some(agent) = patch.human_agent_id {
            session.human_agent_id = agent;
        }
        if let Some(metadata) = patch.metadata {
            session.metadata = metadata;
        }
        session.updated_at = Utc::now();

        self.save(&session).await?;
        Ok(session)
    }

    /// Merge entries into the session's metadata map, keeping other fields.
    pub async fn merge_metadata(
        &self,
        session_id: &str,
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> crate::Result<Session> {
        let session = self
            .get(session_id)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;

        let mut metadata = session.metadata;
        metadata.extend(entries);
        self.update(
            session_id,
            SessionPatch {
                metadata: Some(metadata),
                ..SessionPatch::default()
            },
        )
        .await
    }

    /// Refresh `updated_at` if the session exists; no-op otherwise.
    pub async fn touch(&self, session_id: &str) -> Result<()> {
        if let Some(mut session) = self.get(session_id).await? {
            session.updated_at = Utc::now();
            self.save(&session).await?;
        }
        Ok(())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)?;
        self.store.set(&session_key(&session.session_id), &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn create_then_get_returns_active_session() {
        let mgr = manager();
        let created = mgr.create("user-1", None).await.unwrap();

        let fetched = mgr.get(&created.session_id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "user-1");
        assert_eq!(fetched.status, SessionStatus::Active);
        assert!(fetched.human_agent_id.is_none());
    }

    #[tokio::test]
    async fn session_id_embeds_user_id() {
        let mgr = manager();
        let created = mgr.create("user-1", None).await.unwrap();
        assert!(created.session_id.starts_with("chat-user-1-"));
    }

    #[tokio::test]
    async fn get_missing_session_returns_none() {
        let mgr = manager();
        assert!(mgr.get("chat-nobody-0-0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_record_is_treated_as_missing() {
        let store = Arc::new(InMemoryStore::new());
        store.set("chat:session:s1", "not json").await.unwrap();
        let mgr = SessionManager::new(store);
        assert!(mgr.get("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_session_fails() {
        let mgr = manager();
        let err = mgr
            .update("absent", SessionPatch::status(SessionStatus::Ended))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn update_merges_fields_and_refreshes_timestamp() {
        let mgr = manager();
        let created = mgr.create("user-1", None).await.unwrap();

        let updated = mgr
            .update(
                &created.session_id,
                SessionPatch {
                    status: Some(SessionStatus::WithHuman),
                    human_agent_id: Some(Some("agent-7".into())),
                    metadata: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, SessionStatus::WithHuman);
        assert_eq!(updated.human_agent_id.as_deref(), Some("agent-7"));
        assert_eq!(updated.user_id, "user-1");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn patch_clears_agent_assignment() {
        let mgr = manager();
        let created = mgr.create("user-1", None).await.unwrap();
        mgr.update(
            &created.session_id,
            SessionPatch {
                human_agent_id: Some(Some("agent-7".into())),
                ..SessionPatch::default()
            },
        )
        .await
        .unwrap();

        let cleared = mgr
            .update(
                &created.session_id,
                SessionPatch {
                    human_agent_id: Some(None),
                    ..SessionPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.human_agent_id.is_none());
    }

    #[tokio::test]
    async fn merge_metadata_keeps_existing_entries() {
        let mgr = manager();
        let mut initial = HashMap::new();
        initial.insert("channel".to_string(), Value::from("web"));
        let created = mgr.create("user-1", Some(initial)).await.unwrap();

        let merged = mgr
            .merge_metadata(
                &created.session_id,
                [("handoff_reason".to_string(), Value::from("billing"))],
            )
            .await
            .unwrap();

        assert_eq!(merged.metadata["channel"], "web");
        assert_eq!(merged.metadata["handoff_reason"], "billing");
    }

    #[tokio::test]
    async fn touch_missing_session_is_a_noop() {
        let mgr = manager();
        mgr.touch("absent").await.unwrap();
        assert!(mgr.get("absent").await.unwrap().is_none());
    }
}
