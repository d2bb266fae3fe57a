//! SQLite-backed key-value store implementation.
//!
//! A single `kv` table holds all records. Expiry is stored as a unix
//! timestamp and enforced lazily on read, mirroring the in-memory backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

use super::traits::KeyValueStore;

const DB_FILE: &str = "relaydesk.db";

/// A durable store backed by a SQLite database in the workspace directory.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(workspace_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(workspace_dir).with_context(|| {
            format!("failed to create workspace dir {}", workspace_dir.display())
        })?;
        let path = workspace_dir.join(DB_FILE);
        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an ephemeral database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                expires_at INTEGER
            );",
        )?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let row: Option<(String, Option<i64>)> = conn
            .query_row(
                "SELECT value, expires_at FROM kv WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((_, Some(expires_at))) if expires_at <= Utc::now().timestamp() => {
                conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, NULL)
             ON CONFLICT(key) DO UPDATE SET value = ?2, expires_at = NULL",
            params![key, value],
        )?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let deadline = Utc::now().timestamp() + ttl.as_secs() as i64;
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE kv SET expires_at = ?2 WHERE key = ?1",
            params![key, deadline],
        )?;
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
