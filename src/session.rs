// 🗝️ Session Storage - SQLite-backed key/value strings per session id
//
// Server-side stand-in for browser session storage. Each store handle is
// scoped to one session id; the cart keeps its snapshot under CART_KEY.
// A session ends explicitly (end_session) or by going idle (prune_idle_sessions).

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::cart::CartStore;

/// Issue a fresh, unguessable session id
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// Fixed-width so stored timestamps compare correctly as text
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Remove every session whose last write is older than `idle_for`
pub fn prune_idle_sessions(conn: &Connection, idle_for: Duration) -> Result<usize> {
    prune_sessions_before(conn, Utc::now() - idle_for)
}

fn prune_sessions_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let removed = conn
        .execute(
            "DELETE FROM session_storage
             WHERE session_id IN (
                SELECT session_id FROM session_storage
                GROUP BY session_id
                HAVING MAX(updated_at) < ?1
             )",
            params![timestamp(cutoff)],
        )
        .context("Failed to prune idle sessions")?;

    if removed > 0 {
        info!(removed, "pruned idle session storage");
    }
    Ok(removed)
}

/// CartStore over the `session_storage` table
pub struct SqliteSessionStore<'conn> {
    conn: &'conn Connection,
    session_id: String,
}

impl<'conn> SqliteSessionStore<'conn> {
    pub fn new(conn: &'conn Connection, session_id: impl Into<String>) -> Self {
        SqliteSessionStore {
            conn,
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Drop every key stored for this session
    pub fn end_session(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM session_storage WHERE session_id = ?1",
                params![self.session_id],
            )
            .context("Failed to end session")?;

        Ok(removed)
    }
}

impl CartStore for SqliteSessionStore<'_> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM session_storage WHERE session_id = ?1 AND key = ?2",
                params![self.session_id, key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read session storage")?;

        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO session_storage (session_id, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(session_id, key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![self.session_id, key, value, timestamp(Utc::now())],
            )
            .context("Failed to write session storage")?;

        Ok(())
    }
}
