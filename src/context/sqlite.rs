//! SQLite-backed context store, so sessions survive a restart

use super::{expiry_cutoff, ContextError, ContextStore, SelfAssessment, SessionId, StoredContext};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS session_contexts (
    session_id TEXT PRIMARY KEY,
    topic TEXT NOT NULL,
    facts TEXT NOT NULL,
    strategies TEXT NOT NULL,
    procedures TEXT NOT NULL,
    rationales TEXT NOT NULL,
    captured_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_session_contexts_captured_at
    ON session_contexts(captured_at);
";

/// Thread-safe handle; every query runs on the blocking pool.
///
/// Writes share one connection. Reads against a file database open their
/// own read-only connection, so under WAL they never wait on the writer.
#[derive(Clone)]
pub struct SqliteContextStore {
    writer: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteContextStore {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContextError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "Session database opened");
        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, ContextError> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, ContextError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            writer: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T, ContextError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, ContextError> + Send + 'static,
    {
        let conn = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| ContextError::Poisoned)?;
            op(&guard)
        })
        .await?
    }

    /// Like [`Self::run`], on a fresh read-only connection. An in-memory
    /// database exists only inside the writer, so it reads through that.
    async fn read<T, F>(&self, op: F) -> Result<T, ContextError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, ContextError> + Send + 'static,
    {
        let Some(path) = self.path.clone() else {
            return self.run(op).await;
        };
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            op(&conn)
        })
        .await?
    }
}

/// Fixed-width UTC timestamps so text comparison orders them correctly.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl ContextStore for SqliteContextStore {
    async fn set_context(
        &self,
        session: &SessionId,
        assessment: SelfAssessment,
    ) -> Result<(), ContextError> {
        let id = session.as_str().to_string();
        let now = timestamp(Utc::now());
        self.run(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_contexts
                    (session_id, topic, facts, strategies, procedures, rationales, captured_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    assessment.topic,
                    assessment.facts,
                    assessment.strategies,
                    assessment.procedures,
                    assessment.rationales,
                    now
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn fetch_context(
        &self,
        session: &SessionId,
    ) -> Result<Option<StoredContext>, ContextError> {
        let id = session.as_str().to_string();
        let row = self
            .read(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT topic, facts, strategies, procedures, rationales, captured_at
                         FROM session_contexts WHERE session_id = ?1",
                        params![id],
                        |row| {
                            Ok((
                                SelfAssessment {
                                    topic: row.get(0)?,
                                    facts: row.get(1)?,
                                    strategies: row.get(2)?,
                                    procedures: row.get(3)?,
                                    rationales: row.get(4)?,
                                },
                                row.get::<_, String>(5)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        let Some((assessment, captured_at)) = row else {
            return Ok(None);
        };
        let captured_at = DateTime::parse_from_rfc3339(&captured_at)?.with_timezone(&Utc);
        Ok(Some(StoredContext {
            assessment,
            captured_at,
        }))
    }

    async fn clear_context(&self, session: &SessionId) -> Result<(), ContextError> {
        let id = session.as_str().to_string();
        self.run(move |conn| {
            conn.execute(
                "DELETE FROM session_contexts WHERE session_id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
    }

    async fn purge_expired(&self, ttl: chrono::Duration) -> Result<usize, ContextError> {
        let Some(cutoff) = expiry_cutoff(ttl) else {
            return Ok(0);
        };
        let cutoff = timestamp(cutoff);
        self.run(move |conn| {
            let removed = conn.execute(
                "DELETE FROM session_contexts WHERE captured_at < ?1",
                params![cutoff],
            )?;
            Ok(removed)
        })
        .await
    }
}
