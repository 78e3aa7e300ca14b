//! Conversation context storage
//!
//! Each session keeps the most recent self-assessment it submitted. Reads
//! never fail on a miss: an unknown session gets [`SelfAssessment::default`].

mod sqlite;

pub use sqlite::SqliteContextStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub const UNKNOWN_TOPIC: &str = "Unknown Topic";

/// A student's self-assessment on one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfAssessment {
    pub topic: String,
    pub facts: String,
    pub strategies: String,
    pub procedures: String,
    pub rationales: String,
}

impl Default for SelfAssessment {
    fn default() -> Self {
        Self {
            topic: UNKNOWN_TOPIC.to_string(),
            facts: String::new(),
            strategies: String::new(),
            procedures: String::new(),
            rationales: String::new(),
        }
    }
}

/// Opaque per-browser session key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept only well-formed UUIDs so arbitrary cookie values never
    /// become store keys.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(|id| Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored assessment and when it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContext {
    pub assessment: SelfAssessment,
    pub captured_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Context database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Context database lock poisoned")]
    Poisoned,
    #[error("Context store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Stored timestamp is invalid: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// Session-keyed storage of the latest self-assessment
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Replace whatever the session had stored
    async fn set_context(
        &self,
        session: &SessionId,
        assessment: SelfAssessment,
    ) -> Result<(), ContextError>;

    /// Stored entry for the session, if any
    async fn fetch_context(&self, session: &SessionId)
        -> Result<Option<StoredContext>, ContextError>;

    /// Forget the session
    async fn clear_context(&self, session: &SessionId) -> Result<(), ContextError>;

    /// Drop entries captured more than `ttl` ago, returning how many went
    async fn purge_expired(&self, ttl: chrono::Duration) -> Result<usize, ContextError>;

    /// The session's assessment, or the default record on a miss or failure
    async fn get_context(&self, session: &SessionId) -> SelfAssessment {
        match self.fetch_context(session).await {
            Ok(Some(stored)) => stored.assessment,
            Ok(None) => SelfAssessment::default(),
            Err(e) => {
                tracing::warn!(session = %session, error = %e, "Context read failed, using default");
                SelfAssessment::default()
            }
        }
    }
}

#[async_trait]
impl<T: ContextStore + ?Sized> ContextStore for Arc<T> {
    async fn set_context(
        &self,
        session: &SessionId,
        assessment: SelfAssessment,
    ) -> Result<(), ContextError> {
        (**self).set_context(session, assessment).await
    }

    async fn fetch_context(
        &self,
        session: &SessionId,
    ) -> Result<Option<StoredContext>, ContextError> {
        (**self).fetch_context(session).await
    }

    async fn clear_context(&self, session: &SessionId) -> Result<(), ContextError> {
        (**self).clear_context(session).await
    }

    async fn purge_expired(&self, ttl: chrono::Duration) -> Result<usize, ContextError> {
        (**self).purge_expired(ttl).await
    }

    async fn get_context(&self, session: &SessionId) -> SelfAssessment {
        (**self).get_context(session).await
    }
}

/// Oldest capture time that survives a purge with this `ttl`. `None` when
/// the cutoff falls outside the representable range, so nothing expires.
pub(crate) fn expiry_cutoff(ttl: chrono::Duration) -> Option<DateTime<Utc>> {
    Utc::now().checked_sub_signed(ttl)
}

/// Process-local store. Sessions are sharded, so writers to different
/// sessions do not block each other.
#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    entries: DashMap<SessionId, StoredContext>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn set_context(
        &self,
        session: &SessionId,
        assessment: SelfAssessment,
    ) -> Result<(), ContextError> {
        self.entries.insert(
            session.clone(),
            StoredContext {
                assessment,
                captured_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn fetch_context(
        &self,
        session: &SessionId,
    ) -> Result<Option<StoredContext>, ContextError> {
        Ok(self.entries.get(session).map(|entry| entry.value().clone()))
    }

    async fn clear_context(&self, session: &SessionId) -> Result<(), ContextError> {
        self.entries.remove(session);
        Ok(())
    }

    async fn purge_expired(&self, ttl: chrono::Duration) -> Result<usize, ContextError> {
        let Some(cutoff) = expiry_cutoff(ttl) else {
            return Ok(0);
        };
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.captured_at >= cutoff);
        Ok(before.saturating_sub(self.entries.len()))
    }
}
