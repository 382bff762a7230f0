pub mod in_memory;
pub mod recall;
pub mod remote;
pub mod writer;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{MemoryBackendKind, MemoryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
        })
    }
}

/// One stored conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEvent {
    pub actor_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub session_id: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticRecord {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub score: f64,
}

/// Interface to the external memory store.
///
/// Implementations own their transport and timeouts; callers treat every
/// read as fallible and degrade to "no memory" on error.
#[async_trait::async_trait]
pub trait MemoryStore: Send + Sync {
    fn name(&self) -> &str;

    /// Most recent `limit` events of one session, oldest first.
    async fn list_events(
        &self,
        actor_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEvent>>;

    /// Most recent sessions of an actor, newest first.
    async fn list_sessions(&self, actor_id: &str, limit: usize) -> Result<Vec<SessionRef>>;

    /// Records ranked by relevance to `query`, best first.
    async fn search(
        &self,
        actor_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SemanticRecord>>;

    async fn write_event(&self, event: MemoryEvent) -> Result<()>;

    /// Stored profile record for an actor, if any.
    async fn load_profile(&self, actor_id: &str) -> Result<Option<serde_json::Value>>;
}

pub fn create_store(config: &MemoryConfig) -> Result<Arc<dyn MemoryStore>> {
    match config.backend {
        MemoryBackendKind::Remote => Ok(Arc::new(remote::RemoteStore::new(config)?)),
        MemoryBackendKind::InMemory => {
            tracing::warn!("Using in-process memory store; turns will not survive a restart");
            Ok(Arc::new(in_memory::InMemoryStore::new()))
        }
    }
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
