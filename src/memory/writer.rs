use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::{MemoryEvent, MemoryStore, Role, truncate_chars};

/// Persists both halves of a completed turn.
///
/// The assistant event is stamped a fixed offset after the user event so
/// that stores ordering by timestamp always return the pair in order.
pub struct TurnWriter {
    store: Arc<dyn MemoryStore>,
    offset: Duration,
    max_chars: usize,
}

impl TurnWriter {
    pub fn new(store: Arc<dyn MemoryStore>, offset_ms: i64, max_chars: usize) -> Self {
        Self {
            store,
            offset: Duration::milliseconds(offset_ms.max(1)),
            max_chars,
        }
    }

    pub async fn record_turn(
        &self,
        actor_id: &str,
        session_id: &str,
        user_text: &str,
        assistant_text: &str,
        companion_name: Option<&str>,
    ) -> bool {
        self.record_turn_at(
            actor_id,
            session_id,
            user_text,
            assistant_text,
            companion_name,
            Utc::now(),
        )
        .await
    }

    /// Returns whether both events were stored. A failed user write skips
    /// the assistant write so the store never holds an orphan reply.
    pub async fn record_turn_at(
        &self,
        actor_id: &str,
        session_id: &str,
        user_text: &str,
        assistant_text: &str,
        companion_name: Option<&str>,
        at: DateTime<Utc>,
    ) -> bool {
        let user = MemoryEvent {
            actor_id: actor_id.to_string(),
            session_id: session_id.to_string(),
            timestamp: at,
            role: Role::User,
            text: truncate_chars(user_text, self.max_chars).to_string(),
        };
        if let Err(e) = self.store.write_event(user).await {
            tracing::warn!("Failed to store user turn for {actor_id}/{session_id}: {e:#}");
            return false;
        }

        let tagged = match companion_name {
            Some(name) => format!("[{name}]: {assistant_text}"),
            None => assistant_text.to_string(),
        };
        let assistant = MemoryEvent {
            actor_id: actor_id.to_string(),
            session_id: session_id.to_string(),
            timestamp: at + self.offset,
            role: Role::Assistant,
            text: truncate_chars(&tagged, self.max_chars).to_string(),
        };
        if let Err(e) = self.store.write_event(assistant).await {
            tracing::warn!("Failed to store assistant turn for {actor_id}/{session_id}: {e:#}");
            return false;
        }
        true
    }
}
