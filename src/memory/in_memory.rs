//! In-process store for tests and local runs.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{MemoryEvent, MemoryStore, SemanticRecord, SessionRef};

#[derive(Default)]
pub struct InMemoryStore {
    events: RwLock<Vec<MemoryEvent>>,
    profiles: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn put_profile(&self, actor_id: &str, profile: serde_json::Value) {
        self.profiles
            .write()
            .await
            .insert(actor_id.to_string(), profile);
    }

    #[cfg(test)]
    pub async fn events(&self) -> Vec<MemoryEvent> {
        self.events.read().await.clone()
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait::async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn list_events(
        &self,
        actor_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEvent>> {
        let events = self.events.read().await;
        let mut matching: Vec<MemoryEvent> = events
            .iter()
            .filter(|e| e.actor_id == actor_id && e.session_id == session_id)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.timestamp);
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.split_off(skip))
    }

    async fn list_sessions(&self, actor_id: &str, limit: usize) -> Result<Vec<SessionRef>> {
        let events = self.events.read().await;
        // session id -> (first seen, last seen)
        let mut spans: HashMap<&str, (DateTime<Utc>, DateTime<Utc>)> = HashMap::new();
        for e in events.iter().filter(|e| e.actor_id == actor_id) {
            spans
                .entry(e.session_id.as_str())
                .and_modify(|(first, last)| {
                    *first = (*first).min(e.timestamp);
                    *last = (*last).max(e.timestamp);
                })
                .or_insert((e.timestamp, e.timestamp));
        }
        let mut sessions: Vec<_> = spans.into_iter().collect();
        sessions.sort_by(|a, b| b.1.1.cmp(&a.1.1).then_with(|| a.0.cmp(&b.0)));
        Ok(sessions
            .into_iter()
            .take(limit)
            .map(|(id, (first, _))| SessionRef {
                session_id: id.to_string(),
                started_at: Some(first),
            })
            .collect())
    }

    async fn search(
        &self,
        actor_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SemanticRecord>> {
        let query_words = words(query);
        if query_words.is_empty() {
            return Ok(Vec::new());
        }
        let events = self.events.read().await;
        let mut records: Vec<SemanticRecord> = events
            .iter()
            .filter(|e| e.actor_id == actor_id)
            .filter_map(|e| {
                let text_words = words(&e.text);
                let hits = query_words.iter().filter(|w| text_words.contains(w)).count();
                (hits > 0).then(|| SemanticRecord {
                    text: e.text.clone(),
                    score: hits as f64 / query_words.len() as f64,
                })
            })
            .collect();
        records.sort_by(|a, b| b.score.total_cmp(&a.score));
        records.truncate(top_k);
        Ok(records)
    }

    async fn write_event(&self, event: MemoryEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn load_profile(&self, actor_id: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.profiles.read().await.get(actor_id).cloned())
    }
}
