use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use super::{MemoryEvent, MemoryStore, truncate_chars};
use crate::config::RecallLimits;

/// Rendered in place of the memory block when no source produced anything.
pub const FIRST_CONVERSATION: &str = "[First conversation with this user]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    CurrentSession,
    RecentSessions,
    Semantic,
}

impl SectionKind {
    fn label(self) -> &'static str {
        match self {
            Self::CurrentSession => "current session",
            Self::RecentSessions => "recent sessions",
            Self::Semantic => "semantic recall",
        }
    }

    fn header(self) -> &'static str {
        match self {
            Self::CurrentSession => "[Current conversation]",
            Self::RecentSessions => "[Previous conversations]",
            Self::Semantic => "[Relevant past conversations]",
        }
    }

    fn footer(self) -> &'static str {
        match self {
            Self::CurrentSession => "[End of current conversation]",
            Self::RecentSessions => "[End of previous conversations]",
            Self::Semantic => "[End of relevant context]",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Self::CurrentSession | Self::RecentSessions => "\n",
            Self::Semantic => "\n---\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    pub entries: Vec<String>,
}

impl Section {
    /// `None` when there is nothing to show, so empty sources leave no header.
    fn new(kind: SectionKind, entries: Vec<String>) -> Option<Self> {
        (!entries.is_empty()).then_some(Self { kind, entries })
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}",
            self.kind.header(),
            self.entries.join(self.kind.separator()),
            self.kind.footer()
        )
    }
}

/// Request-scoped memory context. Sections always render in the order
/// current session, recent sessions, semantic recall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBlock {
    pub current_session: Option<Section>,
    pub recent_sessions: Option<Section>,
    pub semantic: Option<Section>,
}

impl ContextBlock {
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        [&self.current_session, &self.recent_sessions, &self.semantic]
            .into_iter()
            .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }

    pub fn has_history(&self) -> bool {
        self.current_session.is_some() || self.recent_sessions.is_some()
    }

    pub fn has_semantic(&self) -> bool {
        self.semantic.is_some()
    }
}

impl fmt::Display for ContextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str(FIRST_CONVERSATION);
        }
        for (i, section) in self.sections().enumerate() {
            if i > 0 {
                f.write_str("\n\n")?;
            }
            write!(f, "{section}")?;
        }
        Ok(())
    }
}

/// Pulls the three memory sources for one turn and bounds them.
pub struct MemoryRecall {
    store: Arc<dyn MemoryStore>,
    limits: RecallLimits,
}

impl MemoryRecall {
    pub fn new(store: Arc<dyn MemoryStore>, limits: RecallLimits) -> Self {
        Self { store, limits }
    }

    /// Never fails: a source that errors contributes nothing.
    pub async fn gather(&self, actor_id: &str, session_id: &str, user_text: &str) -> ContextBlock {
        let (current, recent, semantic) = tokio::join!(
            self.current_session(actor_id, session_id),
            self.recent_sessions(actor_id, session_id),
            self.semantic(actor_id, user_text),
        );

        let block = ContextBlock {
            current_session: Section::new(
                SectionKind::CurrentSession,
                recover(SectionKind::CurrentSession, current),
            ),
            recent_sessions: Section::new(
                SectionKind::RecentSessions,
                recover(SectionKind::RecentSessions, recent),
            ),
            semantic: Section::new(SectionKind::Semantic, recover(SectionKind::Semantic, semantic)),
        };
        tracing::debug!(
            "Memory for {actor_id}/{session_id}: current={} recent={} semantic={}",
            block.current_session.as_ref().map_or(0, |s| s.entries.len()),
            block.recent_sessions.as_ref().map_or(0, |s| s.entries.len()),
            block.semantic.as_ref().map_or(0, |s| s.entries.len()),
        );
        block
    }

    async fn current_session(&self, actor_id: &str, session_id: &str) -> Result<Vec<String>> {
        let events = self
            .store
            .list_events(actor_id, session_id, self.limits.current_session_limit)
            .await?;
        Ok(self.transcript_lines(&events).collect())
    }

    /// Sessions newest first, each one oldest event first. The current
    /// session is skipped since it already has its own section.
    async fn recent_sessions(&self, actor_id: &str, current_session: &str) -> Result<Vec<String>> {
        let sessions = self
            .store
            .list_sessions(actor_id, self.limits.recent_sessions_limit)
            .await?;

        let mut lines = Vec::new();
        for session in sessions
            .iter()
            .filter(|s| s.session_id != current_session)
            .take(self.limits.sessions_scanned)
        {
            if lines.len() >= self.limits.recent_line_limit {
                break;
            }
            let events = self
                .store
                .list_events(
                    actor_id,
                    &session.session_id,
                    self.limits.per_session_event_limit,
                )
                .await?;
            lines.extend(self.transcript_lines(&events));
        }
        lines.truncate(self.limits.recent_line_limit);
        Ok(lines)
    }

    /// Keeps the store's relevance ranking.
    async fn semantic(&self, actor_id: &str, user_text: &str) -> Result<Vec<String>> {
        if user_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records = self
            .store
            .search(actor_id, user_text, self.limits.semantic_top_k)
            .await?;
        Ok(records
            .iter()
            .map(|r| r.text.trim())
            .filter(|t| !t.is_empty())
            .map(|t| truncate_chars(t, self.limits.semantic_record_chars).to_string())
            .take(self.limits.semantic_max_records)
            .collect())
    }

    fn transcript_lines<'a>(
        &'a self,
        events: &'a [MemoryEvent],
    ) -> impl Iterator<Item = String> + 'a {
        events
            .iter()
            .filter(|e| !e.text.trim().is_empty())
            .map(|e| {
                format!(
                    "{}: {}",
                    e.role,
                    truncate_chars(e.text.trim(), self.limits.transcript_line_chars)
                )
            })
    }
}

fn recover(kind: SectionKind, result: Result<Vec<String>>) -> Vec<String> {
    result.unwrap_or_else(|e| {
        tracing::warn!("Memory source '{}' unavailable: {e:#}", kind.label());
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::in_memory::InMemoryStore;
    use crate::memory::{Role, SemanticRecord, SessionRef};
    use chrono::{DateTime, Duration, Utc};

    const ACTOR: &str = "user-1";
    const SESSION: &str = "session-conv-1";

    /// In-memory store with canned semantic results and switchable failures.
    #[derive(Default)]
    struct ScriptedStore {
        inner: InMemoryStore,
        records: Vec<SemanticRecord>,
        fail_events: bool,
        fail_sessions: bool,
        fail_search: bool,
    }

    #[async_trait::async_trait]
    impl MemoryStore for ScriptedStore {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn list_events(
            &self,
            actor_id: &str,
            session_id: &str,
            limit: usize,
        ) -> Result<Vec<MemoryEvent>> {
            if self.fail_events {
                anyhow::bail!("list_events timed out");
            }
            self.inner.list_events(actor_id, session_id, limit).await
        }

        async fn list_sessions(&self, actor_id: &str, limit: usize) -> Result<Vec<SessionRef>> {
            if self.fail_sessions {
                anyhow::bail!("list_sessions refused");
            }
            self.inner.list_sessions(actor_id, limit).await
        }

        async fn search(
            &self,
            _actor_id: &str,
            _query: &str,
            top_k: usize,
        ) -> Result<Vec<SemanticRecord>> {
            if self.fail_search {
                anyhow::bail!("semantic search timed out");
            }
            Ok(self.records.iter().take(top_k).cloned().collect())
        }

        async fn write_event(&self, event: MemoryEvent) -> Result<()> {
            self.inner.write_event(event).await
        }

        async fn load_profile(&self, _actor_id: &str) -> Result<Option<serde_json::Value>> {
            Ok(None)
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    async fn seed(store: &ScriptedStore, session: &str, start: i64, turns: &[(Role, &str)]) {
        for (i, (role, text)) in turns.iter().enumerate() {
            store
                .inner
                .write_event(MemoryEvent {
                    actor_id: ACTOR.into(),
                    session_id: session.into(),
                    timestamp: at(start + i as i64),
                    role: *role,
                    text: (*text).into(),
                })
                .await
                .unwrap();
        }
    }

    fn record(text: &str) -> SemanticRecord {
        SemanticRecord {
            text: text.into(),
            score: 0.5,
        }
    }

    async fn populated() -> ScriptedStore {
        let store = ScriptedStore {
            records: vec![record("Talked about forgiving a brother")],
            ..Default::default()
        };
        seed(
            &store,
            "session-old",
            0,
            &[(Role::User, "I lost my job"), (Role::Assistant, "I'm sorry to hear that")],
        )
        .await;
        seed(
            &store,
            SESSION,
            100,
            &[(Role::User, "Can we pray?"), (Role::Assistant, "Of course")],
        )
        .await;
        store
    }

    fn recall(store: ScriptedStore) -> MemoryRecall {
        MemoryRecall::new(Arc::new(store), RecallLimits::default())
    }

    #[tokio::test]
    async fn test_brand_new_actor_gets_marker() {
        let block = recall(ScriptedStore::default())
            .gather("new-user", SESSION, "Hello there")
            .await;
        assert!(block.is_empty());
        assert_eq!(block.to_string(), FIRST_CONVERSATION);
        assert!(!block.to_string().contains("[Current conversation]"));
    }

    #[tokio::test]
    async fn test_sections_render_in_fixed_order() {
        let block = recall(populated().await)
            .gather(ACTOR, SESSION, "forgiveness")
            .await;
        let text = block.to_string();
        let current = text.find("[Current conversation]").unwrap();
        let recent = text.find("[Previous conversations]").unwrap();
        let semantic = text.find("[Relevant past conversations]").unwrap();
        assert!(current < recent && recent < semantic);
        assert!(text.contains("USER: Can we pray?\nASSISTANT: Of course"));
        assert!(text.contains("USER: I lost my job"));
        assert!(!text.contains(FIRST_CONVERSATION));
    }

    #[tokio::test]
    async fn test_failing_semantic_source_is_dropped() {
        let mut store = populated().await;
        store.fail_search = true;
        let block = recall(store).gather(ACTOR, SESSION, "forgiveness").await;
        assert!(block.current_session.is_some());
        assert!(block.recent_sessions.is_some());
        assert!(block.semantic.is_none());
        assert!(!block.to_string().contains("[Relevant past conversations]"));
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_first_conversation() {
        let mut store = populated().await;
        store.fail_events = true;
        store.fail_sessions = true;
        store.fail_search = true;
        let block = recall(store).gather(ACTOR, SESSION, "forgiveness").await;
        assert_eq!(block.to_string(), FIRST_CONVERSATION);
    }

    #[tokio::test]
    async fn test_semantic_snippets_are_capped() {
        let long = "x".repeat(1000);
        let store = ScriptedStore {
            records: vec![
                record("   "),
                record(&long),
                record(&long),
                record(&long),
                record(&long),
            ],
            ..Default::default()
        };
        let block = recall(store).gather(ACTOR, SESSION, "anything").await;
        let semantic = block.semantic.unwrap();
        assert_eq!(semantic.entries.len(), 3);
        assert!(semantic.entries.iter().all(|e| e.chars().count() <= 300));
    }

    #[tokio::test]
    async fn test_semantic_keeps_store_ranking() {
        let store = ScriptedStore {
            records: vec![record("best"), record("second"), record("third"), record("fourth")],
            ..Default::default()
        };
        let block = recall(store).gather(ACTOR, SESSION, "query").await;
        assert_eq!(block.semantic.unwrap().entries, ["best", "second", "third"]);
    }

    #[tokio::test]
    async fn test_blank_message_skips_semantic_search() {
        let store = ScriptedStore {
            records: vec![record("would match")],
            ..Default::default()
        };
        let block = recall(store).gather(ACTOR, SESSION, "  ").await;
        assert!(block.semantic.is_none());
    }

    #[tokio::test]
    async fn test_current_session_bounded_to_latest() {
        let store = ScriptedStore::default();
        let turns: Vec<(Role, String)> = (0..40).map(|i| (Role::User, format!("msg {i}"))).collect();
        let borrowed: Vec<(Role, &str)> = turns.iter().map(|(r, t)| (*r, t.as_str())).collect();
        seed(&store, SESSION, 0, &borrowed).await;

        let block = recall(store).gather(ACTOR, SESSION, "").await;
        let entries = block.current_session.unwrap().entries;
        assert_eq!(entries.len(), 30);
        assert_eq!(entries.first().unwrap(), "USER: msg 10");
        assert_eq!(entries.last().unwrap(), "USER: msg 39");
    }

    #[tokio::test]
    async fn test_transcript_lines_truncated() {
        let store = ScriptedStore::default();
        let long = "é".repeat(500);
        seed(&store, SESSION, 0, &[(Role::Assistant, long.as_str()), (Role::User, "")]).await;
        let block = recall(store).gather(ACTOR, SESSION, "").await;
        let entries = block.current_session.unwrap().entries;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].chars().count(), "ASSISTANT: ".len() + 200);
    }

    #[tokio::test]
    async fn test_recent_sessions_order_and_cap() {
        let store = ScriptedStore::default();
        seed(&store, "s-oldest", 0, &[(Role::User, "oldest a"), (Role::User, "oldest b")]).await;
        let many: Vec<String> = (0..8).map(|i| format!("middle {i}")).collect();
        let many: Vec<(Role, &str)> = many.iter().map(|t| (Role::User, t.as_str())).collect();
        seed(&store, "s-middle", 100, &many).await;
        seed(&store, "s-newest", 200, &[(Role::User, "newest a"), (Role::Assistant, "newest b")])
            .await;
        seed(&store, SESSION, 300, &[(Role::User, "current")]).await;

        let block = recall(store).gather(ACTOR, SESSION, "").await;
        let entries = block.recent_sessions.unwrap().entries;
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0], "USER: newest a");
        assert_eq!(entries[1], "ASSISTANT: newest b");
        assert_eq!(entries[2], "USER: middle 0");
        assert_eq!(entries[9], "USER: middle 7");
        assert!(entries.iter().all(|e| !e.contains("current")));
    }
}
