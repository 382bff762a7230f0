use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::{MemoryEvent, MemoryStore, SemanticRecord, SessionRef};
use crate::config::MemoryConfig;

/// Client for a managed memory service exposing a JSON REST API.
///
/// Everything lives under `{base_url}/memories/{memory_id}`. Semantic
/// records are scoped by the namespace
/// `/strategies/{strategy}/actors/{actor}`.
///
/// Ids always travel as single percent-encoded path segments, so an id can
/// never address another actor's resources.
pub struct RemoteStore {
    client: Client,
    base_url: Url,
    memory_id: String,
    strategy_id: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<MemoryEvent>,
}

#[derive(Deserialize)]
struct SessionsResponse {
    #[serde(default)]
    sessions: Vec<SessionRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
    namespace: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    records: Vec<SemanticRecord>,
}

impl RemoteStore {
    pub fn new(config: &MemoryConfig) -> Result<Self> {
        if config.memory_id.trim().is_empty() {
            anyhow::bail!("memory.memory_id is required for the remote backend");
        }
        let base_url = Url::parse(config.base_url.trim())
            .with_context(|| format!("Invalid memory.base_url: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("memory.base_url must be an http(s) URL: {}", config.base_url);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build memory HTTP client")?;
        Ok(Self {
            client,
            base_url,
            memory_id: config.memory_id.clone(),
            strategy_id: config.semantic_strategy_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// `{base}/memories/{memory}/actors/{actor}/{tail...}`
    fn actor_url(&self, actor_id: &str, tail: &[&str]) -> Result<Url> {
        check_actor_id(actor_id)?;
        for segment in tail {
            check_segment(segment)?;
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("memory.base_url cannot carry a path"))?
            .pop_if_empty()
            .extend(["memories", self.memory_id.as_str(), "actors", actor_id])
            .extend(tail);
        Ok(url)
    }

    fn namespace(&self, actor_id: &str) -> Result<String> {
        check_actor_id(actor_id)?;
        Ok(format!("/strategies/{}/actors/{}", self.strategy_id, actor_id))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .with_context(|| format!("Memory request failed: {what}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Memory API error on {what} ({status}): {body}");
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse memory response: {what}"))
    }
}

/// Dot segments are dropped by URL normalization and would shift the path.
fn check_segment(segment: &str) -> Result<()> {
    if matches!(segment, "" | "." | "..") {
        anyhow::bail!("Invalid memory id segment: {segment:?}");
    }
    Ok(())
}

/// Actor ids also scope the semantic namespace, which is a plain path string.
fn check_actor_id(actor_id: &str) -> Result<()> {
    check_segment(actor_id)?;
    if actor_id.contains('/') {
        anyhow::bail!("Invalid actor id: {actor_id:?}");
    }
    Ok(())
}

#[async_trait::async_trait]
impl MemoryStore for RemoteStore {
    fn name(&self) -> &str {
        "remote"
    }

    async fn list_events(
        &self,
        actor_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEvent>> {
        let url = self.actor_url(actor_id, &["sessions", session_id, "events"])?;
        let body: EventsResponse = self
            .send_json(
                self.client.get(url).query(&[("limit", limit)]),
                "list_events",
            )
            .await?;
        let mut events = body.events;
        events.sort_by_key(|e| e.timestamp);
        let skip = events.len().saturating_sub(limit);
        Ok(events.split_off(skip))
    }

    async fn list_sessions(&self, actor_id: &str, limit: usize) -> Result<Vec<SessionRef>> {
        let url = self.actor_url(actor_id, &["sessions"])?;
        let body: SessionsResponse = self
            .send_json(
                self.client.get(url).query(&[("limit", limit)]),
                "list_sessions",
            )
            .await?;
        let mut sessions = body.sessions;
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn search(
        &self,
        actor_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SemanticRecord>> {
        let url = self.actor_url(actor_id, &["search"])?;
        let request = SearchRequest {
            query,
            top_k,
            namespace: self.namespace(actor_id)?,
        };
        let body: SearchResponse = self
            .send_json(self.client.post(url).json(&request), "search")
            .await?;
        let mut records = body.records;
        records.truncate(top_k);
        Ok(records)
    }

    async fn write_event(&self, event: MemoryEvent) -> Result<()> {
        let url = self.actor_url(
            &event.actor_id,
            &["sessions", event.session_id.as_str(), "events"],
        )?;
        let response = self
            .authorized(self.client.post(url).json(&event))
            .send()
            .await
            .context("Memory request failed: write_event")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Memory API error on write_event ({status}): {body}");
        }
        Ok(())
    }

    async fn load_profile(&self, actor_id: &str) -> Result<Option<serde_json::Value>> {
        let url = self.actor_url(actor_id, &["profile"])?;
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .context("Memory request failed: load_profile")?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let value: serde_json::Value = response
                    .json()
                    .await
                    .context("Failed to parse memory response: load_profile")?;
                Ok((!value.is_null()).then_some(value))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("Memory API error on load_profile ({status}): {body}");
            }
        }
    }
}
