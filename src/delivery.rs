use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

use crate::config::DeliveryConfig;

/// Outcome of one turn, posted back to the backend that sent the message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "eventType", rename_all = "snake_case")]
pub enum DeliveryPayload {
    AgentResponse(AgentResponse),
    ProcessingError(ProcessingError),
}

impl DeliveryPayload {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AgentResponse(_) => "agent_response",
            Self::ProcessingError(_) => "processing_error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub conversation_id: String,
    /// `ai-{inbound message id}`
    pub message_id: String,
    pub response_text: String,
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion: Option<CompanionSummary>,
    pub has_memory_context: bool,
    pub has_semantic_context: bool,
    pub memory_saved: bool,
    pub tokens_used: TokensUsed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionSummary {
    pub name: String,
    pub life_stage: &'static str,
    pub spiritual_stage: &'static str,
    pub spiritual_tier: u8,
}

/// Rough estimate, four characters per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokensUsed {
    pub input: usize,
    pub output: usize,
}

impl TokensUsed {
    pub fn estimate(prompt: &str, response: &str) -> Self {
        Self {
            input: prompt.chars().count() / 4,
            output: response.chars().count() / 4,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingError {
    pub conversation_id: String,
    pub message_id: String,
    pub error: String,
    pub error_kind: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, payload: &DeliveryPayload) -> Result<()>;
}

/// Posts payloads as JSON to the backend webhook.
pub struct WebhookSink {
    client: Client,
    url: String,
    secret: String,
}

impl WebhookSink {
    pub fn new(url: &str, secret: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            secret: secret.unwrap_or_default().to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ResultSink for WebhookSink {
    async fn deliver(&self, payload: &DeliveryPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("x-webhook-secret", &self.secret)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to post {} to webhook", payload.event_type()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Webhook rejected {} ({}): {}", payload.event_type(), status, body);
        }
        Ok(())
    }
}

/// `None` when no webhook is configured; every turn then fails as a
/// configuration defect.
pub fn create_sink(config: &DeliveryConfig) -> Result<Option<Arc<dyn ResultSink>>> {
    match config.webhook_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            let sink: Arc<dyn ResultSink> = Arc::new(WebhookSink::new(
                url,
                config.webhook_secret.as_deref(),
                config.timeout_secs,
            )?);
            Ok(Some(sink))
        }
        _ => {
            tracing::warn!("No delivery.webhook_url configured; turns will fail");
            Ok(None)
        }
    }
}
