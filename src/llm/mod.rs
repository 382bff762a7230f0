pub mod anthropic;
pub mod openai_compatible;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::config::AgentConfig;

// --- Agent client trait ---

/// The hosted agent that answers one enriched prompt.
///
/// `session_id` is forwarded so the provider can keep per-conversation
/// state. Adapters return the complete response text.
#[async_trait::async_trait]
pub trait AgentClient: Send + Sync {
    async fn invoke(&self, session_id: &str, prompt: &str) -> Result<String>;
}

// --- Factory ---

pub fn create_client(config: &AgentConfig) -> Result<Arc<dyn AgentClient>> {
    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(anthropic::AnthropicClient::new(config)?)),
        provider => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(provider).to_string());
            Ok(Arc::new(openai_compatible::OpenAICompatibleClient::new(
                config, &base_url,
            )?))
        }
    }
}

fn http_client(config: &AgentConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to build agent HTTP client")
}

fn default_base_url(provider: &str) -> &str {
    match provider {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "google" => "https://generativelanguage.googleapis.com/v1beta/openai",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "ollama" => "http://localhost:11434/v1",
        _ => "https://api.openai.com/v1",
    }
}
