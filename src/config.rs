use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub agent: AgentConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,
    pub provider: String,
    /// Base URL for the API. Optional, each provider has a default.
    pub base_url: Option<String>,
    /// Model (or deployed agent) identifier. An empty value fails every turn.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_agent_timeout")]
    pub timeout_secs: u64,
}

fn default_agent_name() -> String {
    "companion".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_agent_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackendKind {
    #[default]
    Remote,
    InMemory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: MemoryBackendKind,
    #[serde(default = "default_memory_url")]
    pub base_url: String,
    #[serde(default)]
    pub memory_id: String,
    #[serde(default)]
    pub semantic_strategy_id: String,
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(flatten)]
    pub limits: RecallLimits,
    #[serde(default = "default_assistant_offset_ms")]
    pub assistant_offset_ms: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackendKind::default(),
            base_url: default_memory_url(),
            memory_id: String::new(),
            semantic_strategy_id: String::new(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
            limits: RecallLimits::default(),
            assistant_offset_ms: default_assistant_offset_ms(),
        }
    }
}

fn default_memory_url() -> String {
    "http://127.0.0.1:8700".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_assistant_offset_ms() -> i64 {
    1000
}

/// Size and count bounds applied while reading and writing memory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecallLimits {
    pub current_session_limit: usize,
    pub recent_sessions_limit: usize,
    pub sessions_scanned: usize,
    pub per_session_event_limit: usize,
    pub recent_line_limit: usize,
    pub semantic_top_k: usize,
    pub semantic_max_records: usize,
    pub semantic_record_chars: usize,
    pub transcript_line_chars: usize,
    pub stored_turn_chars: usize,
}

impl Default for RecallLimits {
    fn default() -> Self {
        Self {
            current_session_limit: 30,
            recent_sessions_limit: 5,
            sessions_scanned: 3,
            per_session_event_limit: 10,
            recent_line_limit: 10,
            semantic_top_k: 5,
            semantic_max_records: 3,
            semantic_record_chars: 300,
            transcript_line_chars: 200,
            stored_turn_chars: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    #[serde(default = "default_delivery_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_delivery_source")]
    pub source: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_secret: None,
            timeout_secs: default_delivery_timeout(),
            source: default_delivery_source(),
        }
    }
}

fn default_delivery_timeout() -> u64 {
    10
}

fn default_delivery_source() -> String {
    "companion-core".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_bind")]
    pub bind: String,
    pub api_key: Option<String>,
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    #[serde(default = "default_max_concurrent_turns")]
    pub max_concurrent_turns: usize,
    /// How long shutdown waits for queued and running turns.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_api_bind(),
            api_key: None,
            queue_size: default_queue_size(),
            max_concurrent_turns: default_max_concurrent_turns(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

fn default_api_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_queue_size() -> usize {
    256
}

fn default_max_concurrent_turns() -> usize {
    16
}

fn default_shutdown_timeout() -> u64 {
    30
}

pub fn load(path: &str) -> Result<Config> {
    let path = expand_tilde(path);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config.toml")?;
    if config.memory.assistant_offset_ms < 1 {
        anyhow::bail!(
            "memory.assistant_offset_ms must be at least 1 (got {})",
            config.memory.assistant_offset_ms
        );
    }
    Ok(config)
}

pub async fn init_config(path: &str) -> Result<PathBuf> {
    let path = expand_tilde(path);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if !path.exists() {
        tokio::fs::write(&path, DEFAULT_CONFIG)
            .await
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
    }
    Ok(path)
}

const DEFAULT_CONFIG: &str = r#"[agent]
name = "companion"
provider = "anthropic"
# base_url = "https://api.anthropic.com"  # optional, uses provider default
model = "claude-sonnet-4-5-20250929"
api_key = "YOUR_API_KEY"
max_tokens = 8192
timeout_secs = 60

# Any OpenAI-compatible provider works too:
# provider = "openai"
# model = "gpt-4o"

[memory]
backend = "remote"          # or "in_memory" for local experiments
base_url = "http://127.0.0.1:8700"
memory_id = "companion-memory"
semantic_strategy_id = "semantic"
request_timeout_secs = 10
current_session_limit = 30
recent_sessions_limit = 5
sessions_scanned = 3
per_session_event_limit = 10
recent_line_limit = 10
semantic_top_k = 5
semantic_max_records = 3
semantic_record_chars = 300
transcript_line_chars = 200
stored_turn_chars = 5000
assistant_offset_ms = 1000

[delivery]
# webhook_url = "https://backend.example.com/webhooks/agent"
# webhook_secret = "shared-secret"
timeout_secs = 10

[api]
bind = "127.0.0.1:3000"
# api_key = "required when binding beyond localhost"
queue_size = 256
max_concurrent_turns = 16
shutdown_timeout_secs = 30
"#;

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
