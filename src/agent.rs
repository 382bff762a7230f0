use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::bus::{InboundMessage, MessageBus};
use crate::config::Config;
use crate::context::{ContextBuilder, PersonalityContext};
use crate::delivery::{
    AgentResponse, CompanionSummary, DeliveryPayload, ProcessingError, ResultSink, TokensUsed,
};
use crate::error::TurnError;
use crate::llm::AgentClient;
use crate::memory::MemoryStore;
use crate::memory::recall::MemoryRecall;
use crate::memory::writer::TurnWriter;
use crate::profile::UserProfile;

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!("Turn task aborted: {e}");
    }
}

/// Stable across every turn of one conversation.
pub fn session_id_for(conversation_id: &str) -> String {
    format!("session-{conversation_id}")
}

/// Runs one inbound message through profile, memory, agent, write-back
/// and delivery. Holds no per-turn state, so turns run concurrently.
pub struct TurnProcessor {
    agent: Arc<dyn AgentClient>,
    store: Arc<dyn MemoryStore>,
    recall: MemoryRecall,
    writer: TurnWriter,
    sink: Option<Arc<dyn ResultSink>>,
    model: String,
    source: String,
}

impl TurnProcessor {
    pub fn new(
        config: &Config,
        agent: Arc<dyn AgentClient>,
        store: Arc<dyn MemoryStore>,
        sink: Option<Arc<dyn ResultSink>>,
    ) -> Self {
        let limits = config.memory.limits.clone();
        Self {
            writer: TurnWriter::new(
                store.clone(),
                config.memory.assistant_offset_ms,
                limits.stored_turn_chars,
            ),
            recall: MemoryRecall::new(store.clone(), limits),
            agent,
            store,
            sink,
            model: config.agent.model.clone(),
            source: config.delivery.source.clone(),
        }
    }

    /// Drain the bus with at most `max_in_flight` turns running at once.
    ///
    /// Returns after the bus is closed, its queue is empty and every started
    /// turn has finished.
    pub async fn run(self: Arc<Self>, bus: Arc<MessageBus>, max_in_flight: usize) {
        let slots = Arc::new(Semaphore::new(max_in_flight.max(1)));
        let mut turns = JoinSet::new();
        loop {
            // Waiting for a slot before receiving leaves excess messages
            // in the bounded queue.
            let Ok(permit) = slots.clone().acquire_owned().await else {
                break;
            };
            let Some(msg) = bus.recv_inbound().await else {
                break;
            };
            while let Some(finished) = turns.try_join_next() {
                log_join(finished);
            }
            let processor = self.clone();
            turns.spawn(async move {
                let _permit = permit;
                let _ = processor.handle(msg).await;
            });
        }
        tracing::info!("Inbound bus closed, waiting for {} turn(s)", turns.len());
        while let Some(finished) = turns.join_next().await {
            log_join(finished);
        }
        tracing::info!("Worker stopped");
    }

    /// Process a message and, on failure, report it to the backend.
    pub async fn handle(&self, msg: InboundMessage) -> Result<AgentResponse, TurnError> {
        match self.process(&msg).await {
            Ok(response) => {
                tracing::info!(
                    "Response delivered for message {} ({}ms)",
                    msg.message_id,
                    response.processing_time_ms
                );
                Ok(response)
            }
            Err(e) => {
                tracing::error!(
                    "Message {} failed [{}]: {e}",
                    msg.message_id,
                    e.kind()
                );
                self.report_failure(&msg, &e).await;
                Err(e)
            }
        }
    }

    pub async fn process(&self, msg: &InboundMessage) -> Result<AgentResponse, TurnError> {
        let started = Instant::now();

        if self.model.trim().is_empty() {
            return Err(TurnError::MissingAgentIdentity);
        }
        let sink = self.sink.as_ref().ok_or(TurnError::MissingDeliveryTarget)?;

        let session_id = session_id_for(&msg.conversation_id);
        tracing::info!(
            "Processing message {} for user {} ({session_id})",
            msg.message_id,
            msg.user_id
        );

        let profile = self.resolve_profile(msg).await;
        let personality = profile.as_ref().map(PersonalityContext::compile);
        if let Some(p) = &personality {
            tracing::info!(
                "Companion: {}, life stage: {}, spiritual: {}",
                p.persona().display_name,
                p.life_stage().name(),
                p.spiritual_tier().stage_name()
            );
        }

        let memory = self
            .recall
            .gather(&msg.user_id, &session_id, &msg.text)
            .await;
        let prompt = ContextBuilder::build_prompt(personality.as_ref(), &memory, &msg.text);

        let response_text = self
            .agent
            .invoke(&session_id, &prompt)
            .await
            .map_err(TurnError::AgentFailed)?;
        if response_text.trim().is_empty() {
            return Err(TurnError::EmptyResponse);
        }
        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let companion_name = personality.as_ref().map(|p| p.persona().display_name.as_str());
        let memory_saved = self
            .writer
            .record_turn(
                &msg.user_id,
                &session_id,
                &msg.text,
                &response_text,
                companion_name,
            )
            .await;

        let response = AgentResponse {
            conversation_id: msg.conversation_id.clone(),
            message_id: format!("ai-{}", msg.message_id),
            tokens_used: TokensUsed::estimate(&prompt, &response_text),
            response_text,
            timestamp: Utc::now(),
            processing_time_ms,
            companion: personality.as_ref().map(|p| CompanionSummary {
                name: p.persona().display_name.clone(),
                life_stage: p.life_stage().name(),
                spiritual_stage: p.spiritual_tier().stage_name(),
                spiritual_tier: p.spiritual_tier().level(),
            }),
            has_memory_context: memory.has_history(),
            has_semantic_context: memory.has_semantic(),
            memory_saved,
        };

        sink.deliver(&DeliveryPayload::AgentResponse(response.clone()))
            .await
            .map_err(TurnError::DeliveryFailed)?;
        Ok(response)
    }

    /// Inbound profile first, then the stored record. `None` means the turn
    /// runs without personalization.
    async fn resolve_profile(&self, msg: &InboundMessage) -> Option<UserProfile> {
        if let Some(profile) = msg.user_profile.as_ref().and_then(UserProfile::normalize) {
            return Some(profile);
        }
        match self.store.load_profile(&msg.user_id).await {
            Ok(stored) => stored.as_ref().and_then(UserProfile::normalize),
            Err(e) => {
                tracing::warn!("Could not load stored profile for {}: {e:#}", msg.user_id);
                None
            }
        }
    }

    async fn report_failure(&self, msg: &InboundMessage, error: &TurnError) {
        let Some(sink) = &self.sink else {
            tracing::error!(
                "No delivery target; failure of message {} not reported",
                msg.message_id
            );
            return;
        };
        let payload = DeliveryPayload::ProcessingError(ProcessingError {
            conversation_id: msg.conversation_id.clone(),
            message_id: msg.message_id.clone(),
            error: error.to_string(),
            error_kind: error.kind().to_string(),
            source: self.source.clone(),
            timestamp: Utc::now(),
        });
        if let Err(e) = sink.deliver(&payload).await {
            tracing::error!("Failed to notify backend of message {}: {e:#}", msg.message_id);
        }
    }
}
