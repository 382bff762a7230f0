//! Failures that abort a single turn.

use thiserror::Error;

/// Fatal for one unit of work. Everything else in the pipeline degrades
/// instead of failing.
#[derive(Error, Debug)]
pub enum TurnError {
    /// No agent identity configured
    #[error("Agent identity (model) is not configured")]
    MissingAgentIdentity,

    /// No delivery target configured
    #[error("Delivery target (webhook_url) is not configured")]
    MissingDeliveryTarget,

    /// Transport or protocol failure while invoking the agent
    #[error("Agent invocation failed: {0:#}")]
    AgentFailed(#[source] anyhow::Error),

    /// The agent answered with nothing
    #[error("Agent returned an empty response")]
    EmptyResponse,

    /// The result could not be handed back to the backend
    #[error("Delivery failed: {0:#}")]
    DeliveryFailed(#[source] anyhow::Error),
}

impl TurnError {
    /// Stable label carried in the error payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingAgentIdentity | Self::MissingDeliveryTarget => "configuration",
            Self::AgentFailed(_) | Self::EmptyResponse => "agent_failure",
            Self::DeliveryFailed(_) => "delivery",
        }
    }
}
