//! Error types for Conclave.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An agent that produced no usable output, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFailure {
    pub agent_id: String,
    pub error: String,
}

#[derive(Error, Debug)]
pub enum ConclaveError {
    #[error("Selection error: {0}")]
    Selection(String),

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Agent '{agent_id}' invocation failed: {message}")]
    AgentInvocation { agent_id: String, message: String },

    #[error("All {} agents failed", .0.len())]
    AllAgentsFailed(Vec<AgentFailure>),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConclaveError {
    pub fn invocation(agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AgentInvocation {
            agent_id: agent_id.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConclaveError>;
