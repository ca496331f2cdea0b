//! Collaborator traits the orchestration core depends on.
//!
//! These are defined in `conclave-common` so that the coordinator and the
//! gateway adapters can reference them without circular dependencies.

use crate::agent::{AgentDescriptor, CollaborationType, ComplianceStatus};
use crate::intent::IntentCategory;
use crate::query::{ComplianceLevel, QueryContext};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Supplies the agent registry and compliance annotations.
#[async_trait]
pub trait ComplianceGate: Send + Sync {
    /// List the agents currently available for selection.
    async fn agents(&self) -> Result<Vec<AgentDescriptor>>;

    /// Combine agent-reported statuses into one annotation for the response.
    fn review(&self, context: &QueryContext, statuses: &[ComplianceStatus]) -> ComplianceStatus {
        let combined = if statuses.contains(&ComplianceStatus::ReviewRequired) {
            ComplianceStatus::ReviewRequired
        } else if !statuses.is_empty()
            && statuses.iter().all(|s| *s == ComplianceStatus::Compliant)
        {
            ComplianceStatus::Compliant
        } else {
            ComplianceStatus::Unknown
        };

        if combined == ComplianceStatus::Unknown
            && context.compliance_level == ComplianceLevel::Strict
        {
            ComplianceStatus::ReviewRequired
        } else {
            combined
        }
    }
}

/// A request to run one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInvocation {
    pub agent_id: String,
    pub prompt_key: String,
    pub inputs: serde_json::Value,
    pub context: QueryContext,
}

/// What an agent returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    pub content: String,
    pub confidence: f32,
    #[serde(default)]
    pub compliance_status: ComplianceStatus,
}

/// Runs a specialist agent. Timeouts and cancellation are the implementor's job.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, request: AgentInvocation) -> Result<AgentOutput>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeQuery {
    pub query: String,
    pub agent_id: String,
    pub category: IntentCategory,
    pub context: QueryContext,
    pub use_multi: bool,
    pub max_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSource {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub relevance: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeResult {
    #[serde(default)]
    pub sources: Vec<KnowledgeSource>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub systems_used: Vec<String>,
    #[serde(default)]
    pub followups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_context: Option<String>,
}

/// Optional evidence retrieval used to enrich agent answers.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn retrieve(&self, request: KnowledgeQuery) -> Result<KnowledgeResult>;
}

/// Events emitted over the life of one orchestration call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetricEvent {
    OrchestrationStarted {
        request_id: String,
        query_chars: usize,
    },
    DecisionMade {
        request_id: String,
        category: IntentCategory,
        primary_agent: String,
        collaborators: Vec<String>,
        collaboration_type: CollaborationType,
    },
    OrchestrationCompleted {
        request_id: String,
        agents: Vec<String>,
        total_ms: f64,
        confidence: f32,
        fallback: bool,
    },
}

impl MetricEvent {
    pub fn request_id(&self) -> &str {
        match self {
            Self::OrchestrationStarted { request_id, .. }
            | Self::DecisionMade { request_id, .. }
            | Self::OrchestrationCompleted { request_id, .. } => request_id,
        }
    }
}

/// Receives metric events. `emit` must return immediately and never fail.
pub trait MetricsSink: Send + Sync {
    fn emit(&self, event: MetricEvent);
}
