//! The merged answer returned to callers.

use crate::agent::{CollaborationType, ComplianceStatus};
use crate::error::AgentFailure;
use crate::intent::IntentSummary;
use serde::{Deserialize, Serialize};

/// Wall-clock time spent in each orchestration stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    pub classification_ms: f64,
    pub selection_ms: f64,
    pub execution_ms: f64,
    pub synthesis_ms: f64,
    pub total_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub primary_agent: String,
    pub collaboration_type: CollaborationType,
    pub steps_executed: Vec<String>,
    pub compliance_status: ComplianceStatus,

    /// Agents that were invoked but produced nothing usable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_agents: Vec<AgentFailure>,

    /// Whether this response came from the fallback path
    #[serde(default)]
    pub fallback: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedResponse {
    pub request_id: String,
    pub content: String,

    /// Aggregate confidence (0.0 - 1.0)
    pub confidence: f32,

    /// Contributing agent ids, in invocation order
    pub contributors: Vec<String>,

    pub processing_time: Timings,
    pub execution_metadata: ExecutionMetadata,
}

impl UnifiedResponse {
    pub fn is_fallback(&self) -> bool {
        self.execution_metadata.fallback
    }
}
