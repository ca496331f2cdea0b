//! Degraded response used when orchestration produces nothing usable.

use conclave_common::{
    AgentFailure, CollaborationType, ComplianceStatus, ExecutionMetadata, IntentSummary, Timings,
    UnifiedResponse,
};

pub const FALLBACK_AGENT: &str = "fallback-system";
pub const FALLBACK_CONFIDENCE: f32 = 0.2;

const REGULATORY_GUIDANCE: &str = "I wasn't able to complete a full regulatory analysis for this \
    request. Try restating the question with the product type, the target market, and the \
    submission pathway you are considering (for example 510(k), PMA or De Novo).";

const CLINICAL_GUIDANCE: &str = "I wasn't able to complete a full clinical analysis for this \
    request. Try restating the question with the indication, the trial phase, and the endpoint \
    or population you want to discuss.";

const GENERIC_GUIDANCE: &str = "I wasn't able to process this request right now. Try rephrasing \
    the question, or narrow it to a specific regulatory, clinical or commercial topic.";

/// What the pipeline knew when it gave up.
#[derive(Debug, Clone, Default)]
pub struct FallbackDetails {
    pub timings: Timings,
    pub intent: Option<IntentSummary>,
    pub failed_agents: Vec<AgentFailure>,
    /// Stages that completed before the failure
    pub steps_executed: Vec<String>,
    pub compliance_status: ComplianceStatus,
}

/// Builds fixed low-confidence responses. Infallible.
#[derive(Debug, Clone, Default)]
pub struct FallbackHandler;

impl FallbackHandler {
    pub fn new() -> Self {
        Self
    }

    /// Guidance text keyed off what the original query mentions.
    pub fn content_for(&self, query: &str) -> &'static str {
        let lower = query.to_lowercase();
        if lower.contains("regulatory") {
            REGULATORY_GUIDANCE
        } else if lower.contains("clinical") {
            CLINICAL_GUIDANCE
        } else {
            GENERIC_GUIDANCE
        }
    }

    pub fn respond(
        &self,
        request_id: &str,
        query: &str,
        details: FallbackDetails,
    ) -> UnifiedResponse {
        let mut steps_executed = details.steps_executed;
        steps_executed.push("fallback".to_string());

        UnifiedResponse {
            request_id: request_id.to_string(),
            content: self.content_for(query).to_string(),
            confidence: FALLBACK_CONFIDENCE,
            contributors: vec![FALLBACK_AGENT.to_string()],
            processing_time: details.timings,
            execution_metadata: ExecutionMetadata {
                primary_agent: FALLBACK_AGENT.to_string(),
                collaboration_type: CollaborationType::Single,
                steps_executed,
                compliance_status: details.compliance_status,
                failed_agents: details.failed_agents,
                fallback: true,
                intent: details.intent,
            },
        }
    }
}
