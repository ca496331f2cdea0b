//! Agent descriptors, selections and per-agent execution results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Service tier an agent is registered under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentTier {
    Core,
    #[default]
    Specialist,
    Support,
}

/// A registered agent and the capability tags it declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub tier: AgentTier,
}

impl AgentDescriptor {
    pub fn new(id: impl Into<String>, capabilities: &[&str]) -> Self {
        Self {
            id: id.into(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            tier: AgentTier::default(),
        }
    }

    pub fn with_tier(mut self, tier: AgentTier) -> Self {
        self.tier = tier;
        self
    }

    /// Canonical form used by selection: trimmed id, lowercase unique tags.
    ///
    /// Returns `None` when the id is blank.
    pub fn normalize(self) -> Option<Self> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return None;
        }

        let mut capabilities: Vec<String> = Vec::with_capacity(self.capabilities.len());
        for cap in self.capabilities {
            let cap = cap.trim().to_lowercase();
            if !cap.is_empty() && !capabilities.contains(&cap) {
                capabilities.push(cap);
            }
        }

        Some(Self {
            id,
            capabilities,
            tier: self.tier,
        })
    }
}

/// Execution topology for the selected agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaborationType {
    #[default]
    Single,
    Parallel,
    Sequential,
    Hierarchical,
}

impl CollaborationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
            Self::Hierarchical => "hierarchical",
        }
    }
}

impl fmt::Display for CollaborationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which agents will answer a query and how they will collaborate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSelection {
    pub primary_agent: String,

    /// At most two, in invocation order
    #[serde(default)]
    pub collaborators: Vec<String>,

    pub collaboration_type: CollaborationType,

    pub rationale: String,
}

impl AgentSelection {
    /// A single-agent selection with no collaborators.
    pub fn single(primary: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            primary_agent: primary.into(),
            collaborators: Vec::new(),
            collaboration_type: CollaborationType::Single,
            rationale: rationale.into(),
        }
    }

    /// Primary followed by collaborators, in invocation order.
    pub fn agents(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_agent.as_str())
            .chain(self.collaborators.iter().map(String::as_str))
    }
}

/// Compliance annotation attached to agent output and to the final response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    ReviewRequired,
    #[default]
    Unknown,
}

/// Outcome of invoking one agent.
///
/// Constructed through [`AgentExecutionResult::succeeded`] and
/// [`AgentExecutionResult::failed`]; a failed result never carries content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExecutionResult {
    pub agent_id: String,
    pub content: Option<String>,
    pub confidence: f32,
    pub success: bool,
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_status: Option<ComplianceStatus>,

    /// Whether knowledge enrichment contributed to this result
    #[serde(default)]
    pub enriched: bool,

    pub duration_ms: f64,
}

impl AgentExecutionResult {
    pub fn succeeded(
        agent_id: impl Into<String>,
        content: impl Into<String>,
        confidence: f32,
        compliance_status: Option<ComplianceStatus>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            content: Some(content.into()),
            confidence: confidence.clamp(0.0, 1.0),
            success: true,
            error: None,
            compliance_status,
            enriched: false,
            duration_ms: 0.0,
        }
    }

    pub fn failed(agent_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            content: None,
            confidence: 0.0,
            success: false,
            error: Some(error.into()),
            compliance_status: None,
            enriched: false,
            duration_ms: 0.0,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Content of a successful result, or an empty string.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}
