//! Common types and traits shared across Conclave crates.
//!
//! This crate provides the data model that flows through one orchestration
//! call and the collaborator contracts the coordinator is built against.

pub mod agent;
pub mod error;
pub mod intent;
pub mod query;
pub mod response;
pub mod traits;

pub use agent::{
    AgentDescriptor, AgentExecutionResult, AgentSelection, AgentTier, CollaborationType,
    ComplianceStatus,
};
pub use error::{AgentFailure, ConclaveError, Result};
pub use intent::{
    ContextualFactors, DevelopmentPhase, IntentCategory, IntentClassification, IntentSummary,
    Stakeholder, Urgency,
};
pub use query::{ComplianceLevel, QueryContext};
pub use response::{ExecutionMetadata, Timings, UnifiedResponse};
pub use traits::{
    AgentInvocation, AgentInvoker, AgentOutput, ComplianceGate, KnowledgeQuery,
    KnowledgeResult, KnowledgeRetriever, KnowledgeSource, MetricEvent, MetricsSink,
};
