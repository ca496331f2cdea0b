//! Multi-agent query orchestration for Conclave.
//!
//! The coordinator is the decision engine that:
//! 1. Classifies the intent of a natural-language query
//! 2. Selects a primary agent and optional collaborators by capability
//! 3. Resolves a collaboration topology
//! 4. Executes the agents with per-agent failure isolation
//! 5. Synthesizes one answer and records how long it all took
//!
//! # Architecture
//!
//! ```text
//! Query + Context
//!      │
//!      ▼
//! ┌─────────────────┐
//! │   Classifier    │
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐      ┌──────────────┐
//! │    Selector     │ ◄─── │   Registry   │ ◄── ComplianceGate
//! └────────┬────────┘      └──────────────┘
//!          ▼
//! ┌─────────────────┐
//! │    Execution    │ ──► AgentInvoker (per agent, concurrent)
//! │                 │ ──► KnowledgeRetriever (optional)
//! └────────┬────────┘
//!          ▼
//!     Synthesizer ──► PerformanceTracker ──► UnifiedResponse
//!          │
//!          └── on total failure ──► Fallback
//! ```

pub mod config;
pub mod execution;
pub mod fallback;
pub mod intent;
pub mod metrics;
pub mod orchestrator;
pub mod performance;
pub mod registry;
pub mod selection;
pub mod strategy;
pub mod synthesis;

pub use config::CoordinatorConfig;
pub use execution::{ExecutionEngine, ExecutionOutcome, PromptCatalog};
pub use fallback::{FallbackDetails, FallbackHandler, FALLBACK_AGENT, FALLBACK_CONFIDENCE};
pub use intent::IntentClassifier;
pub use metrics::{ChannelMetricsSink, TracingMetricsSink};
pub use orchestrator::{Coordinator, CoordinatorBuilder};
pub use performance::{PerformanceRecord, PerformanceTracker};
pub use registry::{default_agents, AgentRegistry, ConfiguredComplianceGate};
pub use selection::AgentSelector;
pub use synthesis::{ResponseSynthesizer, Synthesis};
