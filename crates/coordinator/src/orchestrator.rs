//! The orchestration pipeline.

use crate::config::CoordinatorConfig;
use crate::execution::{ExecutionEngine, PromptCatalog};
use crate::fallback::{FallbackDetails, FallbackHandler};
use crate::intent::IntentClassifier;
use crate::performance::{unix_millis, PerformanceRecord, PerformanceTracker};
use crate::registry::{AgentRegistry, ConfiguredComplianceGate};
use crate::selection::AgentSelector;
use crate::strategy;
use crate::synthesis::ResponseSynthesizer;
use conclave_common::{
    AgentFailure, AgentInvoker, AgentSelection, CollaborationType, ComplianceGate, ConclaveError,
    ExecutionMetadata, IntentClassification, KnowledgeRetriever, MetricEvent, MetricsSink,
    QueryContext, Result, Timings, UnifiedResponse,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Routes queries to specialist agents and merges what they return.
///
/// `orchestrate` always produces a response: stages absorb their own
/// recoverable failures, and total failure yields a fallback answer.
pub struct Coordinator {
    config: CoordinatorConfig,
    classifier: IntentClassifier,
    selector: AgentSelector,
    registry: AgentRegistry,
    engine: ExecutionEngine,
    synthesizer: ResponseSynthesizer,
    tracker: PerformanceTracker,
    fallback: FallbackHandler,
    metrics: Option<Arc<dyn MetricsSink>>,
}

/// Builder for [`Coordinator`]. An [`AgentInvoker`] is required.
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
    gate: Option<Arc<dyn ComplianceGate>>,
    invoker: Option<Arc<dyn AgentInvoker>>,
    knowledge: Option<Arc<dyn KnowledgeRetriever>>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl CoordinatorBuilder {
    /// Agent registry and compliance source. Defaults to the configured `[[agents]]`.
    pub fn compliance_gate(mut self, gate: Arc<dyn ComplianceGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn invoker(mut self, invoker: Arc<dyn AgentInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn knowledge(mut self, knowledge: Arc<dyn KnowledgeRetriever>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Coordinator> {
        let config = self.config;

        let invoker = self
            .invoker
            .ok_or_else(|| ConclaveError::Config("an agent invoker is required".into()))?;

        let gate = self
            .gate
            .unwrap_or_else(|| Arc::new(ConfiguredComplianceGate::new(config.descriptors())));

        let registry = AgentRegistry::new(
            gate,
            Duration::from_secs(config.registry.cache_ttl_secs),
        );

        let engine = ExecutionEngine::new(
            invoker,
            self.knowledge,
            config.enrichment.clone(),
            PromptCatalog::new(config.prompts.clone()),
        );

        info!(
            default_agent = %config.default_agent,
            configured_agents = config.agents.len(),
            enrichment = config.enrichment.enabled,
            "Initializing coordinator"
        );

        Ok(Coordinator {
            classifier: IntentClassifier::new()?,
            selector: AgentSelector::new(config.default_agent.clone())?,
            registry,
            engine,
            synthesizer: ResponseSynthesizer::new(),
            tracker: PerformanceTracker::new(
                config.tracker.capacity,
                config.tracker.classification_target_ms,
            ),
            fallback: FallbackHandler::new(),
            metrics: self.metrics,
            config,
        })
    }
}

impl Coordinator {
    pub fn builder(config: CoordinatorConfig) -> CoordinatorBuilder {
        CoordinatorBuilder {
            config,
            gate: None,
            invoker: None,
            knowledge: None,
            metrics: None,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn performance(&self) -> &PerformanceTracker {
        &self.tracker
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub async fn registered_agents(&self) -> usize {
        self.registry.agents().await.len()
    }

    pub fn classify(&self, query: &str) -> IntentClassification {
        self.classifier.classify(query)
    }

    /// Select agents from the current registry.
    pub async fn select(&self, intent: &IntentClassification, query: &str) -> AgentSelection {
        let agents = self.registry.agents().await;
        self.selector.select(intent, query, &agents)
    }

    pub fn resolve_strategy(
        &self,
        intent: &IntentClassification,
        collaborator_count: usize,
    ) -> CollaborationType {
        strategy::resolve(
            intent.complexity,
            collaborator_count,
            intent.factors.urgency,
            intent.category,
        )
    }

    /// Answer a query. Never fails.
    pub async fn orchestrate(&self, query: &str, context: QueryContext) -> UnifiedResponse {
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        let mut timings = Timings::default();
        let mut steps = Vec::with_capacity(4);

        self.emit(MetricEvent::OrchestrationStarted {
            request_id: request_id.clone(),
            query_chars: query.chars().count(),
        });

        let stage = Instant::now();
        let intent = self.classify(query);
        timings.classification_ms = elapsed_ms(stage);
        steps.push("classification".to_string());

        let stage = Instant::now();
        let selection = self.select(&intent, query).await;
        timings.selection_ms = elapsed_ms(stage);
        steps.push("selection".to_string());

        info!(
            request_id = %request_id,
            category = %intent.category,
            confidence = intent.confidence,
            primary = %selection.primary_agent,
            collaborators = ?selection.collaborators,
            collaboration = %selection.collaboration_type,
            "Orchestration decision"
        );

        self.emit(MetricEvent::DecisionMade {
            request_id: request_id.clone(),
            category: intent.category,
            primary_agent: selection.primary_agent.clone(),
            collaborators: selection.collaborators.clone(),
            collaboration_type: selection.collaboration_type,
        });

        let stage = Instant::now();
        let outcome = self.engine.execute(&selection, &intent, query, &context).await;
        timings.execution_ms = elapsed_ms(stage);

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(request_id = %request_id, error = %e, "Execution failed, using fallback");
                return self.fall_back(
                    &request_id,
                    query,
                    &intent,
                    &context,
                    FallbackDetails {
                        timings,
                        failed_agents: failures_of(e),
                        steps_executed: steps,
                        ..Default::default()
                    },
                    start,
                );
            }
        };
        steps.push("execution".to_string());

        let stage = Instant::now();
        let Some(synthesis) =
            self.synthesizer
                .synthesize(&outcome.results, &selection.primary_agent, &intent)
        else {
            error!(request_id = %request_id, "No usable agent output, using fallback");
            return self.fall_back(
                &request_id,
                query,
                &intent,
                &context,
                FallbackDetails {
                    timings,
                    failed_agents: outcome.failures(),
                    steps_executed: steps,
                    ..Default::default()
                },
                start,
            );
        };
        timings.synthesis_ms = elapsed_ms(stage);
        steps.push("synthesis".to_string());

        let statuses: Vec<_> = outcome
            .succeeded()
            .iter()
            .filter_map(|r| r.compliance_status)
            .collect();
        let compliance_status = self.registry.gate().review(&context, &statuses);

        let failed_agents = outcome.failures();
        if !failed_agents.is_empty() {
            warn!(
                request_id = %request_id,
                failed = failed_agents.len(),
                "Some agents failed; answer built from the rest"
            );
        }

        timings.total_ms = elapsed_ms(start);

        let response = UnifiedResponse {
            request_id,
            content: synthesis.content,
            confidence: synthesis.confidence,
            contributors: synthesis.contributors,
            processing_time: timings,
            execution_metadata: ExecutionMetadata {
                primary_agent: selection.primary_agent.clone(),
                collaboration_type: selection.collaboration_type,
                steps_executed: steps,
                compliance_status,
                failed_agents,
                fallback: false,
                intent: Some(intent.summary()),
            },
        };

        self.finish(query, &intent, &response);
        response
    }

    /// Answer with the fallback. Nothing usable was produced, so the compliance
    /// review sees no agent statuses.
    fn fall_back(
        &self,
        request_id: &str,
        query: &str,
        intent: &IntentClassification,
        context: &QueryContext,
        mut details: FallbackDetails,
        start: Instant,
    ) -> UnifiedResponse {
        details.timings.total_ms = elapsed_ms(start);
        details.intent = Some(intent.summary());
        details.compliance_status = self.registry.gate().review(context, &[]);

        let response = self.fallback.respond(request_id, query, details);
        self.finish(query, intent, &response);
        response
    }

    fn finish(&self, query: &str, intent: &IntentClassification, response: &UnifiedResponse) {
        self.tracker.record(PerformanceRecord {
            timestamp: unix_millis(),
            request_id: response.request_id.clone(),
            query: query.to_string(),
            intent: intent.summary(),
            collaboration_type: response.execution_metadata.collaboration_type,
            timings: response.processing_time,
            agents_used: response.contributors.clone(),
            confidence: response.confidence,
            fallback: response.is_fallback(),
        });

        debug!(
            request_id = %response.request_id,
            total_ms = response.processing_time.total_ms,
            confidence = response.confidence,
            fallback = response.is_fallback(),
            "Orchestration complete"
        );

        self.emit(MetricEvent::OrchestrationCompleted {
            request_id: response.request_id.clone(),
            agents: response.contributors.clone(),
            total_ms: response.processing_time.total_ms,
            confidence: response.confidence,
            fallback: response.is_fallback(),
        });
    }

    fn emit(&self, event: MetricEvent) {
        if let Some(metrics) = &self.metrics {
            metrics.emit(event);
        }
    }
}

fn failures_of(error: ConclaveError) -> Vec<AgentFailure> {
    match error {
        ConclaveError::AllAgentsFailed(failures) => failures,
        ConclaveError::AgentInvocation { ref agent_id, .. } => vec![AgentFailure {
            agent_id: agent_id.clone(),
            error: error.to_string(),
        }],
        _ => Vec::new(),
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
