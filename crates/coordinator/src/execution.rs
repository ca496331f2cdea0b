//! Agent execution: single invocation or concurrent fan-out.
//!
//! Each agent call runs its invocation and an optional knowledge-enrichment
//! lookup side by side. Enrichment failures are logged and dropped; they can
//! only ever raise an answer's confidence, never lower it or fail it.

use crate::config::EnrichmentConfig;
use conclave_common::{
    AgentExecutionResult, AgentFailure, AgentInvocation, AgentInvoker, AgentSelection,
    CollaborationType, ConclaveError, IntentCategory, IntentClassification, KnowledgeQuery,
    KnowledgeResult, KnowledgeRetriever, QueryContext, Result,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const GENERIC_PROMPT_KEY: &str = "general_query";

/// Resolves the prompt entry point for an agent and intent category.
#[derive(Debug, Clone, Default)]
pub struct PromptCatalog {
    overrides: HashMap<String, String>,
}

impl PromptCatalog {
    /// `overrides` is keyed by `"agent_id:category"`.
    pub fn new(overrides: HashMap<String, String>) -> Self {
        Self { overrides }
    }

    pub fn resolve(&self, agent_id: &str, category: IntentCategory) -> String {
        if let Some(key) = self.overrides.get(&format!("{}:{}", agent_id, category)) {
            return key.clone();
        }

        match category {
            IntentCategory::Regulatory => "regulatory_analysis",
            IntentCategory::Clinical => "clinical_analysis",
            IntentCategory::Research => "research_analysis",
            IntentCategory::MarketAccess => "market_access_analysis",
            IntentCategory::Quality => "quality_analysis",
            IntentCategory::Strategy => "strategy_analysis",
            IntentCategory::General => GENERIC_PROMPT_KEY,
        }
        .to_string()
    }
}

/// Per-agent results of one execution, in invocation order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub results: Vec<AgentExecutionResult>,
}

impl ExecutionOutcome {
    pub fn succeeded(&self) -> Vec<&AgentExecutionResult> {
        self.results.iter().filter(|r| r.success).collect()
    }

    pub fn failures(&self) -> Vec<AgentFailure> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| AgentFailure {
                agent_id: r.agent_id.clone(),
                error: r.error.clone().unwrap_or_default(),
            })
            .collect()
    }
}

/// Runs selected agents against the invocation service.
pub struct ExecutionEngine {
    invoker: Arc<dyn AgentInvoker>,
    knowledge: Option<Arc<dyn KnowledgeRetriever>>,
    enrichment: EnrichmentConfig,
    prompts: PromptCatalog,
}

impl ExecutionEngine {
    pub fn new(
        invoker: Arc<dyn AgentInvoker>,
        knowledge: Option<Arc<dyn KnowledgeRetriever>>,
        enrichment: EnrichmentConfig,
        prompts: PromptCatalog,
    ) -> Self {
        Self {
            invoker,
            knowledge,
            enrichment,
            prompts,
        }
    }

    pub fn prompts(&self) -> &PromptCatalog {
        &self.prompts
    }

    /// Execute a selection: one agent directly, or every agent concurrently.
    pub async fn execute(
        &self,
        selection: &AgentSelection,
        intent: &IntentClassification,
        query: &str,
        context: &QueryContext,
    ) -> Result<ExecutionOutcome> {
        if selection.collaborators.is_empty() {
            let result = self
                .execute_single(&selection.primary_agent, selection, intent, query, context)
                .await?;
            Ok(ExecutionOutcome {
                results: vec![result],
            })
        } else {
            self.execute_multi(selection, intent, query, context).await
        }
    }

    /// Run one agent. An invocation failure is returned to the caller.
    pub async fn execute_single(
        &self,
        agent_id: &str,
        selection: &AgentSelection,
        intent: &IntentClassification,
        query: &str,
        context: &QueryContext,
    ) -> Result<AgentExecutionResult> {
        info!(agent = %agent_id, "Executing single agent");
        let call = self.call(agent_id, selection, intent, query, context);

        match tokio::spawn(call.run()).await {
            Ok(result) => result,
            Err(e) => {
                error!(agent = %agent_id, error = %e, "Agent task join error");
                Err(ConclaveError::invocation(
                    agent_id,
                    format!("Agent task aborted: {}", e),
                ))
            }
        }
    }

    /// Run the primary and all collaborators concurrently.
    ///
    /// Each agent is isolated: one failure never cancels its siblings. Fails
    /// only when no agent produced a usable result.
    pub async fn execute_multi(
        &self,
        selection: &AgentSelection,
        intent: &IntentClassification,
        query: &str,
        context: &QueryContext,
    ) -> Result<ExecutionOutcome> {
        let agents: Vec<String> = selection.agents().map(String::from).collect();

        info!(
            agent_count = agents.len(),
            collaboration = %selection.collaboration_type,
            "Executing agents concurrently"
        );

        let handles: Vec<_> = agents
            .iter()
            .map(|agent_id| {
                let call = self.call(agent_id, selection, intent, query, context);
                (agent_id.clone(), tokio::spawn(call.run()))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (agent_id, handle) in handles {
            match handle.await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => {
                    warn!(agent = %agent_id, error = %e, "Agent failed, continuing with others");
                    results.push(AgentExecutionResult::failed(agent_id, e.to_string()));
                }
                Err(e) => {
                    error!(agent = %agent_id, error = %e, "Agent task join error");
                    results.push(AgentExecutionResult::failed(
                        agent_id,
                        format!("Agent task aborted: {}", e),
                    ));
                }
            }
        }

        let outcome = ExecutionOutcome { results };
        if outcome.succeeded().is_empty() {
            return Err(ConclaveError::AllAgentsFailed(outcome.failures()));
        }

        debug!(
            succeeded = outcome.succeeded().len(),
            failed = outcome.failures().len(),
            "Concurrent execution finished"
        );

        Ok(outcome)
    }

    fn call(
        &self,
        agent_id: &str,
        selection: &AgentSelection,
        intent: &IntentClassification,
        query: &str,
        context: &QueryContext,
    ) -> AgentCall {
        let role = if agent_id == selection.primary_agent {
            "primary"
        } else {
            "collaborator"
        };

        let inputs = json!({
            "query": query,
            "category": intent.category,
            "subcategories": intent.subcategories,
            "key_terms": intent.key_terms,
            "complexity": intent.complexity,
            "urgency": intent.factors.urgency,
            "role": role,
            "collaboration_type": selection.collaboration_type,
        });

        let knowledge = if self.enrichment.enabled {
            self.knowledge.clone()
        } else {
            None
        };

        AgentCall {
            invoker: self.invoker.clone(),
            knowledge,
            invocation: AgentInvocation {
                agent_id: agent_id.to_string(),
                prompt_key: self.prompts.resolve(agent_id, intent.category),
                inputs,
                context: context.clone(),
            },
            knowledge_query: KnowledgeQuery {
                query: query.to_string(),
                agent_id: agent_id.to_string(),
                category: intent.category,
                context: context.clone(),
                use_multi: selection.collaboration_type != CollaborationType::Single,
                max_results: self.enrichment.max_results,
            },
            max_boost: self.enrichment.effective_max_boost(),
        }
    }
}

/// Everything one agent task needs, owned so it can run on its own task.
struct AgentCall {
    invoker: Arc<dyn AgentInvoker>,
    knowledge: Option<Arc<dyn KnowledgeRetriever>>,
    invocation: AgentInvocation,
    knowledge_query: KnowledgeQuery,
    max_boost: f32,
}

impl AgentCall {
    async fn run(self) -> Result<AgentExecutionResult> {
        let start = Instant::now();
        let agent_id = self.invocation.agent_id.clone();
        let max_results = self.knowledge_query.max_results;

        debug!(
            agent = %agent_id,
            prompt_key = %self.invocation.prompt_key,
            enrichment = self.knowledge.is_some(),
            "Invoking agent"
        );

        let (output, knowledge) = tokio::join!(
            self.invoker.invoke(self.invocation),
            enrich(self.knowledge, self.knowledge_query)
        );

        let output = output.map_err(|e| match e {
            ConclaveError::AgentInvocation { .. } => e,
            other => ConclaveError::invocation(&agent_id, other.to_string()),
        })?;

        let confidence = if output.confidence.is_finite() {
            output.confidence
        } else {
            0.0
        };

        let mut result = AgentExecutionResult::succeeded(
            &agent_id,
            output.content,
            confidence,
            Some(output.compliance_status),
        );

        if let Some(knowledge) = knowledge {
            apply_enrichment(&mut result, &knowledge, self.max_boost, max_results);
        }

        Ok(result.with_duration_ms(start.elapsed().as_secs_f64() * 1000.0))
    }
}

async fn enrich(
    knowledge: Option<Arc<dyn KnowledgeRetriever>>,
    request: KnowledgeQuery,
) -> Option<KnowledgeResult> {
    let retriever = knowledge?;
    let agent_id = request.agent_id.clone();

    match retriever.retrieve(request).await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(agent = %agent_id, error = %e, "Knowledge enrichment failed, continuing without it");
            None
        }
    }
}

/// Merge retrieved evidence into a successful result.
///
/// Adds at most `max_boost` confidence, capped at 1.0. Empty retrievals change nothing.
fn apply_enrichment(
    result: &mut AgentExecutionResult,
    knowledge: &KnowledgeResult,
    max_boost: f32,
    max_results: usize,
) {
    if knowledge.sources.is_empty() || max_results == 0 {
        return;
    }

    let relevance = if knowledge.confidence.is_finite() {
        knowledge.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let boost = relevance * max_boost;
    result.confidence = f32::min(result.confidence + boost, 1.0);

    let sources: Vec<String> = knowledge
        .sources
        .iter()
        .take(max_results)
        .map(|s| match &s.url {
            Some(url) => format!("- {} ({})", s.title, url),
            None => format!("- {}", s.title),
        })
        .collect();

    if let Some(content) = result.content.as_mut() {
        content.push_str("\n\n**Supporting sources**\n");
        content.push_str(&sources.join("\n"));
    }
    result.enriched = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conclave_common::{AgentOutput, ContextualFactors, KnowledgeSource};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedInvoker {
        failing: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl ScriptedInvoker {
        fn new(failing: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                failing,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AgentInvoker for ScriptedInvoker {
        async fn invoke(&self, request: AgentInvocation) -> Result<AgentOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&request.agent_id.as_str()) {
                return Err(ConclaveError::invocation(&request.agent_id, "service unavailable"));
            }
            Ok(AgentOutput {
                content: format!("{} answered via {}.", request.agent_id, request.prompt_key),
                confidence: 0.8,
                compliance_status: Default::default(),
            })
        }
    }

    /// Panics for the listed ids, answers for the rest.
    struct PanickingInvoker {
        panicking: Vec<&'static str>,
    }

    #[async_trait]
    impl AgentInvoker for PanickingInvoker {
        async fn invoke(&self, request: AgentInvocation) -> Result<AgentOutput> {
            if self.panicking.contains(&request.agent_id.as_str()) {
                panic!("agent {} crashed", request.agent_id);
            }
            Ok(AgentOutput {
                content: "ok".into(),
                confidence: 0.7,
                compliance_status: Default::default(),
            })
        }
    }

    struct StaticKnowledge {
        fail: bool,
    }

    #[async_trait]
    impl KnowledgeRetriever for StaticKnowledge {
        async fn retrieve(&self, _request: KnowledgeQuery) -> Result<KnowledgeResult> {
            if self.fail {
                return Err(ConclaveError::Enrichment("index offline".into()));
            }
            Ok(KnowledgeResult {
                sources: vec![KnowledgeSource {
                    title: "FDA guidance: 510(k) program".into(),
                    url: Some("https://example.org/510k".into()),
                    relevance: 0.9,
                }],
                confidence: 1.0,
                ..Default::default()
            })
        }
    }

    fn intent() -> IntentClassification {
        IntentClassification {
            category: IntentCategory::Regulatory,
            confidence: 0.6,
            subcategories: Vec::new(),
            key_terms: Vec::new(),
            complexity: 0.8,
            factors: ContextualFactors::default(),
        }
    }

    fn multi_selection() -> AgentSelection {
        AgentSelection {
            primary_agent: "a".into(),
            collaborators: vec!["b".into(), "c".into()],
            collaboration_type: CollaborationType::Parallel,
            rationale: String::new(),
        }
    }

    fn engine(
        invoker: Arc<dyn AgentInvoker>,
        knowledge: Option<Arc<dyn KnowledgeRetriever>>,
    ) -> ExecutionEngine {
        ExecutionEngine::new(
            invoker,
            knowledge,
            EnrichmentConfig::default(),
            PromptCatalog::default(),
        )
    }

    #[test]
    fn prompt_catalog_lookup_and_fallback() {
        let mut overrides = HashMap::new();
        overrides.insert("biostatistician:clinical".to_string(), "sample_size".to_string());
        let catalog = PromptCatalog::new(overrides);

        assert_eq!(catalog.resolve("biostatistician", IntentCategory::Clinical), "sample_size");
        assert_eq!(catalog.resolve("other", IntentCategory::Clinical), "clinical_analysis");
        assert_eq!(catalog.resolve("other", IntentCategory::General), "general_query");
    }

    #[tokio::test]
    async fn single_failure_propagates() {
        let engine = engine(ScriptedInvoker::new(vec!["a"]), None);
        let selection = AgentSelection::single("a", "");
        let err = engine
            .execute(&selection, &intent(), "q", &QueryContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConclaveError::AgentInvocation { .. }));
    }

    #[tokio::test]
    async fn multi_partial_failure_keeps_order() {
        let invoker = ScriptedInvoker::new(vec!["b"]);
        let engine = engine(invoker.clone(), None);

        let outcome = engine
            .execute(&multi_selection(), &intent(), "q", &QueryContext::default())
            .await
            .unwrap();

        let ids: Vec<_> = outcome.succeeded().iter().map(|r| r.agent_id.clone()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(outcome.failures().len(), 1);
        assert_eq!(outcome.failures()[0].agent_id, "b");
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_panic_becomes_invocation_error() {
        let engine = engine(Arc::new(PanickingInvoker { panicking: vec!["a"] }), None);
        let err = engine
            .execute(&AgentSelection::single("a", ""), &intent(), "q", &QueryContext::default())
            .await
            .unwrap_err();

        match err {
            ConclaveError::AgentInvocation { agent_id, message } => {
                assert_eq!(agent_id, "a");
                assert!(message.contains("aborted"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn multi_panic_is_isolated() {
        let engine = engine(Arc::new(PanickingInvoker { panicking: vec!["b"] }), None);
        let outcome = engine
            .execute(&multi_selection(), &intent(), "q", &QueryContext::default())
            .await
            .unwrap();

        let ids: Vec<_> = outcome.succeeded().iter().map(|r| r.agent_id.clone()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        let failures = outcome.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].agent_id, "b");
        assert!(failures[0].error.contains("aborted"));
    }

    #[tokio::test]
    async fn multi_all_failed_is_error() {
        let engine = engine(ScriptedInvoker::new(vec!["a", "b", "c"]), None);
        let err = engine
            .execute(&multi_selection(), &intent(), "q", &QueryContext::default())
            .await
            .unwrap_err();

        match err {
            ConclaveError::AllAgentsFailed(failures) => assert_eq!(failures.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn enrichment_failure_is_swallowed() {
        let engine = engine(
            ScriptedInvoker::new(vec![]),
            Some(Arc::new(StaticKnowledge { fail: true })),
        );
        let result = engine
            .execute_single("a", &AgentSelection::single("a", ""), &intent(), "q", &QueryContext::default())
            .await
            .unwrap();

        assert!(!result.enriched);
        assert!((result.confidence - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn enrichment_boost_is_bounded() {
        let engine = engine(
            ScriptedInvoker::new(vec![]),
            Some(Arc::new(StaticKnowledge { fail: false })),
        );
        let result = engine
            .execute_single("a", &AgentSelection::single("a", ""), &intent(), "q", &QueryContext::default())
            .await
            .unwrap();

        assert!(result.enriched);
        assert!(result.confidence > 0.8);
        assert!(result.confidence <= 0.9 + 1e-6);
        assert!(result.text().contains("Supporting sources"));
        assert!(result.text().contains("https://example.org/510k"));
    }

    #[tokio::test]
    async fn disabled_enrichment_skips_retrieval() {
        let engine = ExecutionEngine::new(
            ScriptedInvoker::new(vec![]),
            Some(Arc::new(StaticKnowledge { fail: false })),
            EnrichmentConfig {
                enabled: false,
                ..Default::default()
            },
            PromptCatalog::default(),
        );
        let result = engine
            .execute_single("a", &AgentSelection::single("a", ""), &intent(), "q", &QueryContext::default())
            .await
            .unwrap();
        assert!(!result.enriched);
    }

    #[test]
    fn enrichment_never_exceeds_one() {
        let mut result = AgentExecutionResult::succeeded("a", "text", 0.97, None);
        let knowledge = KnowledgeResult {
            sources: vec![KnowledgeSource {
                title: "t".into(),
                url: None,
                relevance: 1.0,
            }],
            confidence: 1.0,
            ..Default::default()
        };
        apply_enrichment(&mut result, &knowledge, 0.1, 5);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn empty_enrichment_changes_nothing() {
        let mut result = AgentExecutionResult::succeeded("a", "text", 0.5, None);
        apply_enrichment(&mut result, &KnowledgeResult::default(), 0.1, 5);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.text(), "text");
        assert!(!result.enriched);
    }
}
