//! HTTP clients for the agent service and the knowledge service.

use async_trait::async_trait;
use conclave_common::{
    AgentInvocation, AgentInvoker, AgentOutput, ConclaveError, KnowledgeQuery, KnowledgeResult,
    KnowledgeRetriever, QueryContext, Result,
};
use conclave_coordinator::config::{AgentServiceConfig, EnrichmentConfig};
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct InvokeRequest<'a> {
    prompt_key: &'a str,
    inputs: &'a serde_json::Value,
    context: &'a QueryContext,
}

/// Invokes agents over `POST {endpoint}/agents/{id}/invoke`.
pub struct HttpAgentInvoker {
    endpoint: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl HttpAgentInvoker {
    pub fn from_config(config: &AgentServiceConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ConclaveError::Config("agent_service.endpoint is not set".into()))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ConclaveError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            api_key: config.resolve_api_key(),
            http_client,
        })
    }

    fn invoke_url(&self, agent_id: &str) -> String {
        format!("{}/agents/{}/invoke", self.endpoint, agent_id)
    }
}

#[async_trait]
impl AgentInvoker for HttpAgentInvoker {
    async fn invoke(&self, request: AgentInvocation) -> Result<AgentOutput> {
        let agent_id = request.agent_id.as_str();
        let body = InvokeRequest {
            prompt_key: &request.prompt_key,
            inputs: &request.inputs,
            context: &request.context,
        };

        let mut builder = self.http_client.post(self.invoke_url(agent_id)).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ConclaveError::invocation(agent_id, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ConclaveError::invocation(
                agent_id,
                format!("agent service error {status}: {body_text}"),
            ));
        }

        response
            .json::<AgentOutput>()
            .await
            .map_err(|e| ConclaveError::invocation(agent_id, format!("invalid response: {e}")))
    }
}

/// Retrieves supporting evidence over `POST {endpoint}/retrieve`.
pub struct HttpKnowledgeRetriever {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpKnowledgeRetriever {
    /// `None` when enrichment is disabled or has no endpoint.
    pub fn from_config(config: &EnrichmentConfig, timeout: Duration) -> Result<Option<Self>> {
        let Some(endpoint) = config
            .endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| config.enabled && !e.is_empty())
        else {
            return Ok(None);
        };

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConclaveError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Some(Self {
            endpoint,
            http_client,
        }))
    }
}

#[async_trait]
impl KnowledgeRetriever for HttpKnowledgeRetriever {
    async fn retrieve(&self, request: KnowledgeQuery) -> Result<KnowledgeResult> {
        let response = self
            .http_client
            .post(format!("{}/retrieve", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| ConclaveError::Enrichment(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConclaveError::Enrichment(format!(
                "knowledge service error {status}"
            )));
        }

        response
            .json::<KnowledgeResult>()
            .await
            .map_err(|e| ConclaveError::Enrichment(format!("invalid response: {e}")))
    }
}
