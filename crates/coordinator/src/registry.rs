//! Agent capability registry with a TTL cache.

use async_trait::async_trait;
use conclave_common::{AgentDescriptor, AgentTier, ComplianceGate, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The agent set used when the registry is empty or unreachable.
pub fn default_agents() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor::new(
            "regulatory-strategist",
            &["regulatory", "compliance", "submission", "fda"],
        )
        .with_tier(AgentTier::Core),
        AgentDescriptor::new(
            "clinical-strategist",
            &["clinical", "trial design", "endpoint", "biostatistics"],
        )
        .with_tier(AgentTier::Core),
        AgentDescriptor::new(
            "general-advisor",
            &["general", "research", "strategy", "analysis"],
        )
        .with_tier(AgentTier::Core),
    ]
}

/// Compliance gate backed by the `[[agents]]` entries of the configuration.
pub struct ConfiguredComplianceGate {
    agents: Vec<AgentDescriptor>,
}

impl ConfiguredComplianceGate {
    pub fn new(agents: Vec<AgentDescriptor>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl ComplianceGate for ConfiguredComplianceGate {
    async fn agents(&self) -> Result<Vec<AgentDescriptor>> {
        Ok(self.agents.clone())
    }
}

struct CachedAgents {
    fetched_at: Instant,
    agents: Arc<Vec<AgentDescriptor>>,
}

/// Caches normalized descriptors fetched from a [`ComplianceGate`].
///
/// Concurrent refreshes may race; the fetch is idempotent so the last write wins.
pub struct AgentRegistry {
    gate: Arc<dyn ComplianceGate>,
    ttl: Duration,
    cache: RwLock<Option<CachedAgents>>,
    defaults: Arc<Vec<AgentDescriptor>>,
}

impl AgentRegistry {
    pub fn new(gate: Arc<dyn ComplianceGate>, ttl: Duration) -> Self {
        Self {
            gate,
            ttl,
            cache: RwLock::new(None),
            defaults: Arc::new(default_agents()),
        }
    }

    pub fn gate(&self) -> &Arc<dyn ComplianceGate> {
        &self.gate
    }

    /// Drop the cached agent list so the next lookup refetches.
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }

    /// Current agent set: cached, freshly fetched, or the default set.
    pub async fn agents(&self) -> Arc<Vec<AgentDescriptor>> {
        let fresh = self
            .cache
            .read()
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.agents.clone());
        if let Some(agents) = fresh {
            return agents;
        }

        match self.gate.agents().await {
            Ok(raw) => {
                let agents = ingest(raw);
                if agents.is_empty() {
                    warn!("Agent registry returned no usable agents, using default set");
                    return self.defaults.clone();
                }

                debug!(agent_count = agents.len(), "Refreshed agent registry");
                let agents = Arc::new(agents);
                *self.cache.write() = Some(CachedAgents {
                    fetched_at: Instant::now(),
                    agents: agents.clone(),
                });
                agents
            }
            Err(e) => {
                warn!(error = %e, "Agent registry unavailable, using default set");
                self.defaults.clone()
            }
        }
    }
}

/// Normalize raw descriptors once; blank ids are dropped and the first
/// occurrence of a duplicate id wins.
fn ingest(raw: Vec<AgentDescriptor>) -> Vec<AgentDescriptor> {
    let mut agents: Vec<AgentDescriptor> = Vec::with_capacity(raw.len());
    for descriptor in raw.into_iter().filter_map(AgentDescriptor::normalize) {
        if !agents.iter().any(|a| a.id == descriptor.id) {
            agents.push(descriptor);
        }
    }
    agents
}
