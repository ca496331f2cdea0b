//! Configuration for the coordinator.
//!
//! # Security
//!
//! - Config file permission validation on Unix systems
//! - Rejects world-readable files containing API keys
//! - Warns about API keys stored in config files

use conclave_common::{AgentDescriptor, AgentTier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Main coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Agent used when nothing else can be selected
    #[serde(default = "default_agent")]
    pub default_agent: String,

    /// Statically registered agents and their capabilities
    #[serde(default)]
    pub agents: Vec<AgentConfig>,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub agent_service: AgentServiceConfig,

    /// Prompt key overrides, keyed by `"agent_id:category"`
    #[serde(default)]
    pub prompts: HashMap<String, String>,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_agent() -> String {
    "general-advisor".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,

    /// Capability tags (for selection decisions)
    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub tier: AgentTier,

    /// HTTP endpoint overriding the shared agent service for this agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl AgentConfig {
    pub fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            id: self.id.clone(),
            capabilities: self.capabilities.clone(),
            tier: self.tier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// How long a fetched agent list stays valid
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    300
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Largest confidence increase enrichment may add (never above 0.1)
    #[serde(default = "default_max_boost")]
    pub max_boost: f32,

    /// Knowledge retrieval service endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_max_results() -> usize {
    5
}

fn default_max_boost() -> f32 {
    0.1
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_results: default_max_results(),
            max_boost: default_max_boost(),
            endpoint: None,
        }
    }
}

impl EnrichmentConfig {
    pub fn effective_max_boost(&self) -> f32 {
        self.max_boost.clamp(0.0, 0.1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Maximum retained performance records
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Classification latency target in milliseconds
    #[serde(default = "default_classification_target")]
    pub classification_target_ms: f64,
}

fn default_capacity() -> usize {
    1000
}

fn default_classification_target() -> f64 {
    50.0
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            classification_target_ms: default_classification_target(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentServiceConfig {
    /// Base URL of the agent invocation service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// API key for authentication.
    /// If not set, `CONCLAVE_AGENT_API_KEY` is read from the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_timeout() -> u64 {
    30000
}

impl Default for AgentServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_timeout(),
            api_key: None,
        }
    }
}

impl AgentServiceConfig {
    /// Resolve the API key from config, then `CONCLAVE_AGENT_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }

        std::env::var("CONCLAVE_AGENT_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_agent: default_agent(),
            agents: Vec::new(),
            registry: RegistryConfig::default(),
            enrichment: EnrichmentConfig::default(),
            tracker: TrackerConfig::default(),
            agent_service: AgentServiceConfig::default(),
            prompts: HashMap::new(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// On Unix systems the file must be a regular file, must not be
    /// world-writable, and must not be world-readable if it holds an API key.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        validate_config_file_permissions(path)?;

        let config = Self::from_file_unchecked(path)?;

        if config.agent_service.api_key.is_some() {
            warn!(
                "API key found in config file '{}'. For better security, \
                 use the CONCLAVE_AGENT_API_KEY environment variable instead.",
                path.display()
            );
        }

        Ok(config)
    }

    /// Load configuration from a TOML file without permission checks.
    pub fn from_file_unchecked(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.agents.iter().map(AgentConfig::descriptor).collect()
    }
}

#[cfg(unix)]
fn validate_config_file_permissions(path: &std::path::Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::symlink_metadata(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

    if !metadata.is_file() {
        anyhow::bail!(
            "Config path '{}' is not a regular file. Symlinks and directories are not allowed.",
            path.display()
        );
    }

    let permission_bits = metadata.permissions().mode() & 0o777;

    if permission_bits & 0o002 != 0 {
        anyhow::bail!(
            "Config file '{}' is world-writable (mode {:04o}). Fix with: chmod o-w {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    let content = std::fs::read_to_string(path)?;
    let has_api_key = content.contains("api_key");

    if has_api_key && permission_bits & 0o004 != 0 {
        anyhow::bail!(
            "Config file '{}' contains an API key but is world-readable (mode {:04o}). \
             Fix with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    if has_api_key && permission_bits & 0o040 != 0 {
        warn!(
            "Config file '{}' contains an API key and is group-readable (mode {:04o}). \
             Consider restricting access with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    Ok(())
}
