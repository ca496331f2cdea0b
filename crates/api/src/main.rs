//! Conclave API server binary.
//!
//! Usage:
//!   conclave-api --config config.toml
//!   conclave-api --config config.toml --port 8080 --bind 0.0.0.0
//!
//! # Environment Variables
//!
//! - `CONCLAVE_BIND_ADDR` - Server bind address (default: 127.0.0.1)
//! - `CONCLAVE_AGENT_API_KEY` - Bearer key for the agent service
//! - `RUST_LOG` - Log filter

use clap::Parser;
use conclave_api::{serve, AppState, HttpAgentInvoker, HttpKnowledgeRetriever};
use conclave_coordinator::metrics::log_event;
use conclave_coordinator::{ChannelMetricsSink, Coordinator, CoordinatorConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "conclave-api")]
#[command(about = "Multi-agent query orchestration server")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Bind address
    #[arg(short, long, env = "CONCLAVE_BIND_ADDR", default_value = "127.0.0.1")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,conclave_api=debug,conclave_coordinator=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if cli.bind == "0.0.0.0" {
        tracing::warn!(
            "Server binding to 0.0.0.0 exposes the API to all network interfaces. \
             Ensure a firewall or authenticating proxy is in place."
        );
    }

    let config = if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "Loading configuration");
        CoordinatorConfig::from_file(path)?
    } else {
        tracing::info!("Using default configuration");
        CoordinatorConfig::default()
    };

    let invoker = HttpAgentInvoker::from_config(&config.agent_service)?;
    let knowledge = HttpKnowledgeRetriever::from_config(
        &config.enrichment,
        Duration::from_millis(config.agent_service.timeout_ms),
    )?;

    let (metrics, mut events) = ChannelMetricsSink::channel(config.metrics.queue_capacity);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let mut builder = Coordinator::builder(config)
        .invoker(Arc::new(invoker))
        .metrics(Arc::new(metrics));
    if let Some(knowledge) = knowledge {
        tracing::info!("Knowledge enrichment enabled");
        builder = builder.knowledge(Arc::new(knowledge));
    }
    let coordinator = builder.build()?;

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    serve(Arc::new(AppState::new(coordinator)), addr).await?;

    Ok(())
}
