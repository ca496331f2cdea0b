//! Non-blocking metric event sinks.

use conclave_common::{MetricEvent, MetricsSink};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

/// Forwards events to a bounded queue. Drops events when the queue is full or closed.
pub struct ChannelMetricsSink {
    sender: mpsc::Sender<MetricEvent>,
}

impl ChannelMetricsSink {
    pub fn new(sender: mpsc::Sender<MetricEvent>) -> Self {
        Self { sender }
    }

    /// Create a sink and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MetricEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl MetricsSink for ChannelMetricsSink {
    fn emit(&self, event: MetricEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(request_id = %event.request_id(), "Metrics queue full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                warn!(request_id = %event.request_id(), "Metrics queue closed, dropping event");
            }
        }
    }
}

/// Logs every event at info level.
#[derive(Debug, Clone, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn emit(&self, event: MetricEvent) {
        log_event(&event);
    }
}

/// Structured log line for one event.
pub fn log_event(event: &MetricEvent) {
    match event {
        MetricEvent::OrchestrationStarted {
            request_id,
            query_chars,
        } => info!(request_id = %request_id, query_chars, "orchestration started"),
        MetricEvent::DecisionMade {
            request_id,
            category,
            primary_agent,
            collaborators,
            collaboration_type,
        } => info!(
            request_id = %request_id,
            category = %category,
            primary = %primary_agent,
            collaborators = ?collaborators,
            collaboration = %collaboration_type,
            "orchestration decision"
        ),
        MetricEvent::OrchestrationCompleted {
            request_id,
            agents,
            total_ms,
            confidence,
            fallback,
        } => info!(
            request_id = %request_id,
            agents = ?agents,
            total_ms,
            confidence,
            fallback,
            "orchestration completed"
        ),
    }
}
