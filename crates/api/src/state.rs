//! Application state for the API server.

use conclave_coordinator::Coordinator;
use std::sync::Arc;

/// Shared application state for the API server.
pub struct AppState {
    /// The coordinator that answers every query
    pub coordinator: Arc<Coordinator>,

    /// Server start time (for health checks)
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            start_time: std::time::Instant::now(),
        }
    }

    /// Get the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
