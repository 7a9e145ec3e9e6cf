//! Application state for API handlers

use cmp_core::ClusterOrchestrator;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Core orchestrator; every handler goes through it
    pub orchestrator: Arc<ClusterOrchestrator>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(orchestrator: Arc<ClusterOrchestrator>) -> Self {
        Self {
            orchestrator,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (chrono::Utc::now() - self.started_at).num_seconds();

        match secs {
            s if s < 60 => format!("{}s", s),
            s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
            s if s < 86400 => format!("{}h {}m", s / 3600, (s % 3600) / 60),
            s => format!("{}d {}h", s / 86400, (s % 86400) / 3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmp_backend::SimulatedBackend;
    use cmp_core::InMemoryStore;

    fn state() -> AppState {
        AppState::new(Arc::new(ClusterOrchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(SimulatedBackend::new()),
        )))
    }

    #[test]
    fn test_uptime_formatting() {
        let mut state = state();
        assert!(state.uptime().ends_with('s'));

        state.started_at = chrono::Utc::now() - chrono::Duration::seconds(3725);
        assert_eq!(state.uptime(), "1h 2m");

        state.started_at = chrono::Utc::now() - chrono::Duration::seconds(90000);
        assert_eq!(state.uptime(), "1d 1h");
    }
}
