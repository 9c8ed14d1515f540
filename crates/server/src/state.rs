use std::sync::Arc;

use bankrot_core::{Config, PollStats, PollStatus, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    stats: Arc<PollStats>,
    polling: bool,
}

impl AppState {
    /// `polling` is false in endpoint-only mode, when the lot source is disabled.
    pub fn new(config: Config, stats: Arc<PollStats>, polling: bool) -> Self {
        Self {
            config,
            stats,
            polling,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn poll_status(&self) -> PollStatus {
        self.stats.snapshot()
    }

    pub fn polling(&self) -> bool {
        self.polling
    }
}
