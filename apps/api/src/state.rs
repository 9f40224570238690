use std::sync::Arc;

use crate::config::Config;
use crate::tracker::Tracker;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// One tracker for the process, so partition locks are shared by all requests.
    pub tracker: Arc<Tracker>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let tracker = Arc::new(Tracker::xlsx(config.tracker_settings()));
        Self { config, tracker }
    }
}
