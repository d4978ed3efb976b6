//! Server application state shared across handlers

use crate::config::ThinkGymConfig;
use crate::engine::EngineRunner;
use crate::shutdown::ShutdownState;
use std::sync::Arc;

/// Shared state for the server. Cloned into every handler; everything
/// request-scoped lives in the handlers themselves.
#[derive(Clone)]
pub struct ServerAppState {
    /// Effective configuration after merging all layers
    pub config: Arc<ThinkGymConfig>,

    /// Engine runner (command, timeout, concurrency bound)
    pub engine: Arc<EngineRunner>,

    /// Shutdown state
    pub shutdown_state: ShutdownState,
}

impl ServerAppState {
    /// Create a new server application state from the effective configuration
    pub fn new(config: ThinkGymConfig, shutdown_state: ShutdownState) -> Self {
        let engine = Arc::new(EngineRunner::new(&config.engine));
        Self {
            config: Arc::new(config),
            engine,
            shutdown_state,
        }
    }
}
