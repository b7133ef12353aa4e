//! Shared application state for the axum server.

use std::sync::Arc;

use crewline_core::crew::CrewStore;
use crewline_core::run::InputBroker;
use crewline_core::runner::AgentRunner;

/// Shared state accessible by all API handlers.
///
/// The input broker is the only resource shared across runs; it is injected
/// here (and from here into each run) rather than reached through a global.
pub struct AppStateInner {
    pub crew_store: CrewStore,
    pub broker: Arc<InputBroker>,
    pub runner: Arc<dyn AgentRunner>,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(crew_store: CrewStore, runner: Arc<dyn AgentRunner>) -> Self {
        Self {
            crew_store,
            broker: Arc::new(InputBroker::new()),
            runner,
        }
    }
}
