//! Application State

use std::sync::Arc;

use agent_core::{LlmProvider, RequestOrchestrator};
use agent_runtime::SessionTracker;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Inference backend (Ollama, etc.)
    pub provider: Arc<dyn LlmProvider>,

    /// Request orchestrator built on `provider`
    pub orchestrator: Arc<RequestOrchestrator>,

    /// Session counters of the inference client, when it exposes them
    pub sessions: Option<Arc<SessionTracker>>,
}
