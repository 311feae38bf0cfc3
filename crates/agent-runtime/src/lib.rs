//! # agent-runtime
//!
//! Runtime inference clients for the research agent.
//!
//! ## Providers
//!
//! - **Ollama** (default): Local LLM inference via Ollama's `/api/generate`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{InferenceClient, OllamaConfig};
//!
//! let client = Arc::new(InferenceClient::new(OllamaConfig::from_env()?));
//! let orchestrator = RequestOrchestrator::with_defaults(client);
//! ```

pub mod session;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{InferenceClient, OllamaConfig};

pub use session::{ClientSession, SessionTracker};

// Re-export core types for convenience
pub use agent_core::{
    AgentError, GenerationRequest, GenerationResult, LlmProvider, RequestOrchestrator, Result,
    ToolCall,
};
