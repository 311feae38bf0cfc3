//! Server Configuration

use agent_core::{
    OrchestratorConfig, Result,
    config::{env_lookup, string_var},
};
use agent_runtime::OllamaConfig;

/// Everything the server needs at startup
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listener address
    pub bind_addr: String,

    /// Inference backend connection settings
    pub ollama: OllamaConfig,

    /// Model defaults and system prompt
    pub orchestrator: OrchestratorConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            bind_addr: string_var(&lookup, "BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".into()),
            ollama: OllamaConfig::from_lookup(&lookup)?,
            orchestrator: OrchestratorConfig::from_lookup(&lookup)?,
        })
    }
}
