//! Request Orchestration
//!
//! One request/response cycle: compose the prompt, run a single generation
//! through the provider, and look for a tool call in the output. There is no
//! loop; a tool call is handed back to the caller, not executed.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{parse_var, string_var};
use crate::error::{AgentError, Result};
use crate::provider::{GenerationRequest, LlmProvider};
use crate::tool::{ToolCall, ToolCallParser, ToolSchema, tool_instructions};

/// Orchestrator configuration
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Model used when a query does not name one
    pub default_model: String,

    /// Token limit used when a query does not set one
    pub default_max_tokens: u32,

    /// Optional system prompt forwarded with every request
    pub system_prompt: Option<String>,

    /// Tools announced to the model in the system prompt
    pub tools: Vec<ToolSchema>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_model: "llama3.1".into(),
            default_max_tokens: 1000,
            system_prompt: None,
            tools: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Build from `DEFAULT_MODEL`, `DEFAULT_MAX_TOKENS`, `SYSTEM_PROMPT` and
    /// `TOOLS_FILE`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let default_max_tokens = parse_var(&lookup, "DEFAULT_MAX_TOKENS")?
            .unwrap_or(defaults.default_max_tokens);
        if default_max_tokens == 0 {
            return Err(AgentError::Config(
                "DEFAULT_MAX_TOKENS must be greater than zero".into(),
            ));
        }

        Ok(Self {
            default_model: string_var(&lookup, "DEFAULT_MODEL").unwrap_or(defaults.default_model),
            default_max_tokens,
            system_prompt: string_var(&lookup, "SYSTEM_PROMPT"),
            tools: match string_var(&lookup, "TOOLS_FILE") {
                Some(path) => load_tools(Path::new(path.trim()))?,
                None => defaults.tools,
            },
        })
    }
}

/// Read tool declarations from a JSON file holding an array of [`ToolSchema`]
pub fn load_tools(path: &Path) -> Result<Vec<ToolSchema>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AgentError::Config(format!("TOOLS_FILE {}: {e}", path.display())))?;

    let tools: Vec<ToolSchema> = serde_json::from_str(&raw)
        .map_err(|e| AgentError::Config(format!("TOOLS_FILE {}: {e}", path.display())))?;

    tracing::debug!(count = tools.len(), path = %path.display(), "Loaded tool declarations");
    Ok(tools)
}

/// A research query as received from the routing layer
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResearchQuery {
    pub query: String,
    #[serde(default)]
    pub additional_context: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Outcome of one research request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    /// Raw model output
    pub result_text: String,

    /// Tool call found in the output, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,

    /// Model that produced the output
    pub model: String,
}

/// Build the prompt sent to the model
///
/// Context is appended under an "Additional context:" label; an empty
/// context counts as absent.
pub fn compose_prompt(query: &str, additional_context: Option<&str>) -> String {
    match additional_context {
        Some(context) if !context.is_empty() => {
            format!("{query}\n\nAdditional context:\n{context}")
        }
        _ => query.to_string(),
    }
}

/// Coordinates prompt composition, generation and tool call extraction
pub struct RequestOrchestrator {
    provider: Arc<dyn LlmProvider>,
    config: OrchestratorConfig,
}

impl RequestOrchestrator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: OrchestratorConfig) -> Self {
        Self { provider, config }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>) -> Self {
        Self::new(provider, OrchestratorConfig::default())
    }

    /// Full system prompt including tool declarations
    fn system_prompt(&self) -> Option<String> {
        let tools = tool_instructions(&self.config.tools);

        match (&self.config.system_prompt, tools.is_empty()) {
            (None, true) => None,
            (Some(base), true) => Some(base.clone()),
            (None, false) => Some(tools),
            (Some(base), false) => Some(format!("{base}\n\n{tools}")),
        }
    }

    /// Handle one request
    ///
    /// Invalid input fails with [`AgentError::InvalidRequest`] before anything
    /// is sent. Provider failures come back wrapped in
    /// [`AgentError::RequestFailed`].
    pub async fn handle(
        &self,
        query: &str,
        additional_context: Option<&str>,
        model: &str,
        max_tokens: u32,
    ) -> Result<ResearchResult> {
        if query.trim().is_empty() {
            return Err(AgentError::InvalidRequest("query must not be empty".into()));
        }

        let prompt = compose_prompt(query, additional_context);
        let mut request = GenerationRequest::new(prompt, model, max_tokens)?;
        request.additional_context = additional_context.map(ToString::to_string);
        request.system = self.system_prompt();

        tracing::debug!(model, max_tokens, "Generating research response");

        let generation = self
            .provider
            .generate(&request)
            .await
            .map_err(AgentError::request_failed)?;

        let tool_call = ToolCallParser::extract(&generation.text);
        if let Some(call) = &tool_call {
            tracing::info!(tool = %call.tool_name, "Model requested a tool call");
        }

        Ok(ResearchResult {
            result_text: generation.text,
            tool_call,
            model: generation.model,
        })
    }

    /// Handle a query, filling omitted fields from the configured defaults
    pub async fn handle_query(&self, query: &ResearchQuery) -> Result<ResearchResult> {
        let model = query
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);
        let max_tokens = query.max_tokens.unwrap_or(self.config.default_max_tokens);

        self.handle(
            &query.query,
            query.additional_context.as_deref(),
            model,
            max_tokens,
        )
        .await
    }

    /// Get the provider
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}
