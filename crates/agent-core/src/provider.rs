//! LLM Provider Strategy Pattern
//!
//! Defines the single-turn generation contract every inference backend
//! implements, so the orchestrator works with any backend (or a test fake)
//! without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{GenerationRequest, LlmProvider};
//!
//! let provider = InferenceClient::new(config);
//! let request = GenerationRequest::new("Why is the sky blue?", "llama3.1", 256)?;
//! let result = provider.generate(&request).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// A single text-generation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Fully composed prompt sent to the model
    pub prompt: String,

    /// Model identifier (e.g., "llama3.1", "mistral")
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Caller-supplied context the prompt was composed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,

    /// System prompt, forwarded separately when the backend supports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Output format hint, e.g. `"json"` for JSON mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl GenerationRequest {
    /// Create a validated request
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> Result<Self> {
        let request = Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens,
            additional_context: None,
            system: None,
            format: None,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Check the request invariants: non-empty prompt and model, positive token limit
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(AgentError::InvalidRequest("prompt must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(AgentError::InvalidRequest("model must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(AgentError::InvalidRequest(
                "max_tokens must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Output of one generation call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The generated text, exactly as the backend returned it
    pub text: String,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Information about a model available on the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new inference backends.
/// The orchestrator works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Check if the provider is reachable and answering
    async fn health_check(&self) -> Result<bool>;

    /// Run one generation call and return the raw output text
    ///
    /// Implementations acquire whatever connection they need for the duration
    /// of the call and release it on every exit path.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        assert!(GenerationRequest::new("hello", "llama3.1", 10).is_ok());

        let empty = GenerationRequest::new("   \n", "llama3.1", 10).unwrap_err();
        assert!(matches!(empty, AgentError::InvalidRequest(_)));

        let zero = GenerationRequest::new("hello", "llama3.1", 0).unwrap_err();
        assert!(zero.to_string().contains("max_tokens"));

        let no_model = GenerationRequest::new("hello", "", 10).unwrap_err();
        assert!(no_model.to_string().contains("model"));
    }

    #[test]
    fn test_request_serialization_skips_absent_fields() {
        let request = GenerationRequest::new("hi", "llama3.1", 5).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["prompt"], "hi");
        assert!(json.get("system").is_none());
        assert!(json.get("additional_context").is_none());
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(12, 30);
        assert_eq!(usage.total_tokens, 42);
    }
}
