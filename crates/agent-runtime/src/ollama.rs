//! Ollama Inference Client
//!
//! Implementation of `LlmProvider` for a local Ollama (or Ollama-compatible)
//! endpoint. Every call runs inside its own scoped `ClientSession`.

use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    config::{env_lookup, parse_var, string_var},
    error::{AgentError, Result},
    provider::{GenerationRequest, GenerationResult, LlmProvider, ModelInfo, TokenUsage},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::session::{ClientSession, RawResponse, SessionTracker};

const GENERATE_PATH: &str = "api/generate";
const TAGS_PATH: &str = "api/tags";

/// Ollama client configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Base URL, optionally with a path prefix (e.g. behind a reverse proxy)
    pub base_url: String,

    /// Deadline for one complete request/response exchange
    pub request_timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Sampling temperature
    pub temperature: f32,

    /// Generate requests allowed in flight at once, across all sessions
    pub max_concurrent: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(5),
            temperature: 0.2,
            max_concurrent: 2,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Build from `OLLAMA_*` settings, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let request_timeout = parse_var(&lookup, "OLLAMA_TIMEOUT_SECS")?
            .map_or(defaults.request_timeout, Duration::from_secs);
        let connect_timeout = parse_var(&lookup, "OLLAMA_CONNECT_TIMEOUT_SECS")?
            .map_or(defaults.connect_timeout, Duration::from_secs);

        if request_timeout.is_zero() {
            return Err(AgentError::Config(
                "OLLAMA_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }

        let max_concurrent =
            parse_var(&lookup, "OLLAMA_MAX_CONCURRENT")?.unwrap_or(defaults.max_concurrent);
        if max_concurrent == 0 {
            return Err(AgentError::Config(
                "OLLAMA_MAX_CONCURRENT must be greater than zero".into(),
            ));
        }

        Ok(Self {
            base_url: string_var(&lookup, "OLLAMA_BASE_URL").unwrap_or(defaults.base_url),
            request_timeout,
            connect_timeout,
            temperature: parse_var(&lookup, "OLLAMA_TEMPERATURE")?
                .unwrap_or(defaults.temperature),
            max_concurrent,
        })
    }
}

#[derive(Serialize)]
struct GeneratePayload<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: SamplingOptions,
}

#[derive(Serialize)]
struct SamplingOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<LocalModel>,
}

#[derive(Deserialize)]
struct LocalModel {
    name: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Client for an Ollama inference endpoint
pub struct InferenceClient {
    config: OllamaConfig,
    sessions: Arc<SessionTracker>,
    permits: Arc<Semaphore>,
}

impl InferenceClient {
    pub fn new(config: OllamaConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            config,
            sessions: Arc::new(SessionTracker::new()),
            permits,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(OllamaConfig::from_env()?))
    }

    /// Create with default localhost settings
    pub fn localhost() -> Self {
        Self::new(OllamaConfig::default())
    }

    pub const fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Session acquisition/release counters
    pub const fn sessions(&self) -> &Arc<SessionTracker> {
        &self.sessions
    }

    /// Acquire a scoped session against the configured backend
    pub fn open(&self) -> Result<ClientSession> {
        ClientSession::open(
            &self.config.base_url,
            self.config.connect_timeout,
            self.config.request_timeout,
            self.sessions.clone(),
        )
    }

    /// Run one generation inside an already open session
    pub async fn generate_in(
        &self,
        session: &mut ClientSession,
        request: &GenerationRequest,
    ) -> Result<GenerationResult> {
        request.validate()?;

        let payload = GeneratePayload {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            system: request.system.as_deref(),
            format: request.format.as_deref(),
            options: SamplingOptions {
                temperature: self.config.temperature,
                num_predict: request.max_tokens,
            },
        };

        tracing::debug!(
            session = session.id(),
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Sending generate request"
        );

        // Waiting for a permit is not counted against the request deadline
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AgentError::Connection {
                endpoint: session.endpoint(GENERATE_PATH),
                reason: e.to_string(),
            })?;
        let response = session.post_json(GENERATE_PATH, &payload).await?;
        let result = decode_generation(&response, &request.model)?;

        tracing::debug!(
            session = session.id(),
            output_chars = result.text.len(),
            "Generate request completed"
        );

        Ok(result)
    }
}

#[async_trait]
impl LlmProvider for InferenceClient {
    async fn health_check(&self) -> Result<bool> {
        let mut session = self.open()?;

        match session.get(TAGS_PATH).await {
            Ok(response) if response.is_success() => Ok(true),
            Ok(response) => {
                tracing::warn!(status = response.status, "Ollama health check failed");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let mut session = self.open()?;
        let result = self.generate_in(&mut session, request).await;
        session.close();
        result
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let mut session = self.open()?;
        let response = session.get(TAGS_PATH).await?;
        session.close();

        if !response.is_success() {
            return Err(failure_status(&response));
        }

        let tags: TagsResponse =
            serde_json::from_slice(&response.body).map_err(|e| AgentError::Inference {
                status: None,
                message: format!("unreadable model list: {e}"),
            })?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                size_bytes: m.size,
            })
            .collect())
    }
}

/// Map a non-success response to an inference error, preferring the
/// backend's own `error` message
fn failure_status(response: &RawResponse) -> AgentError {
    let body = String::from_utf8_lossy(&response.body);
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    AgentError::Inference {
        status: Some(response.status),
        message,
    }
}

/// Turn a generate response into a result, leaving the text untouched
fn decode_generation(response: &RawResponse, model: &str) -> Result<GenerationResult> {
    if !response.is_success() {
        return Err(failure_status(response));
    }

    let body = response.text()?;
    let (text, usage) = if response.is_ndjson() {
        decode_ndjson(body)?
    } else {
        let value: Value = serde_json::from_str(body).map_err(|e| AgentError::Inference {
            status: None,
            message: format!("response body is not valid JSON: {e}"),
        })?;
        let text = locate_text(&value).ok_or_else(|| AgentError::Inference {
            status: None,
            message: "response body has no generated text".into(),
        })?;
        (text.to_string(), usage_of(&value))
    };

    Ok(GenerationResult {
        text,
        model: model.to_string(),
        usage,
    })
}

/// Concatenate the `response` fragments of a streamed body
fn decode_ndjson(body: &str) -> Result<(String, Option<TokenUsage>)> {
    let mut text = String::new();
    let mut usage = None;
    let mut produced_text = false;

    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        let chunk: Value = match serde_json::from_str(line) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable NDJSON line");
                continue;
            }
        };

        if let Some(message) = chunk.get("error").and_then(Value::as_str) {
            return Err(AgentError::Inference {
                status: None,
                message: message.to_string(),
            });
        }
        if let Some(fragment) = chunk.get("response").and_then(Value::as_str) {
            text.push_str(fragment);
            produced_text = true;
        }
        if let Some(counts) = usage_of(&chunk) {
            usage = Some(counts);
        }
    }

    if !produced_text {
        return Err(AgentError::Inference {
            status: None,
            message: "response body has no generated text".into(),
        });
    }

    Ok((text, usage))
}

/// Find the generated text in the shapes different backends use
fn locate_text(value: &Value) -> Option<&str> {
    [
        "/response",
        "/message/content",
        "/choices/0/text",
        "/choices/0/message/content",
    ]
    .iter()
    .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
}

fn usage_of(value: &Value) -> Option<TokenUsage> {
    let count = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_u64)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
    };

    match (count("prompt_eval_count"), count("eval_count")) {
        (None, None) => None,
        (prompt, completion) => Some(TokenUsage::new(
            prompt.unwrap_or(0),
            completion.unwrap_or(0),
        )),
    }
}
