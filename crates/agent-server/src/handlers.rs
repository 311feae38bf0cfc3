//! HTTP Handlers

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use agent_core::{AgentError, ModelInfo, ResearchQuery, ToolCall};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ollama_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_sessions: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub additional_context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub result: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ollama_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ollama_connected,
        active_sessions: state.sessions.as_ref().map(|s| s.active()),
    })
}

/// List models available on the inference backend
pub async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelInfo>>, ApiError> {
    state.provider.list_models().await.map(Json).map_err(|e| {
        tracing::warn!("Model listing failed: {}", e);
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            e.user_message(),
            "MODELS_UNAVAILABLE",
        )
    })
}

/// Research endpoint: one LLM call, optional tool call in the answer
pub async fn research_handler(
    State(state): State<AppState>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<Json<ResearchResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!("Rejected research request body: {}", rejection.body_text());
        api_error(rejection.status(), rejection.body_text(), "INVALID_REQUEST")
    })?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("research", %request_id);

    let query = ResearchQuery {
        query: payload.query,
        additional_context: payload.additional_context,
        model: payload.model,
        max_tokens: payload.max_tokens,
    };

    async move {
        tracing::info!(query = %query.query, "Processing research request");

        let result = state
            .orchestrator
            .handle_query(&query)
            .await
            .map_err(research_error)?;

        tracing::info!(
            tool_call = result.tool_call.is_some(),
            "Research request completed"
        );

        Ok(Json(ResearchResponse {
            result: result.result_text,
            model: result.model,
            tool_call: result.tool_call,
        }))
    }
    .instrument(span)
    .await
}

fn research_error(e: AgentError) -> ApiError {
    if e.is_client_error() {
        tracing::warn!("Rejected research request: {}", e);
        return api_error(StatusCode::BAD_REQUEST, e.user_message(), "INVALID_REQUEST");
    }

    tracing::error!("Error processing research request: {}", e);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to process research request: {}", e.user_message()),
        "RESEARCH_FAILED",
    )
}
