//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{health_check, list_models, research_handler};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))
        // Agent API
        .route("/api/research", post(research_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use agent_core::{
        AgentError, GenerationRequest, GenerationResult, LlmProvider, ModelInfo,
        OrchestratorConfig, RequestOrchestrator, Result,
    };
    use agent_runtime::SessionTracker;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    enum Reply {
        Text(&'static str),
        Fail(fn() -> AgentError),
    }

    struct FakeProvider {
        reply: Reply,
        healthy: bool,
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        async fn health_check(&self) -> Result<bool> {
            Ok(self.healthy)
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
            match &self.reply {
                Reply::Text(text) => Ok(GenerationResult {
                    text: (*text).to_string(),
                    model: request.model.clone(),
                    usage: None,
                }),
                Reply::Fail(make) => Err(make()),
            }
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            if self.healthy {
                Ok(vec![ModelInfo {
                    id: "llama3.1:latest".into(),
                    name: "llama3.1:latest".into(),
                    size_bytes: None,
                }])
            } else {
                Err(AgentError::Connection {
                    endpoint: "http://localhost:11434/api/tags".into(),
                    reason: "connection refused".into(),
                })
            }
        }
    }

    fn app(reply: Reply, healthy: bool) -> Router {
        let provider: Arc<dyn LlmProvider> = Arc::new(FakeProvider { reply, healthy });
        let orchestrator = RequestOrchestrator::new(provider.clone(), OrchestratorConfig::default());

        router(AppState {
            provider,
            orchestrator: Arc::new(orchestrator),
            sessions: Some(Arc::new(SessionTracker::new())),
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn research(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/research")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_research_returns_text_and_model() {
        let app = app(Reply::Text("Trail runners work well."), true);

        let (status, body) = send(app, research(json!({"query": "Best shoes?"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "Trail runners work well.");
        assert_eq!(body["model"], "llama3.1");
        assert!(body.get("tool_call").is_none());
    }

    #[tokio::test]
    async fn test_research_reports_tool_call() {
        let app = app(
            Reply::Text(
                "Checking.\n[TOOL_CALL]\nTool: search\nParameters: {\"q\": \"shoes\"}\n[/TOOL_CALL]",
            ),
            true,
        );

        let (status, body) = send(
            app,
            research(json!({"query": "Find shoes", "model": "mistral", "max_tokens": 50})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model"], "mistral");
        assert_eq!(body["tool_call"]["tool_name"], "search");
        assert_eq!(body["tool_call"]["parameters"]["q"], "shoes");
    }

    #[tokio::test]
    async fn test_empty_query_is_bad_request() {
        let app = app(Reply::Text("unused"), true);

        let (status, body) = send(app, research(json!({"query": "   "}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_backend_failure_is_wrapped() {
        let app = app(
            Reply::Fail(|| AgentError::Connection {
                endpoint: "http://localhost:11434/api/generate".into(),
                reason: "connection refused".into(),
            }),
            false,
        );

        let (status, body) = send(app, research(json!({"query": "Best shoes?"}))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "RESEARCH_FAILED");
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("Failed to process research request: "));
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let app = app(Reply::Text("unused"), true);
        let request = Request::builder()
            .method("POST")
            .uri("/api/research")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"context\": 1}"))
            .unwrap();

        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INVALID_REQUEST");
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

        let not_json = Request::builder()
            .method("POST")
            .uri("/api/research")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"query\": "))
            .unwrap();
        let (status, body) = send(app, not_json).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_health_reports_backend_and_sessions() {
        let (status, body) = send(app(Reply::Text(""), true), get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["ollama_connected"], true);
        assert_eq!(body["active_sessions"], 0);

        let (_, body) = send(app(Reply::Text(""), false), get_request("/health")).await;
        assert_eq!(body["ollama_connected"], false);
    }

    #[tokio::test]
    async fn test_models_listing() {
        let (status, body) = send(app(Reply::Text(""), true), get_request("/api/models")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "llama3.1:latest");

        let (status, body) = send(app(Reply::Text(""), false), get_request("/api/models")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "MODELS_UNAVAILABLE");
    }
}
