//! research-agent HTTP Server
//!
//! Axum-based server exposing a single-shot research endpoint backed by a
//! local Ollama instance.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{LlmProvider, RequestOrchestrator};
use agent_runtime::InferenceClient;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;

    // Initialize inference client
    let client = Arc::new(InferenceClient::new(config.ollama.clone()));
    let sessions = client.sessions().clone();

    // Verify Ollama connection
    match client.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to Ollama at {}", config.ollama.base_url);
            if let Ok(models) = client.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama not available - research requests will fail");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    tracing::info!(
        "Default model: {} (max_tokens {})",
        config.orchestrator.default_model,
        config.orchestrator.default_max_tokens
    );

    tracing::info!("Declared {} tools:", config.orchestrator.tools.len());
    for tool in &config.orchestrator.tools {
        tracing::info!("  • {}", tool.name);
    }

    let provider: Arc<dyn LlmProvider> = client;
    let orchestrator = RequestOrchestrator::new(provider.clone(), config.orchestrator);

    // Build application state
    let state = AppState {
        provider,
        orchestrator: Arc::new(orchestrator),
        sessions: Some(sessions),
    };

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 research-agent server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health        - Health check");
    tracing::info!("  GET  /api/models    - List available models");
    tracing::info!("  POST /api/research  - Run a research query");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
