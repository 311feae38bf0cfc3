//! # agent-core
//!
//! Core research agent logic: a provider-agnostic LLM abstraction, the
//! `[TOOL_CALL]` text protocol, and single-turn request orchestration.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    RequestOrchestrator                       │
//! │  ┌──────────────┐  ┌─────────────────┐  ┌─────────────────┐  │
//! │  │   Prompt     │  │   LlmProvider   │  │ ToolCallParser  │  │
//! │  │ composition  │──│   (Strategy)    │──│   (extract)     │  │
//! │  └──────────────┘  └─────────────────┘  └─────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets the orchestrator run against the Ollama
//! client in `agent-runtime` or against a fake in tests.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod tool;

pub use error::{AgentError, Result};
pub use orchestrator::{OrchestratorConfig, RequestOrchestrator, ResearchQuery, ResearchResult};
pub use provider::{GenerationRequest, GenerationResult, LlmProvider, ModelInfo, TokenUsage};
pub use tool::{ToolCall, ToolCallParser, ToolSchema};
