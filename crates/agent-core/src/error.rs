//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Cannot establish or reuse a session to the inference backend
    #[error("Connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    /// Backend reachable but answered with a failure status or an unusable body
    #[error("Inference error{}: {message}", http_status(.status))]
    Inference { status: Option<u16>, message: String },

    /// No response within the configured deadline
    #[error("Inference timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    /// Parse error (e.g., malformed tool call parameters)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request-level failure wrapping the underlying cause
    #[error("Request failed: {source}")]
    RequestFailed {
        #[source]
        source: Box<AgentError>,
    },

    /// Request violates its invariants (empty prompt, zero max_tokens, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn http_status(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |code| format!(" (HTTP {code})"))
}

impl AgentError {
    /// Wrap an error as a request-level failure
    pub fn request_failed(source: Self) -> Self {
        Self::RequestFailed {
            source: Box::new(source),
        }
    }

    /// The innermost cause, looking through `RequestFailed` wrappers
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::RequestFailed { source } => source.root_cause(),
            other => other,
        }
    }

    /// Check if error is retryable
    ///
    /// Nothing in this workspace retries; this is for caller-supplied wrappers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::Connection { .. } | Self::Timeout { .. }
        )
    }

    /// Whether the caller sent something unusable, as opposed to a backend failure
    pub fn is_client_error(&self) -> bool {
        matches!(self.root_cause(), Self::InvalidRequest(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self.root_cause() {
            Self::Connection { .. } => {
                "The inference service is currently unreachable. Please try again.".into()
            }
            Self::Inference {
                status: Some(code), ..
            } => format!("The inference service returned an error (HTTP {code})."),
            Self::Inference { status: None, .. } => {
                "The inference service returned a response that could not be read.".into()
            }
            Self::Timeout { after } => format!(
                "The inference service did not answer within {}s.",
                after.as_secs()
            ),
            Self::InvalidRequest(msg) => format!("Invalid request: {msg}"),
            Self::Config(_) => "The service is misconfigured.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
