//! Scoped Client Sessions
//!
//! A `ClientSession` owns a dedicated HTTP connection pool for one logical
//! operation. It is released by `close()` or on drop, whichever happens
//! first, and every release is recorded exactly once in the shared
//! `SessionTracker`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use agent_core::error::{AgentError, Result};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

/// Counts session acquisitions and releases
#[derive(Debug, Default)]
pub struct SessionTracker {
    opened: AtomicU64,
    released: AtomicU64,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acquisition, returning the new session's id
    fn acquire(&self) -> u64 {
        self.opened.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    /// Sessions opened so far
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions released so far
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Sessions currently holding a connection pool
    pub fn active(&self) -> u64 {
        self.opened().saturating_sub(self.released())
    }
}

/// A fully received HTTP response
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body decoded as UTF-8
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body).map_err(|e| AgentError::Inference {
            status: None,
            message: format!("response body is not valid UTF-8: {e}"),
        })
    }

    /// Whether the body is newline-delimited JSON
    pub fn is_ndjson(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/x-ndjson"))
    }
}

/// Exclusively owned network session for one scoped operation
pub struct ClientSession {
    id: u64,
    http: Option<reqwest::Client>,
    base_url: String,
    request_timeout: Duration,
    tracker: Arc<SessionTracker>,
}

impl ClientSession {
    /// Acquire a session
    ///
    /// No connection is made here; an unreachable backend shows up on the
    /// first request.
    pub(crate) fn open(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
        tracker: Arc<SessionTracker>,
    ) -> Result<Self> {
        reqwest::Url::parse(base_url)
            .map_err(|e| AgentError::Config(format!("invalid base URL '{base_url}': {e}")))?;

        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AgentError::Connection {
                endpoint: base_url.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let id = tracker.acquire();
        tracing::debug!(session = id, endpoint = base_url, "Opened inference session");

        Ok(Self {
            id,
            http: Some(http),
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
            tracker,
        })
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn is_open(&self) -> bool {
        self.http.is_some()
    }

    /// Absolute URL for a backend route
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a backend route
    pub async fn get(&mut self, path: &str) -> Result<RawResponse> {
        let url = self.endpoint(path);
        let request = self.client(&url)?.get(&url);
        self.exchange(url, request).await
    }

    /// POST a JSON body to a backend route
    pub async fn post_json<T: Serialize + ?Sized>(
        &mut self,
        path: &str,
        body: &T,
    ) -> Result<RawResponse> {
        let url = self.endpoint(path);
        let request = self.client(&url)?.post(&url).json(body);
        self.exchange(url, request).await
    }

    fn client(&self, url: &str) -> Result<&reqwest::Client> {
        self.http.as_ref().ok_or_else(|| AgentError::Connection {
            endpoint: url.to_string(),
            reason: "session is closed".into(),
        })
    }

    /// Send and read the whole body under the request deadline
    ///
    /// On expiry the session is closed and cannot be reused.
    async fn exchange(
        &mut self,
        url: String,
        request: reqwest::RequestBuilder,
    ) -> Result<RawResponse> {
        let deadline = self.request_timeout;

        match tokio::time::timeout(deadline, read_response(request)).await {
            Ok(Ok(response)) => Ok(response),
            // A connect timeout reports both flags; it is a connection failure
            Ok(Err(e)) if e.is_connect() => Err(AgentError::Connection {
                endpoint: url,
                reason: e.to_string(),
            }),
            Ok(Err(e)) if e.is_timeout() => Err(self.expire(&url, deadline)),
            Ok(Err(e)) if e.is_request() => Err(AgentError::Connection {
                endpoint: url,
                reason: e.to_string(),
            }),
            Ok(Err(e)) => Err(AgentError::Inference {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }),
            Err(_) => Err(self.expire(&url, deadline)),
        }
    }

    fn expire(&mut self, url: &str, after: Duration) -> AgentError {
        tracing::warn!(session = self.id, endpoint = url, "Inference request timed out");
        self.close();
        AgentError::Timeout { after }
    }

    /// Release the connection pool; calling again is a no-op
    pub fn close(&mut self) {
        if self.http.take().is_some() {
            self.tracker.release();
            tracing::debug!(session = self.id, "Closed inference session");
        }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

async fn read_response(request: reqwest::RequestBuilder) -> reqwest::Result<RawResponse> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?.to_vec();

    Ok(RawResponse {
        status,
        content_type,
        body,
    })
}
