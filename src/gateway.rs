//! Conversation gateway
//!
//! One request, one response against the chat backend. Failures are decoded
//! here, once, into a typed `Failure`; callers never look at HTTP details.

mod error;
mod http;
mod types;

pub use error::{Failure, FailureKind, FALLBACK_MESSAGE};
pub use http::HttpGateway;
pub use types::{HealthStatus, Reply};

use crate::session::SessionId;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for chat backends
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Exchange one utterance for one reply. The utterance is already trimmed.
    async fn send(&self, session_id: &SessionId, utterance: &str) -> Result<Reply, Failure>;

    /// Probe backend liveness
    async fn health(&self) -> Result<HealthStatus, Failure>;

    /// Drop the backend's stored history for a session
    async fn clear_history(&self, session_id: &SessionId) -> Result<(), Failure>;

    fn base_url(&self) -> &str;
}

#[async_trait]
impl<T: ChatGateway + ?Sized> ChatGateway for Arc<T> {
    async fn send(&self, session_id: &SessionId, utterance: &str) -> Result<Reply, Failure> {
        (**self).send(session_id, utterance).await
    }

    async fn health(&self) -> Result<HealthStatus, Failure> {
        (**self).health().await
    }

    async fn clear_history(&self, session_id: &SessionId) -> Result<(), Failure> {
        (**self).clear_history(session_id).await
    }

    fn base_url(&self) -> &str {
        (**self).base_url()
    }
}

/// Logging wrapper for gateways
pub struct LoggingGateway<G> {
    inner: G,
}

impl<G: ChatGateway> LoggingGateway<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: ChatGateway> ChatGateway for LoggingGateway<G> {
    async fn send(&self, session_id: &SessionId, utterance: &str) -> Result<Reply, Failure> {
        let start = std::time::Instant::now();
        let result = self.inner.send(session_id, utterance).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    session = %session_id,
                    duration_ms = %duration.as_millis(),
                    reply_chars = reply.text.chars().count(),
                    "Chat request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    session = %session_id,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e,
                    backend_message = e.message.as_deref().unwrap_or(""),
                    "Chat request failed"
                );
            }
        }

        result
    }

    async fn health(&self) -> Result<HealthStatus, Failure> {
        let result = self.inner.health().await;
        match &result {
            Ok(health) => tracing::info!(status = %health.status, "Backend healthy"),
            Err(e) => tracing::warn!(kind = ?e.kind, error = %e, "Health probe failed"),
        }
        result
    }

    async fn clear_history(&self, session_id: &SessionId) -> Result<(), Failure> {
        let result = self.inner.clear_history(session_id).await;
        match &result {
            Ok(()) => tracing::info!(session = %session_id, "Backend history cleared"),
            Err(e) => tracing::warn!(
                session = %session_id,
                kind = ?e.kind,
                error = %e,
                "Failed to clear backend history"
            ),
        }
        result
    }

    fn base_url(&self) -> &str {
        self.inner.base_url()
    }
}
