//! HTTP gateway to the chat backend

use super::types::{error_message, ChatRequest, ChatResponse, HealthStatus, Reply};
use super::{ChatGateway, Failure};
use crate::session::SessionId;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

/// Talks to the backend over plain JSON HTTP.
///
/// No timeout is configured; a hung backend keeps the call open until the
/// transport gives up.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Send a request and read the whole body
    async fn execute(request: RequestBuilder) -> Result<String, Failure> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Failure::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                Failure::network(format!("Connection failed: {e}"))
            } else {
                Failure::network(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Failure::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Failure::status(status.as_u16(), error_message(&body)));
        }

        Ok(body)
    }
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn send(&self, session_id: &SessionId, utterance: &str) -> Result<Reply, Failure> {
        let url = format!("{}/api/chat", self.base_url);
        let request = self.client.post(&url).json(&ChatRequest {
            message: utterance,
            session_id,
        });

        let body = Self::execute(request).await?;

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            Failure::malformed(
                error_message(&body),
                format!("Failed to parse response: {e} - body: {body}"),
            )
        })?;

        if let Some(echo) = parsed.session_id.as_deref() {
            if echo != session_id.as_str() {
                tracing::warn!(
                    session = %session_id,
                    echoed = %echo,
                    "Backend echoed a different session id"
                );
            }
        }

        Ok(Reply::new(parsed.reply))
    }

    async fn health(&self) -> Result<HealthStatus, Failure> {
        let url = format!("{}/api/health", self.base_url);
        let body = Self::execute(self.client.get(&url)).await?;
        serde_json::from_str(&body).map_err(|e| {
            Failure::malformed(
                error_message(&body),
                format!("Failed to parse health response: {e}"),
            )
        })
    }

    async fn clear_history(&self, session_id: &SessionId) -> Result<(), Failure> {
        let url = format!("{}/api/chat/history/{}", self.base_url, session_id);
        Self::execute(self.client.delete(&url)).await?;
        Ok(())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
