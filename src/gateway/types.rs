//! Gateway outcomes and backend wire types

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

/// The backend's answer, rendered verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Result of a health probe
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub api: Option<String>,
}

impl HealthStatus {
    /// One-line summary for the status bar
    pub fn summary(&self) -> String {
        match &self.api {
            Some(api) => format!("{} ({api})", self.status),
            None => self.status.clone(),
        }
    }
}

// Backend wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChatRequest<'a> {
    pub message: &'a str,
    pub session_id: &'a SessionId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChatResponse {
    pub reply: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub error: String,
}

/// Pull the `error` string out of a response body, if there is one
pub(super) fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|parsed| parsed.error)
}
