//! Gateway failure type

use thiserror::Error;

/// Shown when the backend gives no usable error text
pub const FALLBACK_MESSAGE: &str = "Failed to get response. Please make sure the backend server is running and your API key is configured.";

/// A failed exchange with the backend.
///
/// Every way a call can go wrong collapses into this one type. `kind` and
/// `cause` are for logs; the transcript only ever sees `user_message()`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{cause}")]
pub struct Failure {
    pub kind: FailureKind,
    /// Text from the backend's `error` field, if it sent one
    pub message: Option<String>,
    /// Diagnostic description for logging
    pub cause: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: Option<String>, cause: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.filter(|m| !m.is_empty()),
            cause: cause.into(),
        }
    }

    pub fn network(cause: impl Into<String>) -> Self {
        Self::new(FailureKind::Network, None, cause)
    }

    pub fn status(code: u16, message: Option<String>) -> Self {
        Self::new(FailureKind::Status(code), message, format!("HTTP {code}"))
    }

    pub fn malformed(message: Option<String>, cause: impl Into<String>) -> Self {
        Self::new(FailureKind::Malformed, message, cause)
    }

    /// Text to put in the transcript
    pub fn user_message(&self) -> &str {
        self.message.as_deref().unwrap_or(FALLBACK_MESSAGE)
    }
}

/// Failure classification, used only for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Backend unreachable or the exchange broke mid-way
    Network,
    /// Non-success HTTP status
    Status(u16),
    /// Success status with a body we could not decode
    Malformed,
}
