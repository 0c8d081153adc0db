//! Transcript store
//!
//! Owns the ordered message list and the id counter; nothing else mutates
//! them. Its pending flag tracks the last append only. Whether a call is
//! outstanding is decided by the in-flight ticket on `ChatState`, which wins
//! when a reply from before a reset lands under the append policy.


use chrono::{DateTime, Utc};
use thiserror::Error;

/// Seed message shown at startup and after every reset
pub const GREETING: &str = "Hello! I'm JENNIE. How can I help you today?";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// A single transcript entry, immutable once appended
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Set only on bot messages produced from a failed gateway call
    pub is_error: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is still pending")]
    Pending,
}

/// Ordered message list plus the pending flag
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
    pending: bool,
}

impl Transcript {
    /// Create a transcript holding only the greeting
    pub fn new() -> Self {
        let mut transcript = Self {
            messages: Vec::new(),
            next_id: 1,
            pending: false,
        };
        transcript.seed();
        transcript
    }

    /// Append a user message and mark the transcript pending.
    ///
    /// The stored text is the caller's text unchanged; only the emptiness check
    /// looks at the trimmed form.
    pub fn append_user_message(&mut self, text: &str) -> Result<Message, TranscriptError> {
        if text.trim().is_empty() {
            return Err(TranscriptError::EmptyMessage);
        }
        if self.pending {
            return Err(TranscriptError::Pending);
        }
        let message = self.push(text, Sender::User, false);
        self.pending = true;
        Ok(message)
    }

    /// Append a bot message and clear the pending flag
    pub fn append_bot_message(&mut self, text: &str, is_error: bool) -> Message {
        let message = self.push(text, Sender::Bot, is_error);
        self.pending = false;
        message
    }

    /// Replace everything with a fresh greeting; ids restart at 1
    pub fn reset(&mut self) {
        self.messages.clear();
        self.next_id = 1;
        self.pending = false;
        self.seed();
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Set by a user append, cleared by a bot append or reset.
    /// `ChatState::is_pending` is what observers see.
    #[allow(dead_code)] // Query used by tests
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)] // Query used by tests
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn seed(&mut self) {
        self.push(GREETING, Sender::Bot, false);
    }

    fn push(&mut self, text: &str, sender: Sender, is_error: bool) -> Message {
        let message = Message {
            id: self.next_id,
            text: text.to_string(),
            sender,
            timestamp: Utc::now(),
            is_error,
        };
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
