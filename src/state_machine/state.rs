//! Conversation state types

use crate::session::SessionId;
use crate::transcript::Transcript;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifies one gateway call so its outcome can be matched to the
/// submission that issued it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl fmt::Display for RequestTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Conversation state: the transcript plus request bookkeeping
#[derive(Debug, Clone)]
pub struct ChatState {
    pub transcript: Transcript,
    /// The call whose reply the transcript is waiting for
    pub in_flight: Option<RequestTicket>,
    next_ticket: u64,
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            in_flight: None,
            next_ticket: 1,
        }
    }

    /// True while a call is outstanding. Under the append policy a reply from
    /// before a reset can clear the transcript's flag while a newer call is
    /// still out, so this follows the ticket.
    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Hand out the next ticket. Tickets are never reused, not even across resets.
    pub(super) fn issue_ticket(&mut self) -> RequestTicket {
        let ticket = RequestTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

/// What happens to a reply that arrives after the transcript was reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LateReplyPolicy {
    /// Reset abandons the in-flight call; its outcome never reaches the transcript
    #[default]
    Discard,
    /// The outcome is appended to whatever transcript exists when it lands
    Append,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown late reply policy: {0} (expected `discard` or `append`)")]
pub struct ParsePolicyError(String);

impl FromStr for LateReplyPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(Self::Discard),
            "append" => Ok(Self::Append),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    /// Sent with every gateway call; survives resets
    pub session_id: SessionId,
    pub late_reply_policy: LateReplyPolicy,
}

impl ConvContext {
    pub fn new(session_id: SessionId, late_reply_policy: LateReplyPolicy) -> Self {
        Self {
            session_id,
            late_reply_policy,
        }
    }
}
