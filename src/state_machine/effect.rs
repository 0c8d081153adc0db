//! Effects produced by state transitions

use super::state::RequestTicket;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Push the current transcript to observers
    PublishTranscript,

    /// Make a gateway call (spawns as background task)
    SendMessage {
        ticket: RequestTicket,
        utterance: String,
    },

    /// Stop waiting on a gateway call; its outcome will not be applied
    AbandonRequest { ticket: RequestTicket },

    /// Ask the backend to forget this session's history
    ClearRemoteHistory,

    /// Probe backend health
    ProbeHealth,

    /// Show a status line to the user, outside the transcript
    Notify { text: String, is_error: bool },
}

impl Effect {
    pub fn notify_info(text: impl Into<String>) -> Self {
        Effect::Notify {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn notify_error(text: impl Into<String>) -> Self {
        Effect::Notify {
            text: text.into(),
            is_error: true,
        }
    }
}
