//! Events that can occur in a conversation

use super::state::RequestTicket;
use crate::gateway::{Failure, HealthStatus, Reply};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    /// Raw input line from the user; trimming happens in the transition
    Submit {
        input: String,
    },
    Reset,
    ForgetRemoteHistory,
    CheckHealth,

    // Gateway events
    GatewayReply {
        ticket: RequestTicket,
        outcome: Result<Reply, Failure>,
    },
    HealthReport {
        outcome: Result<HealthStatus, Failure>,
    },
    RemoteHistoryCleared {
        outcome: Result<(), Failure>,
    },
}

impl Event {
    pub fn submit(input: impl Into<String>) -> Self {
        Event::Submit {
            input: input.into(),
        }
    }
}
