//! Pure state transition function

use super::state::{LateReplyPolicy, RequestTicket};
use super::{ChatState, ConvContext, Effect, Event};
use crate::transcript::TranscriptError;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Still waiting for a reply, please wait")]
    Busy,
    #[error("Reply for abandoned request {0} ignored")]
    StaleReply(RequestTicket),
}

/// Pure transition function.
///
/// Given the same inputs it always produces the same outputs and performs no
/// I/O; every side effect is described in the returned effect list.
pub fn transition(
    state: &ChatState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::Submit { input } => {
            let utterance = input.trim();
            if utterance.is_empty() {
                return Ok(TransitionResult::new(state.clone()));
            }

            if state.is_pending() {
                return Err(TransitionError::Busy);
            }

            let mut new_state = state.clone();
            match new_state.transcript.append_user_message(&input) {
                Ok(_) => {}
                Err(TranscriptError::Pending) => return Err(TransitionError::Busy),
                Err(TranscriptError::EmptyMessage) => {
                    return Ok(TransitionResult::new(state.clone()))
                }
            }
            let ticket = new_state.issue_ticket();
            new_state.in_flight = Some(ticket);

            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::PublishTranscript)
                .with_effect(Effect::SendMessage {
                    ticket,
                    utterance: utterance.to_string(),
                }))
        }

        Event::GatewayReply { ticket, outcome } => {
            let current = state.in_flight == Some(ticket);
            if !current && context.late_reply_policy == LateReplyPolicy::Discard {
                return Err(TransitionError::StaleReply(ticket));
            }

            let mut new_state = state.clone();
            match &outcome {
                Ok(reply) => new_state.transcript.append_bot_message(&reply.text, false),
                Err(failure) => new_state
                    .transcript
                    .append_bot_message(failure.user_message(), true),
            };
            if current {
                new_state.in_flight = None;
            }

            Ok(TransitionResult::new(new_state).with_effect(Effect::PublishTranscript))
        }

        Event::Reset => {
            let mut new_state = state.clone();
            new_state.transcript.reset();
            let abandoned = new_state.in_flight.take();

            let mut result = TransitionResult::new(new_state).with_effect(Effect::PublishTranscript);
            if let (Some(ticket), LateReplyPolicy::Discard) = (abandoned, context.late_reply_policy)
            {
                result = result.with_effect(Effect::AbandonRequest { ticket });
            }
            Ok(result)
        }

        Event::ForgetRemoteHistory => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::ClearRemoteHistory))
        }

        Event::CheckHealth => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::ProbeHealth))
        }

        Event::HealthReport { outcome } => {
            let effect = match outcome {
                Ok(health) => Effect::notify_info(format!("Backend: {}", health.summary())),
                Err(failure) => Effect::notify_error(format!("Backend unreachable: {failure}")),
            };
            Ok(TransitionResult::new(state.clone()).with_effect(effect))
        }

        Event::RemoteHistoryCleared { outcome } => {
            let effect = match outcome {
                Ok(()) => Effect::notify_info("Backend conversation history cleared"),
                Err(failure) => Effect::notify_error(format!(
                    "Could not clear backend history: {}",
                    failure.user_message()
                )),
            };
            Ok(TransitionResult::new(state.clone()).with_effect(effect))
        }
    }
}
