//! Conversation runtime executor

use super::ChatUpdate;
use crate::gateway::ChatGateway;
use crate::state_machine::{
    transition, ChatState, ConvContext, Effect, Event, RequestTicket, TransitionError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Conversation runtime, generic over the gateway so tests can swap in mocks
pub struct ChatRuntime<G>
where
    G: ChatGateway + 'static,
{
    context: ConvContext,
    state: ChatState,
    gateway: Arc<G>,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so the loop ends once every outside sender and background task is gone
    event_tx: mpsc::WeakSender<Event>,
    broadcast_tx: broadcast::Sender<ChatUpdate>,
    /// Tokens to cancel running gateway calls, children of `shutdown`
    cancel_tokens: HashMap<RequestTicket, CancellationToken>,
    /// Stops the loop and every call still running
    shutdown: CancellationToken,
}

impl<G> ChatRuntime<G>
where
    G: ChatGateway + 'static,
{
    pub fn new(
        context: ConvContext,
        state: ChatState,
        gateway: G,
        event_rx: mpsc::Receiver<Event>,
        event_tx: &mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<ChatUpdate>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            context,
            state,
            gateway: Arc::new(gateway),
            event_rx,
            event_tx: event_tx.downgrade(),
            broadcast_tx,
            cancel_tokens: HashMap::new(),
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            session = %self.context.session_id,
            backend = %self.gateway.base_url(),
            policy = ?self.context.late_reply_policy,
            "Starting conversation runtime"
        );

        self.publish_transcript();

        // Process events in a loop - no recursion
        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => {
                    tracing::info!(
                        open_calls = self.cancel_tokens.len(),
                        "Shutdown requested"
                    );
                    break;
                }

                event = self.event_rx.recv() => match event {
                    Some(event) => self.process_event(event),
                    None => break,
                },
            }
        }

        // Background calls end with the loop
        self.shutdown.cancel();
        tracing::info!(session = %self.context.session_id, "Conversation runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        if let Event::GatewayReply { ticket, .. } = &event {
            self.cancel_tokens.remove(ticket);
        }

        // Pure state transition
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(TransitionError::StaleReply(ticket)) => {
                tracing::info!(%ticket, "Dropping reply for abandoned request");
                return;
            }
            Err(e) => {
                // Transition errors are user-facing (e.g., "still waiting")
                tracing::warn!(error = %e, "Event rejected");
                let _ = self.broadcast_tx.send(ChatUpdate::Notice {
                    text: e.to_string(),
                    is_error: true,
                });
                return;
            }
        };

        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::PublishTranscript => self.publish_transcript(),

            Effect::SendMessage { ticket, utterance } => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    return;
                };

                let cancel_token = self.shutdown.child_token();
                self.cancel_tokens.insert(ticket, cancel_token.clone());

                let gateway = self.gateway.clone();
                let session_id = self.context.session_id.clone();

                tokio::spawn(async move {
                    tracing::debug!(%ticket, "Sending message (background)");

                    // Race the call against abandonment
                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {
                            tracing::info!(%ticket, "Gateway call abandoned");
                        }

                        outcome = gateway.send(&session_id, &utterance) => {
                            let _ = event_tx.send(Event::GatewayReply { ticket, outcome }).await;
                        }
                    }
                });
            }

            Effect::AbandonRequest { ticket } => {
                if let Some(token) = self.cancel_tokens.remove(&ticket) {
                    tracing::info!(%ticket, "Abandoning gateway call");
                    token.cancel();
                }
            }

            Effect::ClearRemoteHistory => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    return;
                };
                let gateway = self.gateway.clone();
                let session_id = self.context.session_id.clone();
                tokio::spawn(async move {
                    let outcome = gateway.clear_history(&session_id).await;
                    let _ = event_tx.send(Event::RemoteHistoryCleared { outcome }).await;
                });
            }

            Effect::ProbeHealth => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    return;
                };
                let gateway = self.gateway.clone();
                tokio::spawn(async move {
                    let outcome = gateway.health().await;
                    let _ = event_tx.send(Event::HealthReport { outcome }).await;
                });
            }

            Effect::Notify { text, is_error } => {
                let _ = self.broadcast_tx.send(ChatUpdate::Notice { text, is_error });
            }
        }
    }

    fn publish_transcript(&self) {
        tracing::debug!(
            messages = self.state.transcript.len(),
            pending = self.state.is_pending(),
            "Publishing transcript"
        );
        let _ = self.broadcast_tx.send(ChatUpdate::Transcript {
            messages: self.state.transcript.snapshot().to_vec(),
            pending: self.state.is_pending(),
        });
    }
}
