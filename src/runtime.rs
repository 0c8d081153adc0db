//! Runtime for executing the conversation
//!
//! The runtime task is the single owner of the conversation state. Terminal
//! input and gateway completions both arrive as events on one channel, so
//! every mutation happens on that task.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;

use crate::gateway::ChatGateway;
use crate::state_machine::{ChatState, ConvContext, Event};
use crate::transcript::Message;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Updates pushed to observers
#[derive(Debug, Clone)]
pub enum ChatUpdate {
    Transcript {
        messages: Vec<Message>,
        pending: bool,
    },
    Notice {
        text: String,
        is_error: bool,
    },
}

/// Handle to interact with a running conversation.
///
/// The runtime stops on `shutdown`, or once every handle is dropped and no
/// gateway call is left running.
#[derive(Clone)]
pub struct ChatHandle {
    event_tx: mpsc::Sender<Event>,
    shutdown: CancellationToken,
}

impl ChatHandle {
    /// Queue an event for the runtime. Returns false once the runtime is gone.
    pub async fn send(&self, event: Event) -> bool {
        self.event_tx.send(event).await.is_ok()
    }

    /// Stop the runtime now, abandoning any call in flight
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// A spawned runtime plus an update stream subscribed before it started,
/// so the initial transcript is never missed
pub struct RunningChat {
    pub handle: ChatHandle,
    pub updates: broadcast::Receiver<ChatUpdate>,
    pub task: JoinHandle<()>,
}

/// Start a runtime for a fresh conversation
pub fn spawn<G>(context: ConvContext, gateway: G) -> RunningChat
where
    G: ChatGateway + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(32);
    let (broadcast_tx, updates) = broadcast::channel(128);
    let shutdown = CancellationToken::new();

    let runtime = ChatRuntime::new(
        context,
        ChatState::new(),
        gateway,
        event_rx,
        &event_tx,
        broadcast_tx,
        shutdown.clone(),
    );
    let task = tokio::spawn(runtime.run());

    RunningChat {
        handle: ChatHandle { event_tx, shutdown },
        updates,
        task,
    }
}
