//! Mock implementations for testing
//!
//! These mocks enable runtime testing without real I/O.

use super::{ChatRuntime, ChatUpdate};
use crate::gateway::{ChatGateway, Failure, HealthStatus, Reply};
use crate::session::SessionId;
use crate::state_machine::{ChatState, ConvContext, Event, LateReplyPolicy};
use crate::transcript::Message;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Gateway
// ============================================================================

/// Mock gateway that returns queued outcomes
pub struct MockGateway {
    replies: Mutex<VecDeque<Result<Reply, Failure>>>,
    health: Mutex<Option<Result<HealthStatus, Failure>>>,
    /// Record of all chat calls made
    pub calls: Mutex<Vec<(SessionId, String)>>,
    /// Record of all history clears requested
    pub cleared: Mutex<Vec<SessionId>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            health: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            cleared: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(Reply::new(text)));
    }

    /// Queue a failure
    pub fn queue_failure(&self, failure: Failure) {
        self.replies.lock().unwrap().push_back(Err(failure));
    }

    pub fn set_health(&self, outcome: Result<HealthStatus, Failure>) {
        *self.health.lock().unwrap() = Some(outcome);
    }

    pub fn recorded_calls(&self) -> Vec<(SessionId, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn send(&self, session_id: &SessionId, utterance: &str) -> Result<Reply, Failure> {
        self.calls
            .lock()
            .unwrap()
            .push((session_id.clone(), utterance.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Failure::network("No mock reply queued")))
    }

    async fn health(&self) -> Result<HealthStatus, Failure> {
        self.health.lock().unwrap().clone().unwrap_or_else(|| {
            Ok(HealthStatus {
                status: "ok".to_string(),
                api: None,
            })
        })
    }

    async fn clear_history(&self, session_id: &SessionId) -> Result<(), Failure> {
        self.cleared.lock().unwrap().push(session_id.clone());
        Ok(())
    }

    fn base_url(&self) -> &str {
        "mock://gateway"
    }
}

// ============================================================================
// Gated Mock Gateway (for in-flight race testing)
// ============================================================================

/// Mock gateway whose chat calls block until released; replies `re: <utterance>`
pub struct GatedMockGateway {
    inner: MockGateway,
    /// Notified when a call starts (for test synchronization)
    pub request_started: Arc<Notify>,
    release: Arc<Notify>,
}

impl GatedMockGateway {
    pub fn new() -> Self {
        Self {
            inner: MockGateway::new(),
            request_started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    /// Let one waiting (or the next) call complete
    pub fn release_one(&self) {
        self.release.notify_one();
    }

    pub fn recorded_calls(&self) -> Vec<(SessionId, String)> {
        self.inner.recorded_calls()
    }
}

impl Default for GatedMockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatGateway for GatedMockGateway {
    async fn send(&self, session_id: &SessionId, utterance: &str) -> Result<Reply, Failure> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .push((session_id.clone(), utterance.to_string()));
        self.request_started.notify_one();
        self.release.notified().await;
        Ok(Reply::new(format!("re: {utterance}")))
    }

    async fn health(&self) -> Result<HealthStatus, Failure> {
        self.inner.health().await
    }

    async fn clear_history(&self, session_id: &SessionId) -> Result<(), Failure> {
        self.inner.clear_history(session_id).await
    }

    fn base_url(&self) -> &str {
        "mock://gated"
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime<G: ChatGateway + 'static> {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_rx: broadcast::Receiver<ChatUpdate>,
    pub gateway: Arc<G>,
    pub session_id: SessionId,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

pub struct TestRuntimeBuilder<G> {
    session_id: SessionId,
    policy: LateReplyPolicy,
    gateway: G,
}

impl TestRuntime<MockGateway> {
    /// Create a simple test runtime with an instant mock
    pub fn builder() -> TestRuntimeBuilder<MockGateway> {
        TestRuntimeBuilder::new(MockGateway::new())
    }
}

impl<G: ChatGateway + 'static> TestRuntimeBuilder<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            session_id: SessionId::from("session-test"),
            policy: LateReplyPolicy::default(),
            gateway,
        }
    }

    pub fn gateway<H: ChatGateway + 'static>(self, gateway: H) -> TestRuntimeBuilder<H> {
        TestRuntimeBuilder {
            session_id: self.session_id,
            policy: self.policy,
            gateway,
        }
    }

    pub fn policy(mut self, policy: LateReplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> TestRuntime<G> {
        let gateway = Arc::new(self.gateway);
        let context = ConvContext::new(self.session_id.clone(), self.policy);
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);

        let runtime = ChatRuntime::new(
            context,
            ChatState::new(),
            gateway.clone(),
            event_rx,
            &event_tx,
            broadcast_tx,
            CancellationToken::new(),
        );

        let handle = tokio::spawn(runtime.run());

        TestRuntime {
            event_tx,
            broadcast_rx,
            gateway,
            session_id: self.session_id,
            _runtime_handle: handle,
        }
    }
}

impl<G: ChatGateway + 'static> TestRuntime<G> {
    pub async fn send(&self, event: Event) {
        self.event_tx.send(event).await.expect("Failed to send event");
    }

    /// Submit user input
    pub async fn submit(&self, text: &str) {
        self.send(Event::submit(text)).await;
    }

    pub async fn reset(&self) {
        self.send(Event::Reset).await;
    }

    /// Wait for a transcript update matching `pred`
    pub async fn wait_for_transcript<F>(&mut self, timeout: Duration, pred: F) -> Option<Vec<Message>>
    where
        F: Fn(&[Message], bool) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(ChatUpdate::Transcript { messages, pending })) if pred(&messages, pending) => {
                    return Some(messages);
                }
                _ => continue,
            }
        }
        None
    }

    /// Wait for the transcript to settle (nothing pending) at `len` messages
    pub async fn wait_for_settled(&mut self, len: usize) -> Option<Vec<Message>> {
        self.wait_for_transcript(Duration::from_secs(2), |messages, pending| {
            !pending && messages.len() == len
        })
        .await
    }

    /// Wait for the next notice
    pub async fn wait_for_notice(&mut self, timeout: Duration) -> Option<(String, bool)> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(ChatUpdate::Notice { text, is_error })) => return Some((text, is_error)),
                _ => continue,
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::FALLBACK_MESSAGE;
    use crate::transcript::{Sender, GREETING};

    fn summary(messages: &[Message]) -> Vec<(u64, Sender, String, bool)> {
        messages
            .iter()
            .map(|m| (m.id, m.sender, m.text.clone(), m.is_error))
            .collect()
    }

    #[tokio::test]
    async fn test_mock_gateway() {
        let mock = MockGateway::new();
        mock.queue_reply("Hello");
        let session = SessionId::from("s");

        let reply = mock.send(&session, "Hi").await.unwrap();
        assert_eq!(reply.text, "Hello");

        // Second call should fail (no more replies)
        assert!(mock.send(&session, "Hi").await.is_err());
        assert_eq!(mock.recorded_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_initial_transcript_published() {
        let mut rt = TestRuntime::builder().build();
        let messages = rt.wait_for_settled(1).await.unwrap();
        assert_eq!(messages[0].text, GREETING);
    }

    /// Scenario: fresh, submit "Hi", reply "Hello!"
    #[tokio::test]
    async fn test_simple_reply() {
        let mock = MockGateway::new();
        mock.queue_reply("Hello!");

        let mut rt = TestRuntime::builder().gateway(mock).build();
        rt.submit("Hi").await;

        let messages = rt.wait_for_settled(3).await.unwrap();
        assert_eq!(
            summary(&messages),
            vec![
                (1, Sender::Bot, GREETING.to_string(), false),
                (2, Sender::User, "Hi".to_string(), false),
                (3, Sender::Bot, "Hello!".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_reply_flagged() {
        let mock = MockGateway::new();
        mock.queue_failure(Failure::status(429, Some("rate limited".to_string())));
        mock.queue_failure(Failure::network("connection refused"));

        let mut rt = TestRuntime::builder().gateway(mock).build();
        rt.submit("Hi").await;
        let messages = rt.wait_for_settled(3).await.unwrap();
        assert_eq!(messages[2].text, "rate limited");
        assert!(messages[2].is_error);

        // Conversation continues after a failure
        rt.submit("again").await;
        let messages = rt.wait_for_settled(5).await.unwrap();
        assert_eq!(messages[4].text, FALLBACK_MESSAGE);
        assert!(messages[4].is_error);
    }

    #[tokio::test]
    async fn test_blank_input_makes_no_call() {
        let mock = MockGateway::new();
        mock.queue_reply("Hello!");

        let mut rt = TestRuntime::builder().gateway(mock).build();
        rt.submit("   ").await;
        rt.submit("").await;
        rt.submit(" Hi ").await;

        let messages = rt.wait_for_settled(3).await.unwrap();
        assert_eq!(messages[1].text, " Hi ");
        let calls = rt.gateway.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "Hi");
    }

    #[tokio::test]
    async fn test_submit_while_pending_rejected() {
        let mut rt = TestRuntime::builder().gateway(GatedMockGateway::new()).build();
        rt.submit("Hi").await;
        rt.gateway.request_started.notified().await;

        rt.submit("again").await;
        let (text, is_error) = rt.wait_for_notice(Duration::from_secs(2)).await.unwrap();
        assert!(is_error);
        assert!(text.contains("waiting"));

        rt.gateway.release_one();
        let messages = rt.wait_for_settled(3).await.unwrap();
        assert_eq!(messages[2].text, "re: Hi");
        assert_eq!(rt.gateway.recorded_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_session_id_stable_across_reset() {
        let mock = MockGateway::new();
        mock.queue_reply("one");
        mock.queue_reply("two");

        let mut rt = TestRuntime::builder().gateway(mock).build();
        rt.submit("first").await;
        rt.wait_for_settled(3).await.unwrap();

        rt.reset().await;
        rt.wait_for_settled(1).await.unwrap();

        rt.submit("second").await;
        let messages = rt.wait_for_settled(3).await.unwrap();
        assert_eq!(messages[2].text, "two");
        assert_eq!(messages[2].id, 3);

        let calls = rt.gateway.recorded_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(session, _)| *session == rt.session_id));
    }

    /// Reset while a call is in flight, default policy: the late reply never lands
    #[tokio::test]
    async fn test_reset_discards_late_reply() {
        let mut rt = TestRuntime::builder().gateway(GatedMockGateway::new()).build();
        rt.submit("Hi").await;
        rt.gateway.request_started.notified().await;

        rt.reset().await;
        let messages = rt.wait_for_settled(1).await.unwrap();
        assert_eq!(messages[0].text, GREETING);

        rt.submit("next").await;
        rt.gateway.request_started.notified().await;
        rt.gateway.release_one();

        let messages = rt.wait_for_settled(3).await.unwrap();
        assert_eq!(
            summary(&messages),
            vec![
                (1, Sender::Bot, GREETING.to_string(), false),
                (2, Sender::User, "next".to_string(), false),
                (3, Sender::Bot, "re: next".to_string(), false),
            ]
        );
        assert_eq!(rt.gateway.recorded_calls().len(), 2);
    }

    /// Reset while a call is in flight, append policy: the late reply lands
    /// on the fresh transcript with the re-seeded ids
    #[tokio::test]
    async fn test_reset_appends_late_reply() {
        let mut rt = TestRuntime::builder()
            .gateway(GatedMockGateway::new())
            .policy(LateReplyPolicy::Append)
            .build();
        rt.submit("Hi").await;
        rt.gateway.request_started.notified().await;

        rt.reset().await;
        rt.wait_for_settled(1).await.unwrap();

        rt.gateway.release_one();
        let messages = rt.wait_for_settled(2).await.unwrap();
        assert_eq!(
            summary(&messages),
            vec![
                (1, Sender::Bot, GREETING.to_string(), false),
                (2, Sender::Bot, "re: Hi".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_health_check_notice() {
        let mock = MockGateway::new();
        mock.set_health(Ok(HealthStatus {
            status: "Server is running".to_string(),
            api: Some("Gemini".to_string()),
        }));

        let mut rt = TestRuntime::builder().gateway(mock).build();
        rt.send(Event::CheckHealth).await;

        let (text, is_error) = rt.wait_for_notice(Duration::from_secs(2)).await.unwrap();
        assert_eq!(text, "Backend: Server is running (Gemini)");
        assert!(!is_error);
    }

    #[tokio::test]
    async fn test_forget_clears_remote_history_only() {
        let mock = MockGateway::new();
        mock.queue_reply("Hello!");

        let mut rt = TestRuntime::builder().gateway(mock).build();
        rt.submit("Hi").await;
        rt.wait_for_settled(3).await.unwrap();

        rt.send(Event::ForgetRemoteHistory).await;
        let (text, is_error) = rt.wait_for_notice(Duration::from_secs(2)).await.unwrap();
        assert!(!is_error);
        assert!(text.contains("cleared"));

        let cleared = rt.gateway.cleared.lock().unwrap().clone();
        assert_eq!(cleared, vec![rt.session_id.clone()]);
    }

    #[tokio::test]
    async fn test_shutdown_with_call_in_flight() {
        let gateway = Arc::new(GatedMockGateway::new());
        let context = ConvContext::new(SessionId::from("s"), LateReplyPolicy::Discard);
        let running = crate::runtime::spawn(context, gateway.clone());

        assert!(running.handle.send(Event::submit("Hi")).await);
        gateway.request_started.notified().await;

        // Dropping the handle alone is not enough: the call task still holds a sender
        running.handle.shutdown();
        drop(running.handle);

        tokio::time::timeout(Duration::from_millis(200), running.task)
            .await
            .expect("runtime waited on the open call")
            .unwrap();
    }

    #[tokio::test]
    async fn test_runtime_stops_when_handle_dropped() {
        let context = ConvContext::new(SessionId::from("s"), LateReplyPolicy::Discard);
        let running = crate::runtime::spawn(context, MockGateway::new());
        let mut updates = running.updates;
        drop(running.handle);

        tokio::time::timeout(Duration::from_secs(2), running.task)
            .await
            .expect("runtime did not stop")
            .unwrap();
        // The initial transcript, then nothing: the sender went with the runtime
        assert!(matches!(updates.recv().await, Ok(ChatUpdate::Transcript { .. })));
        assert!(matches!(
            updates.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
