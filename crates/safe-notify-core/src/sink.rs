//! The outbound edge of the pipeline.
//!
//! [`MessageSink`] is the raw "send text to a channel" capability. It may
//! fail however it likes. [`SinkAdapter`] wraps one sink with a timeout and
//! turns every failure into `false`, so nothing above it sees an error.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use slack_webhook::{SlackWebhookClient, WebhookMessage};
use tracing::{info, warn};

use crate::format::truncate;
use crate::types::Category;

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Characters of message text kept in failure logs.
const LOG_PREVIEW_CHARS: usize = 120;

// ---------------------------------------------------------------------------
// OutboundMessage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub category: Category,
    pub text: String,
    /// `None` means the sink's default destination.
    pub channel: Option<String>,
}

// ---------------------------------------------------------------------------
// MessageSink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Short name used in logs, e.g. `"slack"`.
    fn name(&self) -> &str;

    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()>;
}

#[async_trait]
impl MessageSink for SlackWebhookClient {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()> {
        let mut body = WebhookMessage::new(message.text.clone());
        body.channel = message.channel.clone();
        self.post(&body).await?;
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them. Used for dry runs
/// and when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl MessageSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()> {
        info!(
            category = %message.category,
            channel = message.channel.as_deref().unwrap_or("<default>"),
            "notification (not sent):\n{}",
            message.text
        );
        Ok(())
    }
}

/// Keeps every message in memory. Can be told to fail.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<OutboundMessage>>,
    attempts: AtomicUsize,
    fail: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every send returns an error.
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Successfully delivered messages, oldest first.
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.lock().clone()
    }

    /// Every call to `send`, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<OutboundMessage> {
        self.lock().last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<OutboundMessage>> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MessageSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("memory sink configured to fail");
        }
        self.lock().push(message.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SinkAdapter
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SinkAdapter {
    sink: Arc<dyn MessageSink>,
    timeout: Duration,
}

impl SinkAdapter {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self::with_timeout(sink, DEFAULT_SEND_TIMEOUT)
    }

    pub fn with_timeout(sink: Arc<dyn MessageSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Deliver `message`; `true` only when the sink confirmed it in time.
    pub async fn deliver(&self, message: &OutboundMessage) -> bool {
        match tokio::time::timeout(self.timeout, self.sink.send(message)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(
                    sink = self.sink.name(),
                    category = %message.category,
                    channel = message.channel.as_deref().unwrap_or("<default>"),
                    preview = %truncate(&message.text, LOG_PREVIEW_CHARS),
                    "notification delivery failed: {e:#}"
                );
                false
            }
            Err(_) => {
                warn!(
                    sink = self.sink.name(),
                    category = %message.category,
                    timeout_ms = self.timeout.as_millis() as u64,
                    preview = %truncate(&message.text, LOG_PREVIEW_CHARS),
                    "notification delivery timed out"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for SinkAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkAdapter")
            .field("sink", &self.sink.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutboundMessage {
        OutboundMessage {
            category: Category::Workflow,
            text: "🆕 *Issue Created: Add SSO*".into(),
            channel: Some("#workflow".into()),
        }
    }

    struct SlowSink;

    #[async_trait]
    impl MessageSink for SlowSink {
        fn name(&self) -> &str {
            "slow"
        }

        async fn send(&self, _message: &OutboundMessage) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn success_returns_true() {
        let sink = Arc::new(MemorySink::new());
        let adapter = SinkAdapter::new(sink.clone());
        assert!(adapter.deliver(&message()).await);
        assert_eq!(sink.messages(), vec![message()]);
    }

    #[tokio::test]
    async fn sink_error_returns_false() {
        let sink = Arc::new(MemorySink::failing());
        let adapter = SinkAdapter::new(sink.clone());
        assert!(!adapter.deliver(&message()).await);
        assert_eq!(sink.attempts(), 1);
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn timeout_returns_false() {
        let adapter = SinkAdapter::with_timeout(Arc::new(SlowSink), Duration::from_millis(50));
        assert!(!adapter.deliver(&message()).await);
    }

    #[tokio::test]
    async fn slack_sink_posts_channel_override() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "channel": "#workflow"
            })))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let client =
            SlackWebhookClient::new(format!("{}/hook", server.url()), Duration::from_secs(5))
                .unwrap();
        let adapter = SinkAdapter::new(Arc::new(client));
        assert!(adapter.deliver(&message()).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn slack_sink_http_error_returns_false() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .create_async()
            .await;

        let client =
            SlackWebhookClient::new(format!("{}/hook", server.url()), Duration::from_secs(5))
                .unwrap();
        let adapter = SinkAdapter::new(Arc::new(client));
        assert!(!adapter.deliver(&message()).await);
    }
}
