use serde::{Deserialize, Serialize};

/// JSON body accepted by a Slack incoming webhook.
///
/// Only `text` is required. `channel` overrides the channel configured on
/// the webhook itself and is omitted from the wire format when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl WebhookMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}
