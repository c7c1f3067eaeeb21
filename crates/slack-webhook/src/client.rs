use std::time::Duration;

use tracing::debug;

use crate::{Result, WebhookError, WebhookMessage};

/// Environment variable holding the incoming-webhook URL.
pub const WEBHOOK_URL_ENV: &str = "SLACK_WEBHOOK_URL";
/// Environment variable overriding the request timeout, in milliseconds.
pub const TIMEOUT_ENV: &str = "SLACK_WEBHOOK_TIMEOUT_MS";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Longest response body kept in a [`WebhookError::Status`].
const MAX_ERROR_BODY: usize = 200;

// ─── SlackWebhookClient ───────────────────────────────────────────────────

/// Posts [`WebhookMessage`] values to a single Slack incoming webhook.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct SlackWebhookClient {
    http: reqwest::Client,
    url: String,
    timeout_ms: u64,
}

impl SlackWebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into().trim().to_string();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(WebhookError::InvalidUrl(url));
        }
        let timeout_ms = (timeout.as_millis() as u64).max(1);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("safe-notify/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            url,
            timeout_ms,
        })
    }

    /// Build a client from `SLACK_WEBHOOK_URL` and `SLACK_WEBHOOK_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup(WEBHOOK_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(WebhookError::MissingUrl(WEBHOOK_URL_ENV))?;
        let timeout_ms = lookup(TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Self::new(url, Duration::from_millis(timeout_ms))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// POST `message` to the webhook. Any non-2xx response is an error.
    pub async fn post(&self, message: &WebhookMessage) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        debug!(
            status = status.as_u16(),
            channel = message.channel.as_deref().unwrap_or("<default>"),
            "slack webhook accepted message"
        );
        Ok(())
    }

    fn classify(&self, err: reqwest::Error) -> WebhookError {
        if err.is_timeout() {
            WebhookError::Timeout(self.timeout_ms)
        } else {
            WebhookError::Http(err)
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> SlackWebhookClient {
        SlackWebhookClient::new(format!("{}/hook", server.url()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn rejects_non_http_url() {
        let err = SlackWebhookClient::new("ftp://example.com", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidUrl(_)));
    }

    #[test]
    fn from_lookup_requires_url() {
        let err = SlackWebhookClient::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, WebhookError::MissingUrl(WEBHOOK_URL_ENV)));
    }

    #[test]
    fn from_lookup_reads_timeout_override() {
        let client = SlackWebhookClient::from_lookup(|key| match key {
            WEBHOOK_URL_ENV => Some("https://hooks.slack.com/services/T/B/X".into()),
            TIMEOUT_ENV => Some("2500".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(client.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn from_lookup_ignores_unparseable_timeout() {
        let client = SlackWebhookClient::from_lookup(|key| match key {
            WEBHOOK_URL_ENV => Some("https://hooks.slack.com/services/T/B/X".into()),
            TIMEOUT_ENV => Some("soon".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(client.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "text": "PI planning finished",
                "channel": "#pi-planning"
            })))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let client = client_for(&server);
        client
            .post(&WebhookMessage::new("PI planning finished").with_channel("#pi-planning"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(404)
            .with_body("no_service")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.post(&WebhookMessage::new("hi")).await.unwrap_err();
        match err {
            WebhookError::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no_service");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
