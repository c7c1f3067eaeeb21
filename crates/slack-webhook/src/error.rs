use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook URL not configured: set {0}")]
    MissingUrl(&'static str),

    #[error("invalid webhook URL '{0}': must be an http(s) URL")]
    InvalidUrl(String),

    #[error("webhook request timed out after {0}ms")]
    Timeout(u64),

    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
