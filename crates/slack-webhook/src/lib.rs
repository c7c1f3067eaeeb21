//! `slack-webhook`: minimal driver for Slack incoming webhooks.
//!
//! The notification layer only ever needs one operation from Slack: post a
//! pre-formatted message, optionally overriding the channel configured on the
//! webhook. This crate owns that transport so the rest of the workspace never
//! touches HTTP directly.
//!
//! # Architecture
//!
//! ```text
//! WebhookMessage   ← text + optional channel override
//!     │
//!     ▼
//! SlackWebhookClient ← reqwest client with a request timeout
//!     │                  POST <webhook url>  (application/json)
//!     ▼
//! Result<()>       ← non-2xx and timeouts become typed WebhookError values
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use slack_webhook::{SlackWebhookClient, WebhookMessage};
//!
//! let client = SlackWebhookClient::from_env()?;
//! client
//!     .post(&WebhookMessage::new("PI planning finished").with_channel("#pi-planning"))
//!     .await?;
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::{SlackWebhookClient, DEFAULT_TIMEOUT_MS, TIMEOUT_ENV, WEBHOOK_URL_ENV};
pub use error::WebhookError;
pub use types::WebhookMessage;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, WebhookError>;
