use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use safe_notify_core::config::{create_default_config, CoordinatorConfig};
use safe_notify_core::types::Environment;
use safe_notify_core::{LogSink, MessageSink, NotificationCoordinator};
use slack_webhook::{SlackWebhookClient, WebhookError};

/// Process-level choices taken from global flags and the environment.
pub struct Settings {
    pub environment: Environment,
    pub config_path: Option<PathBuf>,
    pub dry_run: bool,
}

impl Settings {
    /// Effective configuration.
    ///
    /// Priority:
    /// 1. Keys present in the `--config` file
    /// 2. Defaults for the environment (the file's `environment` key, else `--env`)
    pub fn load_config(&self) -> anyhow::Result<CoordinatorConfig> {
        let Some(path) = &self.config_path else {
            return Ok(create_default_config(self.environment));
        };

        CoordinatorConfig::load(path, self.environment)
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    /// The Slack webhook from `SLACK_WEBHOOK_URL`, or a logging sink for
    /// `--dry-run`.
    pub fn build_sink(&self) -> anyhow::Result<Arc<dyn MessageSink>> {
        if self.dry_run {
            return Ok(Arc::new(LogSink));
        }
        match SlackWebhookClient::from_env() {
            Ok(client) => Ok(Arc::new(client)),
            Err(WebhookError::MissingUrl(var)) => Err(anyhow!(
                "{var} is not set; export the Slack incoming-webhook URL or pass --dry-run"
            )),
            Err(e) => Err(e).context("failed to configure the Slack webhook"),
        }
    }

    pub fn build_coordinator(&self) -> anyhow::Result<Arc<NotificationCoordinator>> {
        let config = self.load_config()?;
        let sink = self.build_sink()?;
        let coordinator = NotificationCoordinator::new(config, sink)?;
        Ok(Arc::new(coordinator))
    }
}
