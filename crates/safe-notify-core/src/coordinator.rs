//! The application-facing facade.
//!
//! One [`NotificationCoordinator`] is built at the process entry point and
//! shared as `Arc`. It owns the dispatcher and the health monitor and runs
//! the periodic health check.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{
    error_summary, validate_config, CoordinatorConfig, HealthMonitoringConfig, NotificationConfig,
    NotificationConfigPatch,
};
use crate::dispatcher::{DispatcherStats, NotificationDispatcher};
use crate::error::{NotifyError, Result};
use crate::event::{
    AgentUpdate, BudgetAlert, HealthAlert, PlanningStatistics, SyncStatus, WorkflowEvent,
};
use crate::health::{HealthMonitor, HealthReport};
use crate::sink::{MessageSink, SinkAdapter, DEFAULT_SEND_TIMEOUT};
use crate::types::{AgentStatus, Environment, WorkflowEventType, WorkflowStatus};

#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStats {
    pub environment: Environment,
    pub initialized: bool,
    pub monitoring_active: bool,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub dispatcher: DispatcherStats,
    pub tracked_tokens: usize,
    pub tracked_services: usize,
}

#[derive(Default)]
struct Lifecycle {
    initialized: bool,
    task: Option<JoinHandle<()>>,
}

pub struct NotificationCoordinator {
    environment: Environment,
    health_monitoring: HealthMonitoringConfig,
    dispatcher: Arc<NotificationDispatcher>,
    health: Arc<HealthMonitor>,
    started_at: DateTime<Utc>,
    lifecycle: Mutex<Lifecycle>,
}

impl NotificationCoordinator {
    /// Fails only when `config` has error-level validation findings.
    pub fn new(config: CoordinatorConfig, sink: Arc<dyn MessageSink>) -> Result<Self> {
        Self::with_sink_timeout(config, sink, DEFAULT_SEND_TIMEOUT)
    }

    pub fn with_sink_timeout(
        config: CoordinatorConfig,
        sink: Arc<dyn MessageSink>,
        timeout: Duration,
    ) -> Result<Self> {
        if !validate_config(&config) {
            let errors = error_summary(&config.validate()).unwrap_or_default();
            return Err(NotifyError::InvalidConfig(errors));
        }

        let CoordinatorConfig {
            environment,
            notifications,
            health_monitoring,
        } = config;
        let health = HealthMonitor::new(notifications.thresholds.clone());
        let dispatcher =
            NotificationDispatcher::new(notifications, SinkAdapter::with_timeout(sink, timeout));

        info!(%environment, "notification coordinator created");
        Ok(Self {
            environment,
            health_monitoring,
            dispatcher: Arc::new(dispatcher),
            health: Arc::new(health),
            started_at: Utc::now(),
            lifecycle: Mutex::new(Lifecycle::default()),
        })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start the health-monitoring loop. Calling it again is a no-op.
    pub fn initialize(&self) {
        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.initialized {
            warn!("notification coordinator already initialized");
            return;
        }

        if !self.health_monitoring.enabled {
            lifecycle.initialized = true;
            info!(environment = %self.environment, "notification coordinator initialized (health monitoring off)");
            return;
        }
        // Stay uninitialized so a later call from inside a runtime can start the loop.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime available; health monitoring loop not started");
            return;
        };
        lifecycle.initialized = true;

        let interval_ms = self.health_monitoring.check_interval_ms;
        let dispatcher = Arc::clone(&self.dispatcher);
        let health = Arc::clone(&self.health);
        lifecycle.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                health_pass(&dispatcher, &health).await;
            }
        }));
        info!(
            environment = %self.environment,
            interval_ms,
            "notification coordinator initialized"
        );
    }

    /// Stop the monitoring loop. No-op when not initialized.
    pub fn shutdown(&self) {
        let mut lifecycle = self.lock_lifecycle();
        if !lifecycle.initialized {
            return;
        }
        if let Some(task) = lifecycle.task.take() {
            task.abort();
        }
        lifecycle.initialized = false;
        info!(environment = %self.environment, "notification coordinator shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_lifecycle().initialized
    }

    /// One monitoring pass on demand. Returns the number of alerts delivered.
    pub async fn run_health_check(&self) -> usize {
        health_pass(&self.dispatcher, &self.health).await
    }

    // -----------------------------------------------------------------------
    // Facade
    // -----------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn notify_planning_completion(
        &self,
        title: &str,
        epic_count: u32,
        feature_count: u32,
        story_count: u32,
        enabler_count: u32,
        duration_minutes: f64,
        source_document: &str,
        source_url: Option<&str>,
    ) -> bool {
        self.dispatcher
            .send_planning_statistics(PlanningStatistics {
                planning_title: title.to_string(),
                epic_count,
                feature_count,
                story_count,
                enabler_count,
                duration_minutes,
                source_document: source_document.to_string(),
                source_url: source_url.map(str::to_string),
                created_at: Utc::now(),
            })
            .await
    }

    pub async fn notify_sync_status(&self, status: SyncStatus) -> bool {
        self.dispatcher.send_sync_status(status).await
    }

    pub async fn notify_workflow_update(
        &self,
        event_type: WorkflowEventType,
        title: &str,
        description: &str,
        status: WorkflowStatus,
        url: Option<&str>,
        assignee: Option<&str>,
    ) -> bool {
        self.dispatcher
            .send_workflow_notification(WorkflowEvent {
                event_type,
                title: title.to_string(),
                description: description.to_string(),
                status,
                url: url.map(str::to_string),
                assignee: assignee.map(str::to_string),
                created_at: Utc::now(),
            })
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn notify_agent_update(
        &self,
        agent_id: &str,
        agent_type: &str,
        status: AgentStatus,
        task_title: &str,
        message: &str,
        task_url: Option<&str>,
        assignee: Option<&str>,
    ) -> bool {
        self.dispatcher
            .send_remote_agent_update(AgentUpdate {
                agent_id: agent_id.to_string(),
                agent_type: agent_type.to_string(),
                status,
                task_title: task_title.to_string(),
                message: message.to_string(),
                task_url: task_url.map(str::to_string),
                assignee: assignee.map(str::to_string),
                created_at: Utc::now(),
            })
            .await
    }

    pub async fn notify_health_alert(&self, alert: HealthAlert) -> bool {
        self.dispatcher.send_system_health_alert(alert).await
    }

    pub async fn notify_budget_alert(&self, alert: BudgetAlert) -> bool {
        self.dispatcher.send_budget_alert(alert).await
    }

    // -----------------------------------------------------------------------
    // Health feed
    // -----------------------------------------------------------------------

    pub fn register_oauth_token(
        &self,
        service: &str,
        expires_at: DateTime<Utc>,
        refresh_token: Option<&str>,
    ) {
        debug!(service, %expires_at, "oauth token registered");
        self.health
            .register_oauth_token(service, expires_at, refresh_token.is_some());
    }

    pub fn update_api_usage(&self, service: &str, usage: f64, limit: f64, reset_time: DateTime<Utc>) {
        debug!(service, usage, limit, "api usage updated");
        self.health.update_api_usage(service, usage, limit, reset_time);
    }

    // -----------------------------------------------------------------------
    // Introspection and configuration
    // -----------------------------------------------------------------------

    pub fn get_health_status(&self) -> HealthReport {
        self.health.report(Utc::now())
    }

    pub fn get_coordinator_stats(&self) -> CoordinatorStats {
        let now = Utc::now();
        let (initialized, monitoring_active) = {
            let lifecycle = self.lock_lifecycle();
            (
                lifecycle.initialized,
                lifecycle.task.as_ref().is_some_and(|t| !t.is_finished()),
            )
        };
        CoordinatorStats {
            environment: self.environment,
            initialized,
            monitoring_active,
            started_at: self.started_at,
            uptime_secs: (now - self.started_at).num_seconds().max(0),
            dispatcher: self.dispatcher.stats(),
            tracked_tokens: self.health.tracked_tokens(),
            tracked_services: self.health.tracked_services(),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn config(&self) -> NotificationConfig {
        self.dispatcher.config()
    }

    /// Apply a partial update. Thresholds are pushed to the health monitor.
    /// An update that would leave the configuration invalid is rejected with
    /// [`NotifyError::InvalidConfig`] and changes nothing.
    pub fn update_config(&self, patch: &NotificationConfigPatch) -> Result<NotificationConfig> {
        let updated = self.dispatcher.update_config(patch)?;
        self.health.set_thresholds(updated.thresholds.clone());
        Ok(updated)
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for NotificationCoordinator {
    fn drop(&mut self) {
        if let Some(task) = self.lock_lifecycle().task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for NotificationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCoordinator")
            .field("environment", &self.environment)
            .field("health_monitoring", &self.health_monitoring)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

async fn health_pass(dispatcher: &NotificationDispatcher, health: &HealthMonitor) -> usize {
    let alerts = health.evaluate(Utc::now());
    let raised = alerts.len();
    let mut delivered = 0;
    for alert in alerts {
        if dispatcher.dispatch(alert).await {
            delivered += 1;
        }
    }
    let swept = dispatcher.sweep_throttle_cache();
    debug!(raised, delivered, swept, "health check complete");
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{create_default_config, ThresholdsPatch, ThrottlingPolicyPatch};
    use crate::sink::MemorySink;
    use crate::types::{Category, SyncType};

    fn coordinator(sink: Arc<MemorySink>) -> NotificationCoordinator {
        NotificationCoordinator::new(create_default_config(Environment::Development), sink).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = create_default_config(Environment::Production);
        config.health_monitoring.check_interval_ms = 1_000;
        let err = NotificationCoordinator::new(config, Arc::new(MemorySink::new())).unwrap_err();
        assert!(matches!(err, NotifyError::InvalidConfig(ref m) if m.contains("check_interval_ms")));
    }

    #[tokio::test]
    async fn initialize_and_shutdown_are_idempotent() {
        let coordinator = coordinator(Arc::new(MemorySink::new()));

        coordinator.shutdown();
        assert!(!coordinator.is_initialized());

        coordinator.initialize();
        coordinator.initialize();
        let stats = coordinator.get_coordinator_stats();
        assert!(stats.initialized);
        assert!(stats.monitoring_active);

        coordinator.shutdown();
        coordinator.shutdown();
        let stats = coordinator.get_coordinator_stats();
        assert!(!stats.initialized);
        assert!(!stats.monitoring_active);
    }

    #[test]
    fn initialize_without_runtime_can_be_retried_inside_one() {
        let coordinator = coordinator(Arc::new(MemorySink::new()));

        coordinator.initialize();
        assert!(!coordinator.is_initialized());

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            coordinator.initialize();
            let stats = coordinator.get_coordinator_stats();
            assert!(stats.initialized);
            assert!(stats.monitoring_active);
            coordinator.shutdown();
        });
    }

    #[tokio::test]
    async fn invalid_update_is_rejected_and_keeps_throttling() {
        let sink = Arc::new(MemorySink::new());
        let coordinator = NotificationCoordinator::new(
            create_default_config(Environment::Production),
            sink.clone(),
        )
        .unwrap();

        let err = coordinator
            .update_config(&NotificationConfigPatch {
                throttling: Some(ThrottlingPolicyPatch {
                    window_ms: Some(0),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, NotifyError::InvalidConfig(_)));
        assert_eq!(coordinator.config().throttling.window_ms, 30_000);

        let mut delivered = 0;
        for _ in 0..50 {
            if coordinator
                .notify_agent_update(
                    "agent-9",
                    "planner",
                    AgentStatus::InProgress,
                    "Split features",
                    "",
                    None,
                    None,
                )
                .await
            {
                delivered += 1;
            }
        }
        assert_eq!(delivered, 3);
    }

    #[tokio::test]
    async fn disabled_monitoring_starts_no_loop() {
        let mut config = create_default_config(Environment::Staging);
        config.health_monitoring.enabled = false;
        let coordinator = NotificationCoordinator::new(config, Arc::new(MemorySink::new())).unwrap();

        coordinator.initialize();
        let stats = coordinator.get_coordinator_stats();
        assert!(stats.initialized);
        assert!(!stats.monitoring_active);
    }

    #[tokio::test]
    async fn planning_completion_reaches_sink() {
        let sink = Arc::new(MemorySink::new());
        let coordinator = coordinator(sink.clone());

        assert!(
            coordinator
                .notify_planning_completion("Q1 Planning", 1, 3, 8, 0, 4.2, "PI Doc", None)
                .await
        );
        let sent = sink.last().unwrap();
        assert_eq!(sent.category, Category::Planning);
        assert!(sent.text.contains("1 Epic, 3 Features, 8 Stories"));
        assert!(!sent.text.contains("Enabler"));
    }

    #[tokio::test]
    async fn facade_methods_delegate_per_category() {
        let sink = Arc::new(MemorySink::new());
        let coordinator = coordinator(sink.clone());

        assert!(
            coordinator
                .notify_sync_status(SyncStatus {
                    sync_type: SyncType::Manual,
                    linear_updates: 4,
                    confluence_updates: 0,
                    conflicts_detected: 1,
                    conflicts_resolved: 1,
                    conflicts_pending: 0,
                    next_sync_minutes: 15,
                    errors: vec![],
                    created_at: Utc::now(),
                })
                .await
        );
        assert!(
            coordinator
                .notify_workflow_update(
                    WorkflowEventType::ReviewRequested,
                    "Checkout epic",
                    "Ready for review",
                    WorkflowStatus::Pending,
                    Some("https://linear.app/acme/issue/PI-7"),
                    Some("ana"),
                )
                .await
        );
        assert!(
            coordinator
                .notify_agent_update(
                    "agent-1",
                    "planner",
                    AgentStatus::Completed,
                    "Split features",
                    "Done",
                    None,
                    None,
                )
                .await
        );

        let channels: Vec<_> = sink
            .messages()
            .into_iter()
            .map(|m| m.channel.unwrap_or_default())
            .collect();
        assert_eq!(channels, vec!["#linear-sync", "#workflow", "#agents"]);
        assert_eq!(coordinator.get_coordinator_stats().dispatcher.sent, 3);
    }

    #[tokio::test]
    async fn health_check_dispatches_monitor_alerts() {
        let sink = Arc::new(MemorySink::new());
        let coordinator = coordinator(sink.clone());

        coordinator.register_oauth_token("linear", Utc::now() - chrono::Duration::hours(1), None);
        coordinator.update_api_usage(
            "confluence",
            90.0,
            100.0,
            Utc::now() + chrono::Duration::hours(1),
        );

        assert_eq!(coordinator.run_health_check().await, 2);
        let categories: Vec<_> = sink.messages().iter().map(|m| m.category).collect();
        assert!(categories.contains(&Category::Health));
        assert!(categories.contains(&Category::Budget));

        let report = coordinator.get_health_status();
        assert_eq!(report.overall, crate::types::HealthStatus::Down);
        let stats = coordinator.get_coordinator_stats();
        assert_eq!(stats.tracked_tokens, 1);
        assert_eq!(stats.tracked_services, 1);
    }

    #[tokio::test]
    async fn update_config_refreshes_monitor_thresholds() {
        let sink = Arc::new(MemorySink::new());
        let coordinator = coordinator(sink.clone());
        coordinator.register_oauth_token(
            "linear",
            Utc::now() + chrono::Duration::days(10),
            Some("refresh"),
        );
        assert_eq!(coordinator.run_health_check().await, 0);

        let updated = coordinator
            .update_config(&NotificationConfigPatch {
                thresholds: Some(ThresholdsPatch {
                    token_expiry_warning_days: Some(14),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.thresholds.token_expiry_warning_days, 14);
        assert_eq!(updated.thresholds.api_usage_warning_percent, 80.0);
        assert_eq!(coordinator.run_health_check().await, 1);
        assert_eq!(coordinator.config(), updated);
    }
}
