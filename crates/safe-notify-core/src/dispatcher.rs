use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{error_summary, NotificationConfig, NotificationConfigPatch};
use crate::error::{NotifyError, Result};
use crate::event::{
    AgentUpdate, BudgetAlert, EventPayload, HealthAlert, PlanningStatistics, SyncStatus,
    WorkflowEvent,
};
use crate::format;
use crate::router::ChannelRouter;
use crate::sink::{OutboundMessage, SinkAdapter};
use crate::throttle::{Clock, SystemClock, ThrottleGate};
use crate::types::Category;

// ─── DispatcherStats ──────────────────────────────────────────────────────

/// Point-in-time counters for everything the dispatcher has decided.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatcherStats {
    pub sent: u64,
    pub failed: u64,
    pub throttled: u64,
    pub disabled: u64,
    pub bypassed: u64,
    pub sent_by_category: BTreeMap<String, u64>,
    pub throttle_entries: usize,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
    throttled: AtomicU64,
    disabled: AtomicU64,
    bypassed: AtomicU64,
    sent_by_category: Mutex<HashMap<Category, u64>>,
}

impl Counters {
    fn record_sent(&self, category: Category) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        let mut by_category = self
            .sent_by_category
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *by_category.entry(category).or_insert(0) += 1;
    }
}

// ─── NotificationDispatcher ───────────────────────────────────────────────

/// Emitter-facing API: one method per category, each returning whether the
/// notification reached the sink. Never panics or errors to the caller.
pub struct NotificationDispatcher {
    config: RwLock<NotificationConfig>,
    gate: ThrottleGate,
    sink: SinkAdapter,
    counters: Counters,
}

impl NotificationDispatcher {
    pub fn new(config: NotificationConfig, sink: SinkAdapter) -> Self {
        Self::with_clock(config, sink, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: NotificationConfig, sink: SinkAdapter, clock: Arc<dyn Clock>) -> Self {
        let gate = ThrottleGate::with_clock(config.throttling.clone(), clock);
        Self {
            config: RwLock::new(config),
            gate,
            sink,
            counters: Counters::default(),
        }
    }

    pub async fn send_planning_statistics(&self, stats: PlanningStatistics) -> bool {
        self.dispatch(EventPayload::Planning(stats)).await
    }

    pub async fn send_sync_status(&self, status: SyncStatus) -> bool {
        self.dispatch(EventPayload::Sync(status)).await
    }

    pub async fn send_system_health_alert(&self, alert: HealthAlert) -> bool {
        self.dispatch(EventPayload::Health(alert)).await
    }

    pub async fn send_budget_alert(&self, alert: BudgetAlert) -> bool {
        self.dispatch(EventPayload::Budget(alert)).await
    }

    pub async fn send_workflow_notification(&self, event: WorkflowEvent) -> bool {
        self.dispatch(EventPayload::Workflow(event)).await
    }

    pub async fn send_remote_agent_update(&self, update: AgentUpdate) -> bool {
        self.dispatch(EventPayload::Agent(update)).await
    }

    /// Run one payload through enablement → throttle → format → route → send.
    pub async fn dispatch(&self, payload: EventPayload) -> bool {
        let category = payload.category();
        let config = self.config();

        if !config.enabled.is_enabled(category) {
            debug!(%category, "notification suppressed: category disabled");
            self.counters.disabled.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let key = payload.dedup_key();
        if payload.is_critical() && config.throttling.critical_bypass {
            debug!(%category, key = %key, "critical notification bypasses throttling");
            self.counters.bypassed.fetch_add(1, Ordering::Relaxed);
        } else if self.gate.should_throttle(category, &key) {
            debug!(%category, key = %key, "notification suppressed: throttled");
            self.counters.throttled.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let router = ChannelRouter::new(config.channels);
        let prepared = std::panic::catch_unwind(AssertUnwindSafe(|| OutboundMessage {
            category,
            text: format::format(&payload),
            channel: router.resolve(category),
        }));
        let message = match prepared {
            Ok(message) => message,
            Err(_) => {
                error!(%category, key = %key, "failed to format notification");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        let delivered = match AssertUnwindSafe(self.sink.deliver(&message))
            .catch_unwind()
            .await
        {
            Ok(delivered) => delivered,
            Err(_) => {
                error!(%category, sink = self.sink.sink_name(), "notification sink panicked");
                false
            }
        };

        if delivered {
            info!(
                %category,
                channel = message.channel.as_deref().unwrap_or("<default>"),
                "notification sent"
            );
            self.counters.record_sent(category);
        } else {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
        delivered
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> NotificationConfig {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Merge `patch` into a copy of the current configuration and swap it in.
    /// A candidate with error-level findings is rejected and the current
    /// configuration stays in place.
    pub fn update_config(&self, patch: &NotificationConfigPatch) -> Result<NotificationConfig> {
        let mut guard = self.config.write().unwrap_or_else(|e| e.into_inner());
        let mut next = guard.clone();
        next.apply(patch);
        if let Some(errors) = error_summary(&next.validate()) {
            warn!(%errors, "notification config update rejected");
            return Err(NotifyError::InvalidConfig(errors));
        }
        if next.throttling != guard.throttling {
            self.gate.set_policy(next.throttling.clone());
        }
        *guard = next.clone();
        info!("notification config updated");
        Ok(next)
    }

    pub fn clear_throttle_cache(&self) {
        self.gate.clear();
    }

    pub fn sweep_throttle_cache(&self) -> usize {
        self.gate.sweep()
    }

    pub fn stats(&self) -> DispatcherStats {
        let sent_by_category = self
            .counters
            .sent_by_category
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(c, n)| (c.as_str().to_string(), *n))
            .collect();
        DispatcherStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            throttled: self.counters.throttled.load(Ordering::Relaxed),
            disabled: self.counters.disabled.load(Ordering::Relaxed),
            bypassed: self.counters.bypassed.load(Ordering::Relaxed),
            sent_by_category,
            throttle_entries: self.gate.len(),
        }
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("gate", &self.gate)
            .field("sink", &self.sink)
            .finish()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
