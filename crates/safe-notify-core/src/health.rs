//! OAuth token and API usage tracking.
//!
//! The monitor is fed by the integrations that own the tokens and rate
//! limits. It never talks to the sink itself: `evaluate` turns the current
//! state into payloads and the coordinator decides what to send.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::event::{BudgetAlert, EventPayload, HealthAlert};
use crate::types::{HealthStatus, Severity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub service: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub has_refresh_token: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiUsageRecord {
    pub service: String,
    pub usage: f64,
    pub limit: f64,
    pub reset_time: DateTime<Utc>,
}

impl ApiUsageRecord {
    /// `None` when no usable limit is known.
    pub fn percent(&self) -> Option<f64> {
        (self.limit > 0.0 && self.usage.is_finite()).then(|| self.usage / self.limit * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub overall: HealthStatus,
    pub checked_at: DateTime<Utc>,
    pub components: Vec<ComponentHealth>,
}

#[derive(Default)]
struct MonitorState {
    thresholds: Thresholds,
    tokens: BTreeMap<String, TokenRecord>,
    usage: BTreeMap<String, ApiUsageRecord>,
}

#[derive(Default)]
pub struct HealthMonitor {
    state: Mutex<MonitorState>,
}

impl HealthMonitor {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            state: Mutex::new(MonitorState {
                thresholds,
                ..MonitorState::default()
            }),
        }
    }

    pub fn set_thresholds(&self, thresholds: Thresholds) {
        self.lock().thresholds = thresholds;
    }

    /// Track (or replace) the token for `service`.
    pub fn register_oauth_token(
        &self,
        service: &str,
        expires_at: DateTime<Utc>,
        has_refresh_token: bool,
    ) {
        self.lock().tokens.insert(
            service.to_string(),
            TokenRecord {
                service: service.to_string(),
                expires_at,
                has_refresh_token,
            },
        );
    }

    pub fn update_api_usage(
        &self,
        service: &str,
        usage: f64,
        limit: f64,
        reset_time: DateTime<Utc>,
    ) {
        self.lock().usage.insert(
            service.to_string(),
            ApiUsageRecord {
                service: service.to_string(),
                usage,
                limit,
                reset_time,
            },
        );
    }

    pub fn tracked_tokens(&self) -> usize {
        self.lock().tokens.len()
    }

    pub fn tracked_services(&self) -> usize {
        self.lock().usage.len()
    }

    /// Alerts warranted by the state as of `now`. Expired or expiring tokens
    /// produce health alerts; usage past the warning line produces a budget
    /// alert, and past the critical line also a critical health alert.
    pub fn evaluate(&self, now: DateTime<Utc>) -> Vec<EventPayload> {
        let state = self.lock();
        let thresholds = &state.thresholds;
        let mut alerts = Vec::new();

        for token in state.tokens.values() {
            let (status, severity) = match token_level(token, thresholds, now) {
                TokenLevel::Fresh => continue,
                TokenLevel::Expired => (HealthStatus::Down, Severity::Critical),
                TokenLevel::Critical => (HealthStatus::Degraded, Severity::Critical),
                TokenLevel::Warning => (HealthStatus::Degraded, Severity::Medium),
            };
            alerts.push(EventPayload::Health(HealthAlert {
                component: format!("oauth:{}", token.service),
                status,
                severity,
                message: token_message(token, now),
                action_required: Some(if token.has_refresh_token {
                    format!("Refresh the {} token", token.service)
                } else {
                    format!("Re-authorize {}", token.service)
                }),
                created_at: now,
            }));
        }

        for record in state.usage.values() {
            let Some(percent) = record.percent() else {
                continue;
            };
            if percent < thresholds.api_usage_warning_percent {
                continue;
            }
            alerts.push(EventPayload::Budget(BudgetAlert {
                resource_type: format!("api:{}", record.service),
                current_usage: record.usage,
                limit: record.limit,
                timeframe: format!("window (resets {})", record.reset_time.format("%H:%M UTC")),
                created_at: now,
            }));
            if percent >= thresholds.api_usage_critical_percent {
                alerts.push(EventPayload::Health(HealthAlert {
                    component: format!("api:{}", record.service),
                    status: HealthStatus::Unhealthy,
                    severity: Severity::Critical,
                    message: format!(
                        "{} API usage at {percent:.1}% of limit",
                        record.service
                    ),
                    action_required: Some(format!(
                        "Pause non-essential {} calls until {}",
                        record.service,
                        record.reset_time.format("%H:%M UTC")
                    )),
                    created_at: now,
                }));
            }
        }

        alerts
    }

    /// Per-component status plus the worst of them. An empty monitor is
    /// healthy.
    pub fn report(&self, now: DateTime<Utc>) -> HealthReport {
        let state = self.lock();
        let thresholds = &state.thresholds;
        let mut components = Vec::new();

        for token in state.tokens.values() {
            let status = match token_level(token, thresholds, now) {
                TokenLevel::Fresh => HealthStatus::Healthy,
                TokenLevel::Expired => HealthStatus::Down,
                TokenLevel::Critical | TokenLevel::Warning => HealthStatus::Degraded,
            };
            components.push(ComponentHealth {
                component: format!("oauth:{}", token.service),
                status,
                detail: token_message(token, now),
            });
        }

        for record in state.usage.values() {
            let (status, detail) = match record.percent() {
                None => (HealthStatus::Healthy, "no limit reported".to_string()),
                Some(p) if p >= thresholds.api_usage_critical_percent => {
                    (HealthStatus::Unhealthy, format!("{p:.1}% of limit used"))
                }
                Some(p) if p >= thresholds.api_usage_warning_percent => {
                    (HealthStatus::Degraded, format!("{p:.1}% of limit used"))
                }
                Some(p) => (HealthStatus::Healthy, format!("{p:.1}% of limit used")),
            };
            components.push(ComponentHealth {
                component: format!("api:{}", record.service),
                status,
                detail,
            });
        }

        let overall = components
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        HealthReport {
            overall,
            checked_at: now,
            components,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("HealthMonitor")
            .field("thresholds", &state.thresholds)
            .field("tokens", &state.tokens.len())
            .field("services", &state.usage.len())
            .finish()
    }
}

enum TokenLevel {
    Fresh,
    Warning,
    Critical,
    Expired,
}

fn token_level(token: &TokenRecord, thresholds: &Thresholds, now: DateTime<Utc>) -> TokenLevel {
    let remaining = token.expires_at - now;
    if remaining <= Duration::zero() {
        TokenLevel::Expired
    } else if remaining <= Duration::days(i64::from(thresholds.token_expiry_critical_days)) {
        TokenLevel::Critical
    } else if remaining <= Duration::days(i64::from(thresholds.token_expiry_warning_days)) {
        TokenLevel::Warning
    } else {
        TokenLevel::Fresh
    }
}

fn token_message(token: &TokenRecord, now: DateTime<Utc>) -> String {
    let remaining = token.expires_at - now;
    if remaining <= Duration::zero() {
        return format!("{} OAuth token has expired", token.service);
    }
    let days = remaining.num_days();
    if days >= 1 {
        format!(
            "{} OAuth token expires in {days} day{}",
            token.service,
            if days == 1 { "" } else { "s" }
        )
    } else {
        let hours = remaining.num_hours().max(1);
        format!(
            "{} OAuth token expires in {hours} hour{}",
            token.service,
            if hours == 1 { "" } else { "s" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn health_alerts(payloads: &[EventPayload]) -> Vec<&HealthAlert> {
        payloads
            .iter()
            .filter_map(|p| match p {
                EventPayload::Health(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn fresh_token_raises_nothing() {
        let monitor = HealthMonitor::new(Thresholds::default());
        monitor.register_oauth_token("linear", now() + Duration::days(30), true);
        assert!(monitor.evaluate(now()).is_empty());
        assert_eq!(monitor.report(now()).overall, HealthStatus::Healthy);
    }

    #[test]
    fn token_levels_follow_thresholds() {
        let monitor = HealthMonitor::new(Thresholds::default());
        monitor.register_oauth_token("confluence", now() + Duration::days(5), true);
        monitor.register_oauth_token("linear", now() + Duration::hours(6), false);
        monitor.register_oauth_token("slack", now() - Duration::minutes(1), false);

        let payloads = monitor.evaluate(now());
        let alerts = health_alerts(&payloads);
        assert_eq!(alerts.len(), 3);

        let confluence = alerts.iter().find(|a| a.component == "oauth:confluence").unwrap();
        assert_eq!(confluence.status, HealthStatus::Degraded);
        assert_eq!(confluence.severity, Severity::Medium);
        assert_eq!(confluence.message, "confluence OAuth token expires in 5 days");

        let linear = alerts.iter().find(|a| a.component == "oauth:linear").unwrap();
        assert_eq!(linear.severity, Severity::Critical);
        assert_eq!(linear.action_required.as_deref(), Some("Re-authorize linear"));

        let slack = alerts.iter().find(|a| a.component == "oauth:slack").unwrap();
        assert_eq!(slack.status, HealthStatus::Down);
        assert!(payloads.iter().any(|p| p.is_critical()));
    }

    #[test]
    fn usage_warning_and_critical_lines() {
        let monitor = HealthMonitor::new(Thresholds::default());
        let reset = now() + Duration::hours(1);
        monitor.update_api_usage("linear", 50.0, 100.0, reset);
        monitor.update_api_usage("confluence", 85.0, 100.0, reset);
        monitor.update_api_usage("openai", 97.0, 100.0, reset);

        let payloads = monitor.evaluate(now());
        let budgets: Vec<_> = payloads
            .iter()
            .filter_map(|p| match p {
                EventPayload::Budget(b) => Some(b.resource_type.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(budgets, vec!["api:confluence", "api:openai"]);

        let alerts = health_alerts(&payloads);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].component, "api:openai");
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(payloads[0].dedup_key(), "api:confluence");
    }

    #[test]
    fn zero_limit_is_ignored() {
        let monitor = HealthMonitor::new(Thresholds::default());
        monitor.update_api_usage("linear", 10.0, 0.0, now());
        assert!(monitor.evaluate(now()).is_empty());
        let report = monitor.report(now());
        assert_eq!(report.components[0].detail, "no limit reported");
    }

    #[test]
    fn report_overall_is_worst_component() {
        let monitor = HealthMonitor::new(Thresholds::default());
        monitor.register_oauth_token("linear", now() + Duration::days(3), true);
        monitor.update_api_usage("confluence", 96.0, 100.0, now());

        let report = monitor.report(now());
        assert_eq!(report.components.len(), 2);
        assert_eq!(report.overall, HealthStatus::Unhealthy);

        monitor.register_oauth_token("linear", now() - Duration::days(1), true);
        assert_eq!(monitor.report(now()).overall, HealthStatus::Down);
    }

    #[test]
    fn thresholds_can_be_replaced() {
        let monitor = HealthMonitor::new(Thresholds::default());
        monitor.register_oauth_token("linear", now() + Duration::days(10), true);
        assert!(monitor.evaluate(now()).is_empty());

        monitor.set_thresholds(Thresholds {
            token_expiry_warning_days: 14,
            ..Thresholds::default()
        });
        assert_eq!(monitor.evaluate(now()).len(), 1);
        assert_eq!(monitor.tracked_tokens(), 1);
    }
}
