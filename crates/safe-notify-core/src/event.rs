use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    AgentStatus, Category, HealthStatus, Severity, SyncType, WorkflowEventType, WorkflowStatus,
};

// ---------------------------------------------------------------------------
// Per-category payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningStatistics {
    pub planning_title: String,
    #[serde(default)]
    pub epic_count: u32,
    #[serde(default)]
    pub feature_count: u32,
    #[serde(default)]
    pub story_count: u32,
    #[serde(default)]
    pub enabler_count: u32,
    #[serde(default)]
    pub duration_minutes: f64,
    pub source_document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub sync_type: SyncType,
    #[serde(default)]
    pub linear_updates: u32,
    #[serde(default)]
    pub confluence_updates: u32,
    #[serde(default)]
    pub conflicts_detected: u32,
    #[serde(default)]
    pub conflicts_resolved: u32,
    #[serde(default)]
    pub conflicts_pending: u32,
    #[serde(default)]
    pub next_sync_minutes: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlert {
    pub component: String,
    pub status: HealthStatus,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_required: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    pub resource_type: String,
    pub current_usage: f64,
    pub limit: f64,
    pub timeframe: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl BudgetAlert {
    /// Usage as a percentage of the limit; `None` when the limit is not a
    /// positive finite number.
    pub fn usage_percent(&self) -> Option<f64> {
        if self.limit.is_finite() && self.limit > 0.0 && self.current_usage.is_finite() {
            Some(self.current_usage / self.limit * 100.0)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub event_type: WorkflowEventType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentUpdate {
    pub agent_id: String,
    pub agent_type: String,
    pub status: AgentStatus,
    pub task_title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// One notification-worthy event. The variant decides formatting, routing
/// and the throttle dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum EventPayload {
    Planning(PlanningStatistics),
    Sync(SyncStatus),
    Health(HealthAlert),
    Budget(BudgetAlert),
    Workflow(WorkflowEvent),
    Agent(AgentUpdate),
}

impl EventPayload {
    pub fn category(&self) -> Category {
        match self {
            EventPayload::Planning(_) => Category::Planning,
            EventPayload::Sync(_) => Category::Sync,
            EventPayload::Health(_) => Category::Health,
            EventPayload::Budget(_) => Category::Budget,
            EventPayload::Workflow(_) => Category::Workflow,
            EventPayload::Agent(_) => Category::Agent,
        }
    }

    /// Identity of "the same logical event" within the category.
    pub fn dedup_key(&self) -> String {
        match self {
            EventPayload::Planning(p) => p.planning_title.clone(),
            EventPayload::Sync(s) => s.sync_type.as_str().to_string(),
            EventPayload::Health(h) => h.component.clone(),
            EventPayload::Budget(b) => b.resource_type.clone(),
            EventPayload::Workflow(w) => format!("{}:{}", w.event_type, w.title),
            EventPayload::Agent(a) => format!("{}:{}", a.agent_id, a.status),
        }
    }

    /// Only critical health alerts are eligible to skip the throttle gate.
    pub fn is_critical(&self) -> bool {
        matches!(self, EventPayload::Health(h) if h.severity == Severity::Critical)
    }
}

impl From<PlanningStatistics> for EventPayload {
    fn from(p: PlanningStatistics) -> Self {
        EventPayload::Planning(p)
    }
}

impl From<SyncStatus> for EventPayload {
    fn from(s: SyncStatus) -> Self {
        EventPayload::Sync(s)
    }
}

impl From<HealthAlert> for EventPayload {
    fn from(h: HealthAlert) -> Self {
        EventPayload::Health(h)
    }
}

impl From<BudgetAlert> for EventPayload {
    fn from(b: BudgetAlert) -> Self {
        EventPayload::Budget(b)
    }
}

impl From<WorkflowEvent> for EventPayload {
    fn from(w: WorkflowEvent) -> Self {
        EventPayload::Workflow(w)
    }
}

impl From<AgentUpdate> for EventPayload {
    fn from(a: AgentUpdate) -> Self {
        EventPayload::Agent(a)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
