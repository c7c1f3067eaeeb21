use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NotifyError;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Planning,
    Sync,
    Health,
    Budget,
    Workflow,
    Agent,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Planning,
            Category::Sync,
            Category::Health,
            Category::Budget,
            Category::Workflow,
            Category::Agent,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Planning => "planning",
            Category::Sync => "sync",
            Category::Health => "health",
            Category::Budget => "budget",
            Category::Workflow => "workflow",
            Category::Agent => "agent",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(Category::Planning),
            "sync" => Ok(Category::Sync),
            "health" => Ok(Category::Health),
            "budget" => Ok(Category::Budget),
            "workflow" => Ok(Category::Workflow),
            "agent" => Ok(Category::Agent),
            _ => Err(NotifyError::InvalidCategory(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(NotifyError::InvalidSeverity(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// HealthStatus
// ---------------------------------------------------------------------------

/// Ordered from best to worst so `max()` yields the overall status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Down,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Down => "down",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HealthStatus {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HealthStatus::Healthy),
            "degraded" => Ok(HealthStatus::Degraded),
            "unhealthy" => Ok(HealthStatus::Unhealthy),
            "down" => Ok(HealthStatus::Down),
            _ => Err(NotifyError::InvalidStatus {
                kind: "health status",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Scheduled,
    Manual,
    Webhook,
}

impl SyncType {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncType::Scheduled => "scheduled",
            SyncType::Manual => "manual",
            SyncType::Webhook => "webhook",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncType {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(SyncType::Scheduled),
            "manual" => Ok(SyncType::Manual),
            "webhook" => Ok(SyncType::Webhook),
            _ => Err(NotifyError::InvalidStatus {
                kind: "sync type",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowEventType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEventType {
    IssueCreated,
    IssueUpdated,
    StatusChanged,
    CommentAdded,
    PagePublished,
    ReviewRequested,
}

impl WorkflowEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowEventType::IssueCreated => "issue_created",
            WorkflowEventType::IssueUpdated => "issue_updated",
            WorkflowEventType::StatusChanged => "status_changed",
            WorkflowEventType::CommentAdded => "comment_added",
            WorkflowEventType::PagePublished => "page_published",
            WorkflowEventType::ReviewRequested => "review_requested",
        }
    }

    /// Human-readable label used in message headlines.
    pub fn label(self) -> &'static str {
        match self {
            WorkflowEventType::IssueCreated => "Issue Created",
            WorkflowEventType::IssueUpdated => "Issue Updated",
            WorkflowEventType::StatusChanged => "Status Changed",
            WorkflowEventType::CommentAdded => "Comment Added",
            WorkflowEventType::PagePublished => "Page Published",
            WorkflowEventType::ReviewRequested => "Review Requested",
        }
    }
}

impl fmt::Display for WorkflowEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowEventType {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issue_created" | "issue-created" => Ok(WorkflowEventType::IssueCreated),
            "issue_updated" | "issue-updated" => Ok(WorkflowEventType::IssueUpdated),
            "status_changed" | "status-changed" => Ok(WorkflowEventType::StatusChanged),
            "comment_added" | "comment-added" => Ok(WorkflowEventType::CommentAdded),
            "page_published" | "page-published" => Ok(WorkflowEventType::PagePublished),
            "review_requested" | "review-requested" => Ok(WorkflowEventType::ReviewRequested),
            _ => Err(NotifyError::InvalidStatus {
                kind: "workflow event type",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Blocked,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WorkflowStatus::Pending),
            "in_progress" | "in-progress" => Ok(WorkflowStatus::InProgress),
            "completed" => Ok(WorkflowStatus::Completed),
            "failed" => Ok(WorkflowStatus::Failed),
            "blocked" => Ok(WorkflowStatus::Blocked),
            _ => Err(NotifyError::InvalidStatus {
                kind: "workflow status",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Assigned,
    Started,
    InProgress,
    Completed,
    Failed,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Assigned => "assigned",
            AgentStatus::Started => "started",
            AgentStatus::InProgress => "in_progress",
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(AgentStatus::Assigned),
            "started" => Ok(AgentStatus::Started),
            "in_progress" | "in-progress" => Ok(AgentStatus::InProgress),
            "completed" => Ok(AgentStatus::Completed),
            "failed" => Ok(AgentStatus::Failed),
            _ => Err(NotifyError::InvalidStatus {
                kind: "agent status",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn all() -> &'static [Environment] {
        &[
            Environment::Development,
            Environment::Staging,
            Environment::Production,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(NotifyError::InvalidEnvironment(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
