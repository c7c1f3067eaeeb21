//! Channel formatter: turns an [`EventPayload`] into Slack mrkdwn text.
//!
//! Every function here is pure and total. Odd input (blank titles, huge
//! descriptions, zero limits, NaN durations) degrades to a readable partial
//! message instead of failing the pipeline.

use crate::event::{
    AgentUpdate, BudgetAlert, EventPayload, HealthAlert, PlanningStatistics, SyncStatus,
    WorkflowEvent,
};
use crate::types::{AgentStatus, HealthStatus, Severity, WorkflowEventType, WorkflowStatus};

/// Longest free-text field rendered before truncation, in characters.
pub const MAX_TEXT_CHARS: usize = 500;

const ERROR_DELIMITER: &str = "; ";

pub fn format(payload: &EventPayload) -> String {
    match payload {
        EventPayload::Planning(p) => format_planning(p),
        EventPayload::Sync(s) => format_sync(s),
        EventPayload::Health(h) => format_health(h),
        EventPayload::Budget(b) => format_budget(b),
        EventPayload::Workflow(w) => format_workflow(w),
        EventPayload::Agent(a) => format_agent(a),
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

pub fn format_planning(p: &PlanningStatistics) -> String {
    let mut lines = vec![format!(
        "🎯 *PI Planning Complete: {}*",
        title_or_placeholder(&p.planning_title)
    )];

    let items: Vec<String> = [
        count_noun(p.epic_count, "Epic", "Epics"),
        count_noun(p.feature_count, "Feature", "Features"),
        count_noun(p.story_count, "Story", "Stories"),
        count_noun(p.enabler_count, "Enabler", "Enablers"),
    ]
    .into_iter()
    .flatten()
    .collect();
    if items.is_empty() {
        lines.push("📊 Created: no work items".to_string());
    } else {
        lines.push(format!("📊 Created: {}", items.join(", ")));
    }

    lines.push(format!(
        "⏱️ Duration: {:.1} minutes",
        non_negative(p.duration_minutes)
    ));
    if !p.source_document.trim().is_empty() {
        lines.push(format!("📄 Source: {}", escape(&p.source_document)));
    }
    if let Some(url) = present(&p.source_url) {
        lines.push(format!("🔗 <{}|View source document>", link_target(url)));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

pub fn format_sync(s: &SyncStatus) -> String {
    let headline = if s.errors.is_empty() {
        format!("🔄 *Linear ↔ Confluence Sync Complete* ({})", s.sync_type)
    } else {
        format!(
            "⚠️ *Linear ↔ Confluence Sync Finished with Errors* ({})",
            s.sync_type
        )
    };
    let mut lines = vec![headline];

    let updates: Vec<String> = [
        nonzero(s.linear_updates).map(|n| format!("{n} Linear")),
        nonzero(s.confluence_updates).map(|n| format!("{n} Confluence")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if updates.is_empty() {
        lines.push("📥 Updates: none".to_string());
    } else {
        lines.push(format!("📥 Updates: {}", updates.join(", ")));
    }

    let conflicts: Vec<String> = [
        nonzero(s.conflicts_detected).map(|n| format!("{n} detected")),
        nonzero(s.conflicts_resolved).map(|n| format!("{n} resolved")),
        nonzero(s.conflicts_pending).map(|n| format!("{n} pending")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !conflicts.is_empty() {
        lines.push(format!("⚔️ Conflicts: {}", conflicts.join(", ")));
    }

    if let Some(minutes) = count_noun(s.next_sync_minutes, "minute", "minutes") {
        lines.push(format!("⏭️ Next sync in {minutes}"));
    }

    let errors: Vec<String> = s
        .errors
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(escape)
        .collect();
    if !errors.is_empty() {
        lines.push(format!(
            "❌ Errors ({}): {}",
            errors.len(),
            truncate(&errors.join(ERROR_DELIMITER), MAX_TEXT_CHARS)
        ));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub fn format_health(h: &HealthAlert) -> String {
    let mut lines = vec![
        format!(
            "{} *System Health Alert: {}*",
            severity_emoji(h.severity),
            title_or_placeholder(&h.component)
        ),
        format!(
            "Status: {} {} · Severity: {}",
            health_emoji(h.status),
            h.status,
            h.severity
        ),
    ];
    if !h.message.trim().is_empty() {
        lines.push(truncate(&escape(h.message.trim()), MAX_TEXT_CHARS));
    }
    if let Some(action) = present(&h.action_required) {
        lines.push(format!("⚡ Action required: {}", escape(action)));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

pub fn format_budget(b: &BudgetAlert) -> String {
    let percent = b.usage_percent();
    let headline = match percent {
        Some(p) if p >= 100.0 => "🛑 *Budget Exceeded*",
        _ => "💰 *Budget Alert*",
    };
    let mut lines = vec![format!(
        "{headline}: {}",
        title_or_placeholder(&b.resource_type)
    )];

    let timeframe = b.timeframe.trim();
    let per = if timeframe.is_empty() {
        String::new()
    } else {
        format!(" per {}", escape(timeframe))
    };
    let usage = format!(
        "Usage: {} / {}{per}",
        amount(b.current_usage),
        amount(b.limit)
    );
    match percent {
        Some(p) => lines.push(format!("{usage} ({p:.1}%)")),
        None => lines.push(format!("{usage} (limit not set)")),
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

pub fn format_workflow(w: &WorkflowEvent) -> String {
    let mut lines = vec![format!(
        "{} *{}: {}*",
        workflow_event_emoji(w.event_type),
        w.event_type.label(),
        title_or_placeholder(&w.title)
    )];
    if !w.description.trim().is_empty() {
        lines.push(truncate(&escape(w.description.trim()), MAX_TEXT_CHARS));
    }
    lines.push(format!(
        "Status: {} {}",
        workflow_status_emoji(w.status),
        w.status
    ));
    if let Some(assignee) = present(&w.assignee) {
        lines.push(format!("👤 Assignee: {}", escape(assignee)));
    }
    if let Some(url) = present(&w.url) {
        lines.push(format!("🔗 <{}|Open>", link_target(url)));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

pub fn format_agent(a: &AgentUpdate) -> String {
    let agent_type = a.agent_type.trim();
    let mut headline = format!(
        "🤖 *Agent Update: {}*",
        title_or_placeholder(&a.agent_id)
    );
    if !agent_type.is_empty() {
        headline.push_str(&format!(" ({})", escape(agent_type)));
    }

    let mut lines = vec![
        headline,
        format!("📋 Task: {}", title_or_placeholder(&a.task_title)),
        format!("Status: {} {}", agent_status_emoji(a.status), a.status),
    ];
    if !a.message.trim().is_empty() {
        lines.push(truncate(&escape(a.message.trim()), MAX_TEXT_CHARS));
    }
    if let Some(assignee) = present(&a.assignee) {
        lines.push(format!("👤 Assignee: {}", escape(assignee)));
    }
    if let Some(url) = present(&a.task_url) {
        lines.push(format!("🔗 <{}|View task>", link_target(url)));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Emoji tables
// ---------------------------------------------------------------------------

fn severity_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "ℹ️",
        Severity::Medium => "⚠️",
        Severity::High => "🔶",
        Severity::Critical => "🚨",
    }
}

fn health_emoji(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Healthy => "🟢",
        HealthStatus::Degraded => "🟡",
        HealthStatus::Unhealthy => "🟠",
        HealthStatus::Down => "🔴",
    }
}

fn workflow_event_emoji(event_type: WorkflowEventType) -> &'static str {
    match event_type {
        WorkflowEventType::IssueCreated => "🆕",
        WorkflowEventType::IssueUpdated => "✏️",
        WorkflowEventType::StatusChanged => "🔀",
        WorkflowEventType::CommentAdded => "💬",
        WorkflowEventType::PagePublished => "📄",
        WorkflowEventType::ReviewRequested => "👀",
    }
}

fn workflow_status_emoji(status: WorkflowStatus) -> &'static str {
    match status {
        WorkflowStatus::Pending => "⏳",
        WorkflowStatus::InProgress => "🔄",
        WorkflowStatus::Completed => "✅",
        WorkflowStatus::Failed => "❌",
        WorkflowStatus::Blocked => "🚧",
    }
}

fn agent_status_emoji(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Assigned => "📋",
        AgentStatus::Started => "▶️",
        AgentStatus::InProgress => "🔄",
        AgentStatus::Completed => "✅",
        AgentStatus::Failed => "❌",
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn nonzero(n: u32) -> Option<u32> {
    (n > 0).then_some(n)
}

/// `"1 Epic"`, `"3 Epics"`, or `None` for zero.
fn count_noun(count: u32, singular: &str, plural: &str) -> Option<String> {
    match count {
        0 => None,
        1 => Some(format!("1 {singular}")),
        n => Some(format!("{n} {plural}")),
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn title_or_placeholder(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        "(untitled)".to_string()
    } else {
        truncate(&escape(title), MAX_TEXT_CHARS)
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn amount(value: f64) -> String {
    if !value.is_finite() {
        "n/a".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Escape the three characters Slack treats as control sequences.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A URL safe to place inside `<url|label>`: control characters escaped and
/// `|` percent-encoded so the label separator stays unambiguous.
fn link_target(url: &str) -> String {
    escape(url).replace('|', "%7C")
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
