use crate::output::print_json;
use crate::settings::Settings;
use chrono::Utc;
use clap::Subcommand;
use safe_notify_core::event::{BudgetAlert, HealthAlert, SyncStatus};
use safe_notify_core::types::{
    AgentStatus, Category, HealthStatus, Severity, SyncType, WorkflowEventType, WorkflowStatus,
};
use safe_notify_core::NotificationCoordinator;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum NotifySubcommand {
    /// Announce a finished PI planning run
    Planning {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "0")]
        epics: u32,
        #[arg(long, default_value = "0")]
        features: u32,
        #[arg(long, default_value = "0")]
        stories: u32,
        #[arg(long, default_value = "0")]
        enablers: u32,
        /// Planning duration in minutes
        #[arg(long, default_value = "0")]
        duration: f64,
        /// Name of the source planning document
        #[arg(long)]
        source: String,
        #[arg(long)]
        url: Option<String>,
    },

    /// Report a Linear/Confluence sync run
    Sync {
        /// scheduled, manual, or webhook
        #[arg(long = "type", value_name = "TYPE", default_value = "scheduled")]
        sync_type: SyncType,
        #[arg(long, default_value = "0")]
        linear: u32,
        #[arg(long, default_value = "0")]
        confluence: u32,
        #[arg(long, default_value = "0")]
        conflicts_detected: u32,
        #[arg(long, default_value = "0")]
        conflicts_resolved: u32,
        #[arg(long, default_value = "0")]
        conflicts_pending: u32,
        /// Minutes until the next scheduled sync
        #[arg(long, default_value = "30")]
        next_sync: u32,
        /// Sync error message (repeatable)
        #[arg(long = "error", value_name = "MESSAGE")]
        errors: Vec<String>,
    },

    /// Report a workflow event (issue, page, review)
    Workflow {
        /// issue_created, issue_updated, status_changed, comment_added,
        /// page_published, or review_requested
        #[arg(long = "event", value_name = "EVENT")]
        event_type: WorkflowEventType,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// pending, in_progress, completed, failed, or blocked
        #[arg(long, default_value = "pending")]
        status: WorkflowStatus,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
    },

    /// Report progress from a remote agent
    Agent {
        #[arg(long = "id", value_name = "ID")]
        agent_id: String,
        #[arg(long)]
        agent_type: String,
        /// assigned, started, in_progress, completed, or failed
        #[arg(long)]
        status: AgentStatus,
        #[arg(long = "task", value_name = "TITLE")]
        task_title: String,
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long)]
        task_url: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
    },

    /// Raise a system health alert
    Health {
        #[arg(long)]
        component: String,
        /// healthy, degraded, unhealthy, or down
        #[arg(long)]
        status: HealthStatus,
        /// low, medium, high, or critical
        #[arg(long)]
        severity: Severity,
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long)]
        action: Option<String>,
    },

    /// Raise a budget alert for an API or resource
    Budget {
        #[arg(long)]
        resource: String,
        #[arg(long)]
        usage: f64,
        #[arg(long)]
        limit: f64,
        /// e.g. hour, day, month
        #[arg(long, default_value = "day")]
        timeframe: String,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(settings: &Settings, subcmd: NotifySubcommand, json: bool) -> anyhow::Result<()> {
    let coordinator = settings.build_coordinator()?;
    let rt = tokio::runtime::Runtime::new()?;
    let (category, delivered) = rt.block_on(send(&coordinator, subcmd));

    if json {
        print_json(&serde_json::json!({
            "category": category,
            "delivered": delivered,
            "dry_run": settings.dry_run,
        }))?;
    } else if delivered {
        println!("Delivered {category} notification.");
    }

    if !delivered {
        anyhow::bail!("{category} notification was not delivered (disabled, throttled, or sink failure)");
    }
    Ok(())
}

async fn send(coordinator: &NotificationCoordinator, subcmd: NotifySubcommand) -> (Category, bool) {
    match subcmd {
        NotifySubcommand::Planning {
            title,
            epics,
            features,
            stories,
            enablers,
            duration,
            source,
            url,
        } => {
            let delivered = coordinator
                .notify_planning_completion(
                    &title,
                    epics,
                    features,
                    stories,
                    enablers,
                    duration,
                    &source,
                    url.as_deref(),
                )
                .await;
            (Category::Planning, delivered)
        }
        NotifySubcommand::Sync {
            sync_type,
            linear,
            confluence,
            conflicts_detected,
            conflicts_resolved,
            conflicts_pending,
            next_sync,
            errors,
        } => {
            let status = SyncStatus {
                sync_type,
                linear_updates: linear,
                confluence_updates: confluence,
                conflicts_detected,
                conflicts_resolved,
                conflicts_pending,
                next_sync_minutes: next_sync,
                errors,
                created_at: Utc::now(),
            };
            (Category::Sync, coordinator.notify_sync_status(status).await)
        }
        NotifySubcommand::Workflow {
            event_type,
            title,
            description,
            status,
            url,
            assignee,
        } => {
            let delivered = coordinator
                .notify_workflow_update(
                    event_type,
                    &title,
                    &description,
                    status,
                    url.as_deref(),
                    assignee.as_deref(),
                )
                .await;
            (Category::Workflow, delivered)
        }
        NotifySubcommand::Agent {
            agent_id,
            agent_type,
            status,
            task_title,
            message,
            task_url,
            assignee,
        } => {
            let delivered = coordinator
                .notify_agent_update(
                    &agent_id,
                    &agent_type,
                    status,
                    &task_title,
                    &message,
                    task_url.as_deref(),
                    assignee.as_deref(),
                )
                .await;
            (Category::Agent, delivered)
        }
        NotifySubcommand::Health {
            component,
            status,
            severity,
            message,
            action,
        } => {
            let alert = HealthAlert {
                component,
                status,
                severity,
                message,
                action_required: action,
                created_at: Utc::now(),
            };
            (Category::Health, coordinator.notify_health_alert(alert).await)
        }
        NotifySubcommand::Budget {
            resource,
            usage,
            limit,
            timeframe,
        } => {
            let alert = BudgetAlert {
                resource_type: resource,
                current_usage: usage,
                limit,
                timeframe,
                created_at: Utc::now(),
            };
            (Category::Budget, coordinator.notify_budget_alert(alert).await)
        }
    }
}
