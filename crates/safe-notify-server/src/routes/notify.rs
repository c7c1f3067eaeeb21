use axum::extract::State;
use axum::Json;
use safe_notify_core::event::{
    AgentUpdate, BudgetAlert, HealthAlert, PlanningStatistics, SyncStatus, WorkflowEvent,
};
use serde::Serialize;

use crate::state::AppState;

/// Body of every notify response. Delivery failures are reported here, not
/// as HTTP errors.
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub delivered: bool,
}

impl From<bool> for DeliveryResponse {
    fn from(delivered: bool) -> Self {
        Self { delivered }
    }
}

/// POST /api/notify/planning
pub async fn planning(
    State(app): State<AppState>,
    Json(body): Json<PlanningStatistics>,
) -> Json<DeliveryResponse> {
    let delivered = app
        .coordinator
        .notify_planning_completion(
            &body.planning_title,
            body.epic_count,
            body.feature_count,
            body.story_count,
            body.enabler_count,
            body.duration_minutes,
            &body.source_document,
            body.source_url.as_deref(),
        )
        .await;
    Json(delivered.into())
}

/// POST /api/notify/sync
pub async fn sync(
    State(app): State<AppState>,
    Json(body): Json<SyncStatus>,
) -> Json<DeliveryResponse> {
    Json(app.coordinator.notify_sync_status(body).await.into())
}

/// POST /api/notify/health
pub async fn health(
    State(app): State<AppState>,
    Json(body): Json<HealthAlert>,
) -> Json<DeliveryResponse> {
    Json(app.coordinator.notify_health_alert(body).await.into())
}

/// POST /api/notify/budget
pub async fn budget(
    State(app): State<AppState>,
    Json(body): Json<BudgetAlert>,
) -> Json<DeliveryResponse> {
    Json(app.coordinator.notify_budget_alert(body).await.into())
}

/// POST /api/notify/workflow
pub async fn workflow(
    State(app): State<AppState>,
    Json(body): Json<WorkflowEvent>,
) -> Json<DeliveryResponse> {
    let delivered = app
        .coordinator
        .notify_workflow_update(
            body.event_type,
            &body.title,
            &body.description,
            body.status,
            body.url.as_deref(),
            body.assignee.as_deref(),
        )
        .await;
    Json(delivered.into())
}

/// POST /api/notify/agent
pub async fn agent(
    State(app): State<AppState>,
    Json(body): Json<AgentUpdate>,
) -> Json<DeliveryResponse> {
    let delivered = app
        .coordinator
        .notify_agent_update(
            &body.agent_id,
            &body.agent_type,
            body.status,
            &body.task_title,
            &body.message,
            body.task_url.as_deref(),
            body.assignee.as_deref(),
        )
        .await;
    Json(delivered.into())
}
