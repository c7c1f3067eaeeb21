use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use safe_notify_core::health::HealthReport;
use safe_notify_core::CoordinatorStats;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/health: per-component status with the overall worst-of.
pub async fn get_health(State(app): State<AppState>) -> Json<HealthReport> {
    Json(app.coordinator.get_health_status())
}

/// GET /api/stats
pub async fn get_stats(State(app): State<AppState>) -> Json<CoordinatorStats> {
    Json(app.coordinator.get_coordinator_stats())
}

#[derive(Deserialize)]
pub struct RegisterTokenBody {
    service: String,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// POST /api/health/tokens: start (or refresh) tracking an OAuth token.
pub async fn register_token(
    State(app): State<AppState>,
    Json(body): Json<RegisterTokenBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = body.service.trim();
    if service.is_empty() {
        return Err(AppError::bad_request("service must not be empty"));
    }
    app.coordinator
        .register_oauth_token(service, body.expires_at, body.refresh_token.as_deref());
    Ok(Json(serde_json::json!({
        "service": service,
        "tracked_tokens": app.coordinator.get_coordinator_stats().tracked_tokens,
    })))
}

#[derive(Deserialize)]
pub struct UpdateUsageBody {
    service: String,
    usage: f64,
    limit: f64,
    reset_time: DateTime<Utc>,
}

/// POST /api/health/usage: record the latest API usage for a service.
pub async fn update_usage(
    State(app): State<AppState>,
    Json(body): Json<UpdateUsageBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = body.service.trim();
    if service.is_empty() {
        return Err(AppError::bad_request("service must not be empty"));
    }
    if !body.usage.is_finite() || body.usage < 0.0 || !body.limit.is_finite() || body.limit < 0.0 {
        return Err(AppError::bad_request(
            "usage and limit must be non-negative numbers",
        ));
    }
    app.coordinator
        .update_api_usage(service, body.usage, body.limit, body.reset_time);
    Ok(Json(serde_json::json!({
        "service": service,
        "tracked_services": app.coordinator.get_coordinator_stats().tracked_services,
    })))
}
