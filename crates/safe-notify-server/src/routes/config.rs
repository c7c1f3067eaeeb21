use axum::extract::State;
use axum::Json;
use safe_notify_core::{NotificationConfig, NotificationConfigPatch};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config: the live notification configuration.
pub async fn get_config(State(app): State<AppState>) -> Json<NotificationConfig> {
    Json(app.coordinator.config())
}

/// PATCH /api/config: merge a partial update; unspecified keys keep their
/// current values. Returns the resulting configuration, or 400 when the
/// result would be invalid.
pub async fn update_config(
    State(app): State<AppState>,
    Json(patch): Json<NotificationConfigPatch>,
) -> Result<Json<NotificationConfig>, AppError> {
    Ok(Json(app.coordinator.update_config(&patch)?))
}
