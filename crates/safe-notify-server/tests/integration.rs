use std::sync::Arc;

use axum::http::StatusCode;
use http_body_util::BodyExt;
use safe_notify_core::config::create_default_config;
use safe_notify_core::types::{Category, Environment};
use safe_notify_core::{MemorySink, NotificationCoordinator};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn app_with(sink: Arc<MemorySink>, environment: Environment) -> axum::Router {
    let coordinator =
        NotificationCoordinator::new(create_default_config(environment), sink).unwrap();
    safe_notify_server::build_router(Arc::new(coordinator))
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None).await
}

async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(body)).await
}

fn planning_body() -> serde_json::Value {
    serde_json::json!({
        "planning_title": "Q1 Planning",
        "epic_count": 1,
        "feature_count": 3,
        "story_count": 8,
        "enabler_count": 0,
        "duration_minutes": 4.2,
        "source_document": "PI Doc"
    })
}

// ---------------------------------------------------------------------------
// Notify
// ---------------------------------------------------------------------------

#[tokio::test]
async fn planning_notification_is_delivered() {
    let sink = Arc::new(MemorySink::new());
    let app = app_with(sink.clone(), Environment::Development);

    let (status, body) = post_json(app, "/api/notify/planning", planning_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], true);

    let sent = sink.last().unwrap();
    assert_eq!(sent.category, Category::Planning);
    assert!(sent.text.contains("1 Epic, 3 Features, 8 Stories"));
}

#[tokio::test]
async fn sink_failure_is_200_with_delivered_false() {
    let sink = Arc::new(MemorySink::failing());
    let app = app_with(sink.clone(), Environment::Development);

    let (status, body) = post_json(
        app,
        "/api/notify/workflow",
        serde_json::json!({
            "event_type": "issue_created",
            "title": "Add SSO",
            "description": "New epic",
            "status": "pending"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], false);
    assert_eq!(sink.attempts(), 1);
}

#[tokio::test]
async fn workflow_notification_keeps_url_and_assignee() {
    let sink = Arc::new(MemorySink::new());
    let app = app_with(sink.clone(), Environment::Development);

    let (status, body) = post_json(
        app,
        "/api/notify/workflow",
        serde_json::json!({
            "event_type": "review_requested",
            "title": "Checkout epic",
            "description": "Ready for review",
            "status": "in_progress",
            "url": "https://linear.app/acme/issue/PI-7?view=a|b",
            "assignee": "ana"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], true);

    let sent = sink.last().unwrap();
    assert_eq!(sent.category, Category::Workflow);
    assert_eq!(sent.channel.as_deref(), Some("#workflow"));
    assert!(sent.text.contains("Assignee: ana"));
    assert!(sent.text.contains("<https://linear.app/acme/issue/PI-7?view=a%7Cb|Open>"));
}

#[tokio::test]
async fn budget_notification_routes_to_health_channel() {
    let sink = Arc::new(MemorySink::new());
    let app = app_with(sink.clone(), Environment::Staging);

    let (status, body) = post_json(
        app,
        "/api/notify/budget",
        serde_json::json!({
            "resource_type": "openai",
            "current_usage": 90.0,
            "limit": 100.0,
            "timeframe": "day"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], true);
    assert_eq!(sink.last().unwrap().channel.as_deref(), Some("#system-health"));
}

#[tokio::test]
async fn repeated_agent_updates_are_throttled_in_production() {
    let sink = Arc::new(MemorySink::new());
    let app = app_with(sink.clone(), Environment::Production);
    let update = serde_json::json!({
        "agent_id": "agent-7",
        "agent_type": "story-writer",
        "status": "in_progress",
        "task_title": "Write stories",
        "message": "Working"
    });

    let mut delivered = Vec::new();
    for _ in 0..4 {
        let (_, body) = post_json(app.clone(), "/api/notify/agent", update.clone()).await;
        delivered.push(body["delivered"].as_bool().unwrap());
    }
    assert_eq!(delivered, vec![true, true, true, false]);
    assert_eq!(sink.attempts(), 3);
}

#[tokio::test]
async fn unknown_enum_value_is_rejected_by_extractor() {
    let sink = Arc::new(MemorySink::new());
    let app = app_with(sink.clone(), Environment::Development);

    let (status, _) = post_json(
        app,
        "/api/notify/health",
        serde_json::json!({
            "component": "linear",
            "status": "on_fire",
            "severity": "critical",
            "message": "bad"
        }),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(sink.attempts(), 0);
}

// ---------------------------------------------------------------------------
// Health and stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn token_registration_shows_up_in_health_report() {
    let sink = Arc::new(MemorySink::new());
    let app = app_with(sink, Environment::Development);

    let expires_at = chrono::Utc::now() - chrono::Duration::hours(2);
    let (status, body) = post_json(
        app.clone(),
        "/api/health/tokens",
        serde_json::json!({ "service": "linear", "expires_at": expires_at }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tracked_tokens"], 1);

    let (status, report) = get(app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["overall"], "down");
    assert_eq!(report["components"][0]["component"], "oauth:linear");
}

#[tokio::test]
async fn usage_with_blank_service_is_400() {
    let app = app_with(Arc::new(MemorySink::new()), Environment::Development);
    let (status, body) = post_json(
        app,
        "/api/health/usage",
        serde_json::json!({
            "service": "  ",
            "usage": 1.0,
            "limit": 10.0,
            "reset_time": chrono::Utc::now()
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("service"));
}

#[tokio::test]
async fn stats_report_environment_and_counters() {
    let sink = Arc::new(MemorySink::new());
    let app = app_with(sink, Environment::Staging);

    post_json(app.clone(), "/api/notify/planning", planning_body()).await;
    let (status, stats) = get(app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["environment"], "staging");
    assert_eq!(stats["dispatcher"]["sent"], 1);
    assert_eq!(stats["dispatcher"]["sent_by_category"]["planning"], 1);
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[tokio::test]
async fn patch_config_changes_only_given_keys() {
    let sink = Arc::new(MemorySink::new());
    let app = app_with(sink.clone(), Environment::Development);

    let (status, updated) = send(
        app.clone(),
        "PATCH",
        "/api/config",
        Some(serde_json::json!({ "channels": { "planning": "#art-sync" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["channels"]["planning"], "#art-sync");
    assert_eq!(updated["channels"]["sync"], "#linear-sync");
    assert_eq!(updated["throttling"]["max_per_window"], 10);

    let (_, current) = get(app.clone(), "/api/config").await;
    assert_eq!(current, updated);

    post_json(app, "/api/notify/planning", planning_body()).await;
    assert_eq!(sink.last().unwrap().channel.as_deref(), Some("#art-sync"));
}

#[tokio::test]
async fn patch_config_rejects_zero_window() {
    let app = app_with(Arc::new(MemorySink::new()), Environment::Development);

    let (status, _) = send(
        app.clone(),
        "PATCH",
        "/api/config",
        Some(serde_json::json!({ "throttling": { "window_ms": 0 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, current) = get(app, "/api/config").await;
    assert_eq!(current["throttling"]["window_ms"], 60_000);
}

#[tokio::test]
async fn patch_config_rejects_zero_max_per_window() {
    let sink = Arc::new(MemorySink::new());
    let app = app_with(sink, Environment::Production);

    let (status, body) = send(
        app.clone(),
        "PATCH",
        "/api/config",
        Some(serde_json::json!({ "throttling": { "max_per_window": 0 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("max_per_window"));

    let (_, current) = get(app, "/api/config").await;
    assert_eq!(current["throttling"]["max_per_window"], 3);
}

#[tokio::test]
async fn disabled_category_via_patch_is_not_delivered() {
    let sink = Arc::new(MemorySink::new());
    let app = app_with(sink.clone(), Environment::Development);

    send(
        app.clone(),
        "PATCH",
        "/api/config",
        Some(serde_json::json!({ "enabled": { "planning": false } })),
    )
    .await;
    let (status, body) = post_json(app, "/api/notify/planning", planning_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], false);
    assert_eq!(sink.attempts(), 0);
}
