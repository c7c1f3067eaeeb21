pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use safe_notify_core::NotificationCoordinator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(coordinator: Arc<NotificationCoordinator>) -> Router {
    let app_state = state::AppState::new(coordinator);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Notifications
        .route("/api/notify/planning", post(routes::notify::planning))
        .route("/api/notify/sync", post(routes::notify::sync))
        .route("/api/notify/health", post(routes::notify::health))
        .route("/api/notify/budget", post(routes::notify::budget))
        .route("/api/notify/workflow", post(routes::notify::workflow))
        .route("/api/notify/agent", post(routes::notify::agent))
        // Health monitoring
        .route("/api/health", get(routes::health::get_health))
        .route("/api/health/tokens", post(routes::health::register_token))
        .route("/api/health/usage", post(routes::health::update_usage))
        .route("/api/stats", get(routes::health::get_stats))
        // Config
        .route(
            "/api/config",
            get(routes::config::get_config).patch(routes::config::update_config),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the notification server and block until it stops.
///
/// The coordinator's health-monitoring loop is started here and stopped
/// again when the server exits.
pub async fn serve(coordinator: Arc<NotificationCoordinator>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(coordinator, listener).await
}

/// Start the server on a pre-bound listener.
///
/// Lets the caller read the actual port first (useful with `port = 0`).
pub async fn serve_on(
    coordinator: Arc<NotificationCoordinator>,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(Arc::clone(&coordinator));

    coordinator.initialize();
    tracing::info!(
        environment = %coordinator.environment(),
        "notification server listening on http://localhost:{actual_port}"
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    coordinator.shutdown();
    result?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
