use axum::routing::{get, post};
use axum::Router;
use evrec_observability::metrics_handler;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Mirrors `create_server`'s permissive-CORS shape: every origin/method/
/// header allowed. Acceptable here because the core endpoints require no
/// cookies or credentials; tighten with an explicit allow-list before
/// exposing this outside a trusted network.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ingest/station", post(handlers::ingest_station))
        .route("/ingest/user-context", post(handlers::ingest_user_context))
        .route("/ingest/grid-status", post(handlers::ingest_grid_status))
        .route("/ingest/health", post(handlers::ingest_health))
        .route("/recommend", get(handlers::recommend_get).post(handlers::recommend_post))
        .route("/recommend/:requestId", get(handlers::recommend_get_cached))
        .route("/recommend/:requestId/select", post(handlers::recommend_select))
        .route("/recommend/:requestId/feedback", post(handlers::recommend_feedback))
        .route("/station/:id/score", get(handlers::station_score))
        .route("/station/:id/health", get(handlers::station_health))
        .route("/health", get(handlers::health_handler))
        .route("/ready", get(handlers::ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}
