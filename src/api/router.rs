use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;
use super::workflows;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Workflow and health routes with request-id, tracing, logging and metrics layers
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        .route("/ready", get(health::ready_check))
        .route("/workflows", get(workflows::list_workflows))
        .route("/workflows/start", post(workflows::start_workflow))
        .route("/workflows/{workflow_id}/prompt", post(workflows::submit_prompt))
        .route("/workflows/{workflow_id}/end", post(workflows::end_workflow))
        .route("/workflows/{workflow_id}/status", get(workflows::get_status))
        .route("/workflows/{workflow_id}/history", get(workflows::get_history))
        .route("/workflows/{workflow_id}/progress", get(workflows::get_progress))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
}

/// Adds the Prometheus scrape endpoint outside the request middleware
pub fn with_metrics(router: Router, metrics: Option<PrometheusMetrics>, path: &str) -> Router {
    match metrics {
        Some(metrics) => router.merge(create_metrics_router(metrics, path)),
        None => router,
    }
}
