//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;
use crate::domain::conversation::ConversationObserver;

static WORKFLOW_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/workflows/([^/]+)/(prompt|end|status|history|progress)$").unwrap());

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs the global recorder; `None` when disabled or already installed
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("qna_agent_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Prometheus metrics");
            None
        }
    }
}

pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Exports coordinator events as Prometheus series
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsObserver;

impl ConversationObserver for MetricsObserver {
    fn on_started(&self, _conversation_id: &str) {
        counter!("conversations_started_total").increment(1);
        gauge!("conversations_running").increment(1.0);
    }

    fn on_submitted(&self, _conversation_id: &str) {
        counter!("prompts_submitted_total").increment(1);
    }

    fn on_dropped(&self, _conversation_id: &str) {
        counter!("prompts_dropped_total").increment(1);
    }

    fn on_completed(&self, _conversation_id: &str, elapsed: Duration, attempts: u32) {
        let labels = [("outcome", "answered")];
        counter!("prompts_processed_total", &labels).increment(1);
        histogram!("prompt_processing_duration_seconds", &labels).record(elapsed.as_secs_f64());
        histogram!("generation_attempts").record(attempts as f64);
    }

    fn on_failed(&self, _conversation_id: &str, elapsed: Duration, attempts: u32) {
        let labels = [("outcome", "failed")];
        counter!("prompts_processed_total", &labels).increment(1);
        histogram!("prompt_processing_duration_seconds", &labels).record(elapsed.as_secs_f64());
        histogram!("generation_attempts").record(attempts as f64);
    }

    fn on_closed(&self, _conversation_id: &str) {
        gauge!("conversations_running").decrement(1.0);
    }
}

/// Collapses workflow ids so label cardinality stays bounded
fn sanitize_path(path: &str) -> String {
    let path = WORKFLOW_PATH.replace(path, "/workflows/{id}/$2");

    if path.len() > 50 {
        path[..50].to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_workflow_paths() {
        assert_eq!(
            sanitize_path("/workflows/qna-workflow-550e8400-e29b-41d4-a716-446655440000/prompt"),
            "/workflows/{id}/prompt"
        );
        assert_eq!(sanitize_path("/workflows/chat-1/history"), "/workflows/{id}/history");
    }

    #[test]
    fn test_sanitize_keeps_static_paths() {
        assert_eq!(sanitize_path("/workflows/start"), "/workflows/start");
        assert_eq!(sanitize_path("/workflows"), "/workflows");
        assert_eq!(sanitize_path("/health"), "/health");
    }

    #[test]
    fn test_sanitize_truncates_long_paths() {
        let path = "/very/long/path/that/exceeds/the/maximum/allowed/length/for/metrics";
        assert!(sanitize_path(path).len() <= 50);
    }

    #[test]
    fn test_observer_without_recorder_is_noop() {
        let observer = MetricsObserver;
        observer.on_started("a");
        observer.on_completed("a", Duration::from_millis(5), 1);
        observer.on_closed("a");
    }
}
