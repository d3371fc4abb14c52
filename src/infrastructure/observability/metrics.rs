//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::config::MetricsConfig;

static UUID_SEGMENT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").ok()
});

static ACCOUNT_SEGMENT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"/accounts/[^/]+").ok());

static NUMERIC_SEGMENT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"/\d+(/|$)").ok());

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

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("edu_ledger_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
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

/// Record an applied ledger commit
pub fn record_ledger_commit(kind: &'static str) {
    counter!("ledger_commits_total", "kind" => kind).increment(1);
}

/// Record a metering attempt; `amount` is set only when a debit was written
pub fn record_metering_charge(mode: &'static str, outcome: &'static str, amount: Option<Decimal>) {
    counter!("metering_charges_total", "mode" => mode, "outcome" => outcome).increment(1);

    if let Some(amount) = amount.and_then(|a| a.to_f64()) {
        histogram!("metering_charge_amount", "mode" => mode).record(amount);
    }
}

/// Record a recharge workflow event (created, approved, rejected, ...)
pub fn record_recharge_event(event: &'static str) {
    counter!("recharge_requests_total", "event" => event).increment(1);
}

/// Sanitize URL path for metric labels (remove IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    let mut path = path.to_string();

    if let Some(re) = UUID_SEGMENT.as_ref() {
        path = re.replace_all(&path, "{id}").into_owned();
    }

    if let Some(re) = ACCOUNT_SEGMENT.as_ref() {
        path = re.replace_all(&path, "/accounts/{id}").into_owned();
    }

    if let Some(re) = NUMERIC_SEGMENT.as_ref() {
        path = re.replace_all(&path, "/{id}$1").into_owned();
    }

    if path.len() > 50 {
        path.chars().take(50).collect()
    } else {
        path
    }
}
