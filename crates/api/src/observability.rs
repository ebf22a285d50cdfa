use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use metrics::{Label, counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const HTTP_REQUESTS_TOTAL: &str = "forum_api_http_requests_total";
const HTTP_REQUEST_DURATION_SECONDS: &str = "forum_api_http_request_duration_seconds";
const HTTP_ERRORS_TOTAL: &str = "forum_api_http_errors_total";
const HTTP_REQUESTS_IN_FLIGHT: &str = "forum_api_http_requests_in_flight";

const LATENCY_BUCKETS_SECONDS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

static PROMETHEUS: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() -> Result<()> {
    if PROMETHEUS.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            LATENCY_BUCKETS_SECONDS,
        )
        .context("configuring latency buckets")?
        .install_recorder()
        .context("installing prometheus recorder")?;
    let _ = PROMETHEUS.set(handle);
    Ok(())
}

pub fn render_metrics() -> Option<String> {
    PROMETHEUS.get().map(PrometheusHandle::render)
}

/// Tracks one request in the in-flight gauge until dropped.
pub struct InFlight {
    route: String,
}

impl InFlight {
    pub fn enter(route: &str) -> Self {
        gauge!(HTTP_REQUESTS_IN_FLIGHT, "route" => route.to_owned()).increment(1.0);
        Self {
            route: route.to_owned(),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        gauge!(HTTP_REQUESTS_IN_FLIGHT, "route" => self.route.clone()).decrement(1.0);
    }
}

fn request_labels(method: &str, route: &str, status: StatusCode) -> Vec<Label> {
    vec![
        Label::new("method", method.to_owned()),
        Label::new("route", route.to_owned()),
        Label::new("status", status.as_u16().to_string()),
    ]
}

pub fn register_http_request(method: &str, route: &str, status: StatusCode, elapsed: Duration) {
    let labels = request_labels(method, route, status);
    counter!(HTTP_REQUESTS_TOTAL, labels.clone()).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, labels.clone()).record(elapsed.as_secs_f64());
    if status.is_server_error() {
        counter!(HTTP_ERRORS_TOTAL, labels).increment(1);
    }
}
