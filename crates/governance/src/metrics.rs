//! Metrics implementation using Prometheus.
//!
//! The helpers are no-ops until a recorder is installed, so library code can
//! call them unconditionally.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use doc_agent_core::{Error, Result};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .map_err(|e| Error::config(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Helper to track HTTP request metrics (latency, count).
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}

/// Which tier decided a classification and whether it came from the cache.
pub fn track_classification(tier: &str, cached: bool) {
    metrics::counter!(
        "classifications_total",
        "tier" => tier.to_string(),
        "cached" => cached.to_string()
    )
    .increment(1);
}

/// Final outcome of one dispatched request.
pub fn track_dispatch(intent: &str, status: &str, attempts: u32, latency_sec: f64) {
    metrics::counter!(
        "dispatch_total",
        "intent" => intent.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!("dispatch_attempts", "intent" => intent.to_string()).record(attempts as f64);
    metrics::histogram!("dispatch_duration_seconds", "intent" => intent.to_string()).record(latency_sec);
}

/// One call to an external tool server.
pub fn track_tool_call(server: &str, tool: &str, ok: bool, latency_sec: f64) {
    metrics::counter!(
        "tool_calls_total",
        "server" => server.to_string(),
        "tool" => tool.to_string(),
        "outcome" => if ok { "ok" } else { "error" }
    )
    .increment(1);

    metrics::histogram!("tool_call_duration_seconds", "tool" => tool.to_string()).record(latency_sec);
}
