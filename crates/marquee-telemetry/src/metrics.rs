//! Prometheus metrics.
//!
//! Recording functions are safe to call before [`init_metrics`]; without an
//! installed recorder they are no-ops.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether the exporter is installed.
    pub enabled: bool,

    /// Address the `/metrics` listener binds to.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Installs the Prometheus recorder and its HTTP listener.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if the recorder cannot be installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    register_metric_descriptions();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}

fn register_metric_descriptions() {
    describe_counter!(
        "marquee_requests_total",
        "Total number of requests that reached a route pipeline"
    );
    describe_histogram!(
        "marquee_request_duration_seconds",
        "Route pipeline duration in seconds"
    );
    describe_counter!(
        "marquee_stage_failures_total",
        "Requests short-circuited by a pipeline stage"
    );
    describe_gauge!(
        "marquee_in_flight_requests",
        "Number of HTTP requests currently being processed"
    );
}

/// Records a completed route traversal.
pub fn record_request(operation: &str, status_code: u16, duration: Duration) {
    counter!(
        "marquee_requests_total",
        "operation" => operation.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "marquee_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a pipeline short-circuit.
///
/// * `stage` - The failing stage (e.g. `authenticate`, `validate_body`)
/// * `kind` - The error kind label (e.g. `authorization`)
pub fn record_stage_failure(stage: &str, kind: &str) {
    counter!(
        "marquee_stage_failures_total",
        "stage" => stage.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Guard that tracks an in-flight request for its lifetime.
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!("marquee_in_flight_requests").increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("marquee_in_flight_requests").decrement(1.0);
    }
}
