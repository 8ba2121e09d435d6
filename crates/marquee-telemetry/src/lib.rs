//! Observability for Marquee services.
//!
//! - **Logging**: structured `tracing` output, JSON in production and
//!   pretty-printed in development
//! - **Metrics**: Prometheus-format metrics via the `metrics` facade
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `marquee_requests_total` | Counter | `operation`, `status` | Total request count |
//! | `marquee_request_duration_seconds` | Histogram | `operation` | Request latency |
//! | `marquee_stage_failures_total` | Counter | `stage`, `kind` | Pipeline short-circuits |
//! | `marquee_in_flight_requests` | Gauge | - | Currently processing requests |
//!
//! # Example
//!
//! ```rust,ignore
//! use marquee_telemetry::{init_telemetry, LogConfig, MetricsConfig};
//!
//! init_telemetry(&LogConfig::production(), &MetricsConfig::default())?;
//! tracing::info!("telemetry ready");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(logging: &LogConfig, metrics: &MetricsConfig) -> TelemetryResult<()> {
    init_logging(logging)?;
    init_metrics(metrics)?;
    Ok(())
}
