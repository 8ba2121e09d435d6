//! Configuration section types.

use std::fmt;

use marquee_telemetry::{LogConfig, MetricsConfig};
use serde::{Deserialize, Serialize};

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g. "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Grace period for in-flight connections on shutdown, in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Per-request deadline in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines (production).
    #[default]
    Json,
    /// Human-readable output (development).
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Install the exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Listener address for `/metrics`.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// Telemetry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Deployment environment.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            environment: default_environment(),
            logging: LoggingConfig::default(),
            metrics: MetricsSection::default(),
        }
    }
}

impl TelemetryConfig {
    /// Converts the logging section for [`marquee_telemetry::init_logging`].
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            json_format: self.logging.format == LogFormat::Json,
            span_events: false,
            include_location: self.logging.include_location,
        }
    }

    /// Converts the metrics section for [`marquee_telemetry::init_metrics`].
    #[must_use]
    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            enabled: self.metrics.enabled,
            addr: self.metrics.addr.clone(),
        }
    }
}

fn default_service_name() -> String {
    "marquee".to_string()
}

fn default_environment() -> String {
    "production".to_string()
}

/// Which credential verifier guards the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Ed25519-signed JWTs.
    #[default]
    Jwt,
    /// A fixed table of opaque tokens.
    StaticTokens,
}

/// JWT verification settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JwtConfig {
    /// Hex-encoded Ed25519 public key.
    #[serde(default)]
    pub public_key: Option<String>,

    /// Required `iss` claim.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Required `aud` entry.
    #[serde(default)]
    pub audience: Option<String>,

    /// Clock skew tolerated on `exp` and `nbf`.
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            public_key: None,
            issuer: None,
            audience: None,
            leeway_secs: default_leeway(),
        }
    }
}

fn default_leeway() -> u64 {
    marquee_auth::DEFAULT_LEEWAY_SECS
}

/// One entry of the static token table.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StaticToken {
    /// The bearer token value.
    pub token: String,
    /// Subject id it authenticates as.
    pub subject: String,
    /// Scopes it grants.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &"<redacted>")
            .field("subject", &self.subject)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Verifier selection.
    #[serde(default)]
    pub mode: AuthMode,

    /// Used when `mode` is `jwt`.
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Used when `mode` is `static_tokens`.
    #[serde(default)]
    pub static_tokens: Vec<StaticToken>,
}

/// `Cache-Control` settings for the read routes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Emit cache directives at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `max-age` for the list route.
    #[serde(default = "default_list_max_age")]
    pub list_max_age_secs: u64,

    /// `max-age` for the retrieve route.
    #[serde(default = "default_item_max_age")]
    pub item_max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            list_max_age_secs: default_list_max_age(),
            item_max_age_secs: default_item_max_age(),
        }
    }
}

fn default_list_max_age() -> u64 {
    300
}

fn default_item_max_age() -> u64 {
    3600
}

/// Route table switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct RoutesConfig {
    /// Put the partial-replace route behind authentication, the
    /// `update:movies` scope and validation.
    #[serde(default)]
    pub guard_replace: bool,
}

fn default_true() -> bool {
    true
}
