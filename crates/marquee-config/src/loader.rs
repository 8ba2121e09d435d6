//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, `.env` and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{AuthMode, ConfigError, LogFormat, MarqueeConfig};

/// Configuration loader with layered approach.
///
/// Layers are applied in order, later layers overriding earlier ones:
/// 1. Defaults or a preset
/// 2. Configuration files (TOML or JSON), merged key by key
/// 3. `.env` file, which only populates the process environment
/// 4. Environment variables `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use marquee_config::ConfigLoader;
///
/// # fn main() -> Result<(), marquee_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_optional_file("marquee.toml")?
///     .with_dotenv()?
///     .with_env_prefix("MARQUEE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: MarqueeConfig,
    env_prefix: Option<String>,
    env_vars: Option<Vec<(String, String)>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MarqueeConfig::default(),
            env_prefix: None,
            env_vars: None,
        }
    }

    /// Reset to default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = MarqueeConfig::default();
        self
    }

    /// Start from the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use marquee_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = MarqueeConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = MarqueeConfig::production();
        self
    }

    /// Merge a configuration file.
    ///
    /// The format follows the extension (`.toml` or `.json`). Keys present in
    /// the file override the current values; absent keys keep them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, has an
    /// unsupported extension, fails to parse, or names an unknown field.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.with_string(&content, format)
    }

    /// Merge a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merge configuration from a string in `format` ("toml" or "json").
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or a field is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use marquee_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [server]
    ///     http_addr = "127.0.0.1:3000"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let overlay: Value = match format.to_lowercase().as_str() {
            "toml" => serde_json::to_value(toml::from_str::<toml::Value>(content)?)?,
            "json" => serde_json::from_str(content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        let mut base = serde_json::to_value(&self.config)?;
        merge(&mut base, overlay);
        self.config = serde_json::from_value(base)?;
        Ok(self)
    }

    /// Load a `.env` file from the working directory into the process
    /// environment, if one exists. Variables already set are kept.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Load a specific `.env` file into the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file cannot be read or parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref()).map_err(|e| ConfigError::Dotenv(e.to_string()))?;
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__SECTION__KEY`, for example
    /// `MARQUEE__SERVER__HTTP_ADDR=0.0.0.0:9000` or
    /// `MARQUEE__TELEMETRY__LOGGING__LEVEL=debug`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Read overrides from `vars` instead of the process environment.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override is unknown or unparsable, or if
    /// validation fails.
    pub fn load(mut self) -> Result<MarqueeConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars = self.env_vars.take().unwrap_or_else(|| env::vars().collect());
            let scoped = format!("{prefix}__");
            for (key, value) in vars.iter().filter(|(k, _)| k.starts_with(&scoped)) {
                self.apply_env_var(key, value, &scoped)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> MarqueeConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, value: &str, scoped: &str) -> Result<(), ConfigError> {
        let path = &key[scoped.len()..];
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_int(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                config.server.request_timeout_ms = parse_int(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                config.server.max_body_bytes = parse_int(key, value)?;
            }

            ["TELEMETRY", "SERVICE_NAME"] => config.telemetry.service_name = value.to_string(),
            ["TELEMETRY", "ENVIRONMENT"] => config.telemetry.environment = value.to_string(),
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                config.telemetry.logging.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => config.telemetry.logging.level = value.to_string(),
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                config.telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::env_parse_error(key, "expected 'json' or 'pretty'")),
                };
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                config.telemetry.logging.include_location = parse_flag(key, value)?;
            }
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                config.telemetry.metrics.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "METRICS", "ADDR"] => config.telemetry.metrics.addr = value.to_string(),

            ["AUTH", "MODE"] => {
                config.auth.mode = match value.to_lowercase().as_str() {
                    "jwt" => AuthMode::Jwt,
                    "static_tokens" => AuthMode::StaticTokens,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'jwt' or 'static_tokens'",
                        ))
                    }
                };
            }
            ["AUTH", "JWT", "PUBLIC_KEY"] => config.auth.jwt.public_key = non_empty(value),
            ["AUTH", "JWT", "ISSUER"] => config.auth.jwt.issuer = non_empty(value),
            ["AUTH", "JWT", "AUDIENCE"] => config.auth.jwt.audience = non_empty(value),
            ["AUTH", "JWT", "LEEWAY_SECS"] => config.auth.jwt.leeway_secs = parse_int(key, value)?,

            ["CACHE", "ENABLED"] => config.cache.enabled = parse_flag(key, value)?,
            ["CACHE", "LIST_MAX_AGE_SECS"] => config.cache.list_max_age_secs = parse_int(key, value)?,
            ["CACHE", "ITEM_MAX_AGE_SECS"] => config.cache.item_max_age_secs = parse_int(key, value)?,

            ["ROUTES", "GUARD_REPLACE"] => config.routes.guard_replace = parse_flag(key, value)?,

            _ => return Err(ConfigError::unknown_field(path, "environment")),
        }

        Ok(())
    }
}

/// Recursively overlays `overlay` onto `base`. Objects merge key by key;
/// every other value replaces.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loader_with_development() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.telemetry.logging.level, "debug");
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_defaults_need_a_key() {
        assert!(ConfigLoader::new().load().is_err());
        assert_eq!(
            ConfigLoader::new().load_unvalidated().server.http_addr,
            "0.0.0.0:8080"
        );
    }

    #[test]
    fn test_string_merges_over_preset() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string(r#"{"cache": {"enabled": true}}"#, "json")
            .unwrap()
            .load()
            .unwrap();

        assert!(config.cache.enabled);
        assert_eq!(config.cache.list_max_age_secs, 300);
        assert_eq!(config.auth.mode, AuthMode::StaticTokens);
    }

    #[test]
    fn test_unknown_field_in_string() {
        let result = ConfigLoader::new().with_string("[server]\nport = 80\n", "toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_format() {
        let result = ConfigLoader::new().with_string("server: {}", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_merge_replaces_arrays() {
        let mut base = json!({"a": {"b": 1, "c": [1, 2]}, "d": true});
        merge(&mut base, json!({"a": {"c": [3]}, "e": "x"}));
        assert_eq!(base, json!({"a": {"b": 1, "c": [3]}, "d": true, "e": "x"}));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_apply_env_var_server() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__SERVER__HTTP_ADDR", "192.168.1.1:9000", "TEST__")
            .unwrap();
        loader
            .apply_env_var("TEST__SERVER__MAX_BODY_BYTES", "2048", "TEST__")
            .unwrap();
        assert_eq!(loader.config.server.http_addr, "192.168.1.1:9000");
        assert_eq!(loader.config.server.max_body_bytes, 2048);
    }

    #[test]
    fn test_apply_env_var_auth() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__AUTH__MODE", "static_tokens", "TEST__").unwrap();
        loader.apply_env_var("TEST__AUTH__JWT__ISSUER", "marquee", "TEST__").unwrap();
        assert_eq!(loader.config.auth.mode, AuthMode::StaticTokens);
        assert_eq!(loader.config.auth.jwt.issuer.as_deref(), Some("marquee"));
    }

    #[test]
    fn test_apply_env_var_errors() {
        let mut loader = ConfigLoader::new();
        assert!(matches!(
            loader.apply_env_var("TEST__SERVER__REQUEST_TIMEOUT_MS", "soon", "TEST__"),
            Err(ConfigError::EnvParseError { .. })
        ));
        assert!(matches!(
            loader.apply_env_var("TEST__ROUTES__GUARD_REPLACE", "maybe", "TEST__"),
            Err(ConfigError::EnvParseError { .. })
        ));
        assert!(matches!(
            loader.apply_env_var("TEST__SERVER__PORT", "80", "TEST__"),
            Err(ConfigError::UnknownField { .. })
        ));
    }
}
