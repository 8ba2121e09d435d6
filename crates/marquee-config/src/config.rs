//! The root configuration type and its presets.

use std::collections::HashSet;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{
    AuthConfig, AuthMode, CacheConfig, ConfigError, LogFormat, RoutesConfig, ServerConfig,
    StaticToken, TelemetryConfig,
};

/// Token accepted by the development preset.
pub const DEV_TOKEN: &str = "dev-token";

/// Complete Marquee configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and the
/// environment.
///
/// # Example
///
/// ```
/// use marquee_config::MarqueeConfig;
///
/// let config = MarqueeConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(!config.routes.guard_replace);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MarqueeConfig {
    /// HTTP server.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Credential verification.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Cache directives on read routes.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Route table switches.
    #[serde(default)]
    pub routes: RoutesConfig,
}

impl MarqueeConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first problem found:
    /// - an unparsable server or metrics address
    /// - a zero request timeout or body limit
    /// - a missing or malformed JWT public key in `jwt` mode
    /// - an empty or duplicated token table in `static_tokens` mode
    /// - a zero cache max-age while caching is enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.telemetry.metrics.enabled
            && self.telemetry.metrics.addr.parse::<SocketAddr>().is_err()
        {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.addr",
                format!("invalid socket address: {}", self.telemetry.metrics.addr),
            ));
        }

        match self.auth.mode {
            AuthMode::Jwt => {
                let key = self.auth.jwt.public_key.as_deref().ok_or_else(|| {
                    ConfigError::validation_error(
                        "auth.jwt.public_key must be set when auth.mode is 'jwt'",
                    )
                })?;
                marquee_auth::JwtVerifier::from_hex(key)
                    .map_err(|e| ConfigError::invalid_value("auth.jwt.public_key", e.to_string()))?;
            }
            AuthMode::StaticTokens => {
                if self.auth.static_tokens.is_empty() {
                    return Err(ConfigError::validation_error(
                        "auth.static_tokens must not be empty when auth.mode is 'static_tokens'",
                    ));
                }
                let mut seen = HashSet::new();
                for entry in &self.auth.static_tokens {
                    if entry.token.trim().is_empty() {
                        return Err(ConfigError::invalid_value(
                            "auth.static_tokens",
                            format!("empty token for subject '{}'", entry.subject),
                        ));
                    }
                    if !seen.insert(entry.token.as_str()) {
                        return Err(ConfigError::invalid_value(
                            "auth.static_tokens",
                            format!("duplicate token for subject '{}'", entry.subject),
                        ));
                    }
                }
            }
        }

        if self.cache.enabled {
            if self.cache.list_max_age_secs == 0 {
                return Err(ConfigError::invalid_value(
                    "cache.list_max_age_secs",
                    "must be greater than zero",
                ));
            }
            if self.cache.item_max_age_secs == 0 {
                return Err(ConfigError::invalid_value(
                    "cache.item_max_age_secs",
                    "must be greater than zero",
                ));
            }
        }

        Ok(())
    }

    /// Local development preset.
    ///
    /// - Pretty logs at `debug` with source locations
    /// - No cache directives
    /// - Static tokens: [`DEV_TOKEN`] grants every movie scope
    ///
    /// # Example
    ///
    /// ```
    /// use marquee_config::MarqueeConfig;
    ///
    /// let config = MarqueeConfig::development();
    /// assert!(config.validate().is_ok());
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config.telemetry.environment = "development".to_string();

        config.cache.enabled = false;

        config.auth.mode = AuthMode::StaticTokens;
        config.auth.static_tokens = vec![StaticToken {
            token: DEV_TOKEN.to_string(),
            subject: "developer".to_string(),
            scopes: ["read:movies", "create:movies", "update:movies", "delete:movies"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }];

        config
    }

    /// Production preset: JSON logs at `info`, cache directives on, JWT
    /// authentication. A public key must still be supplied.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.environment = "production".to_string();
        config.cache.enabled = true;
        config.auth.mode = AuthMode::Jwt;

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC_KEY: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    fn jwt_config() -> MarqueeConfig {
        let mut config = MarqueeConfig::production();
        config.auth.jwt.public_key = Some(PUBLIC_KEY.to_string());
        config
    }

    #[test]
    fn test_default_requires_public_key() {
        let err = MarqueeConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("auth.jwt.public_key"));
    }

    #[test]
    fn test_production_with_key_is_valid() {
        assert!(jwt_config().validate().is_ok());
    }

    #[test]
    fn test_malformed_public_key() {
        let mut config = jwt_config();
        config.auth.jwt.public_key = Some("not-hex".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "auth.jwt.public_key"
        ));
    }

    #[test]
    fn test_invalid_http_addr() {
        let mut config = jwt_config();
        config.server.http_addr = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_static_tokens() {
        let mut config = MarqueeConfig::development();
        config.auth.static_tokens.clear();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_duplicate_static_tokens() {
        let mut config = MarqueeConfig::development();
        let dup = config.auth.static_tokens[0].clone();
        config.auth.static_tokens.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_age_only_checked_when_enabled() {
        let mut config = jwt_config();
        config.cache.list_max_age_secs = 0;
        assert!(config.validate().is_err());

        config.cache.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_preset() {
        let config = MarqueeConfig::development();
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
        assert!(!config.cache.enabled);
        assert_eq!(config.auth.static_tokens[0].token, DEV_TOKEN);
        assert_eq!(config.auth.static_tokens[0].scopes.len(), 4);
    }
}
