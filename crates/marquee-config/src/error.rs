//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Why a [`MarqueeConfig`](crate::MarqueeConfig) could not be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required file does not exist.
    #[error("config file {path} does not exist")]
    FileNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read config file {path}")]
    ReadError {
        /// Requested path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file extension or format name is not TOML or JSON.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// The TOML source did not parse.
    #[error("invalid TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The JSON source did not parse, or the merged document does not fit
    /// the schema.
    #[error("invalid configuration document: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Environment override for a key that does not exist.
    #[error("unknown key {field} (from {section})")]
    UnknownField {
        /// Dotted key path.
        field: String,
        /// Where it came from.
        section: String,
    },

    /// A value is out of its accepted domain.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted key path.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override did not parse as the key's type.
    #[error("cannot parse {var}: {reason}")]
    EnvParseError {
        /// Variable name.
        var: String,
        /// Parser message.
        reason: String,
    },

    /// A `.env` file exists but could not be loaded.
    #[error("failed to load .env file: {0}")]
    Dotenv(String),

    /// Cross-field validation failed.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// [`ConfigError::FileNotFound`] for `path`.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// [`ConfigError::ReadError`] for `path`.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::UnknownField`].
    pub fn unknown_field(field: impl Into<String>, section: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
            section: section.into(),
        }
    }

    /// [`ConfigError::InvalidValue`].
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// [`ConfigError::EnvParseError`].
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// [`ConfigError::ValidationError`].
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_error() {
        let err = ConfigError::file_not_found("/etc/marquee/marquee.toml");
        assert!(err.to_string().contains("/etc/marquee/marquee.toml"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("server.http_addr", "not a socket address");
        assert_eq!(
            err.to_string(),
            "invalid value for server.http_addr: not a socket address"
        );
    }

    #[test]
    fn test_env_parse_error() {
        let err = ConfigError::env_parse_error("MARQUEE__SERVER__REQUEST_TIMEOUT_MS", "expected integer");
        assert!(err.to_string().contains("MARQUEE__SERVER__REQUEST_TIMEOUT_MS"));
        assert!(err.to_string().contains("expected integer"));
    }
}
