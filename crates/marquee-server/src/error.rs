//! Server error types.

use thiserror::Error;

/// Errors that stop the server from running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The bind address does not parse.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Parser message.
        reason: String,
    },

    /// The listener could not be bound.
    #[error("failed to bind to {addr}")]
    Bind {
        /// The address.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ServerError::InvalidAddress {
            addr: "nowhere".to_string(),
            reason: "invalid socket address syntax".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid address 'nowhere': invalid socket address syntax"
        );
    }
}
