//! Verifier construction errors.

use thiserror::Error;

/// A verification key could not be loaded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The key is not valid hex.
    #[error("public key is not valid hex: {0}")]
    InvalidHex(String),

    /// The key has the wrong length.
    #[error("public key must be 32 bytes, got {0}")]
    InvalidLength(usize),

    /// The bytes are not a valid Ed25519 point.
    #[error("public key is not a valid Ed25519 key: {0}")]
    InvalidKey(String),
}
