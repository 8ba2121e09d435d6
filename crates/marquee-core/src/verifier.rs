//! Credential verifier contract.

use thiserror::Error;

use crate::error::CredentialRejection;
use crate::BoxFuture;

/// Claims extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    /// Subject claim.
    pub subject: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

impl VerifiedCredential {
    /// Creates a credential.
    pub fn new<S: Into<String>>(
        subject: impl Into<String>,
        scopes: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            subject: subject.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Why a token did not verify.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// The token could not be decoded.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token is past its `exp` claim.
    #[error("token expired")]
    Expired,

    /// The signature does not match.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token decoded but its claims were not accepted.
    #[error("token rejected: {0}")]
    Rejected(String),

    /// The verifier itself could not run.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

impl VerificationError {
    /// Maps the error to a credential rejection.
    ///
    /// Returns `None` for [`VerificationError::Unavailable`], which is not the
    /// caller's fault.
    #[must_use]
    pub fn rejection(&self) -> Option<CredentialRejection> {
        match self {
            Self::Malformed(_) => Some(CredentialRejection::Malformed),
            Self::Expired => Some(CredentialRejection::Expired),
            Self::InvalidSignature => Some(CredentialRejection::Rejected(
                "invalid signature".to_string(),
            )),
            Self::Rejected(reason) => Some(CredentialRejection::Rejected(reason.clone())),
            Self::Unavailable(_) => None,
        }
    }
}

/// Verifies bearer tokens.
///
/// Implementations must be pure with respect to the request: the same token
/// always yields the same outcome until it expires.
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Verifies `token` and returns its claims.
    fn verify<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, Result<VerifiedCredential, VerificationError>>;
}
