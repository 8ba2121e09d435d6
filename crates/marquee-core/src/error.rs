//! Error taxonomy for the request pipeline.
//!
//! Every stage reports failures as a [`PipelineError`]. The error carries its
//! [`ErrorKind`], which alone decides the HTTP status and the stable error
//! code; route code never picks status codes itself.
//!
//! | `ErrorKind` | Status | Code |
//! |---|---|---|
//! | `Authentication` | 401 | `INVALID_CREDENTIAL` |
//! | `Authorization` | 403 | `INSUFFICIENT_SCOPE` |
//! | `Validation` | 400 | `VALIDATION_FAILED` |
//! | `NotFound` | 404 | `NOT_FOUND` |
//! | `Conflict` | 409 | `CONFLICT` |
//! | `Internal` | 500 | `INTERNAL_ERROR` |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, malformed, expired, or unverifiable credential.
    Authentication,
    /// A required scope was not granted.
    Authorization,
    /// Input did not match the declared schema.
    Validation,
    /// The business collaborator could not find the resource.
    NotFound,
    /// The business collaborator rejected the change as conflicting.
    Conflict,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the stable, machine-readable error code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Authentication => "INVALID_CREDENTIAL",
            Self::Authorization => "INSUFFICIENT_SCOPE",
            Self::Validation => "VALIDATION_FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Returns the kind as a metric/log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

/// Why a bearer credential was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialRejection {
    /// No `Authorization: Bearer` credential was presented.
    Missing,
    /// The header or token could not be parsed.
    Malformed,
    /// The token is past its expiry.
    Expired,
    /// The verifier rejected the token.
    Rejected(String),
}

impl std::fmt::Display for CredentialRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("missing bearer token"),
            Self::Malformed => f.write_str("malformed bearer token"),
            Self::Expired => f.write_str("token expired"),
            Self::Rejected(reason) => write!(f, "{reason}"),
        }
    }
}

/// Authentication failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The credential is missing, malformed, expired, or failed verification.
    #[error("invalid credential: {0}")]
    InvalidCredential(CredentialRejection),
}

/// Scope authorization failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthzError {
    /// One or more required scopes are absent from the identity.
    #[error("insufficient scope: missing {}", missing.join(", "))]
    InsufficientScope {
        /// The required scopes the identity does not hold.
        missing: Vec<String>,
    },
}

/// Which part of the request a schema applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Path parameters.
    Path,
    /// Query string parameters.
    Query,
    /// JSON request body.
    Body,
}

impl Location {
    /// Returns the location label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field path (empty for whole-input failures).
    pub field: String,
    /// Human-readable reason.
    pub message: String,
    /// Machine-readable reason code.
    pub code: String,
}

impl FieldError {
    /// Creates a field error.
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// Schema validation failure for one request location.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid request {location}: {}", summary(fields))]
pub struct ValidationError {
    /// Where the invalid input came from.
    pub location: Location,
    /// Every failing field, in schema order.
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    /// Creates a validation error.
    #[must_use]
    pub fn new(location: Location, fields: Vec<FieldError>) -> Self {
        Self { location, fields }
    }

    /// Creates a validation error for a single field.
    #[must_use]
    pub fn single(location: Location, field: FieldError) -> Self {
        Self::new(location, vec![field])
    }

    /// Returns true if `name` is one of the failing fields.
    #[must_use]
    pub fn names_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.field == name)
    }
}

fn summary(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Rejection from the business collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The addressed resource does not exist.
    #[error("{resource} '{id}' not found")]
    NotFound {
        /// Resource type, e.g. `movie`.
        resource: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The request conflicts with the current resource state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    /// Creates a not-found error.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }
}

/// The unified pipeline error.
///
/// Stages never recover from these locally; they are forwarded intact to the
/// error handler, which maps them to a response through [`ErrorKind`].
///
/// # Example
///
/// ```
/// use marquee_core::{AuthError, CredentialRejection, ErrorKind, PipelineError};
///
/// let err: PipelineError = AuthError::InvalidCredential(CredentialRejection::Expired).into();
/// assert_eq!(err.kind(), ErrorKind::Authentication);
/// assert_eq!(err.status_code().as_u16(), 401);
/// ```
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Authentication failed.
    #[error(transparent)]
    Authentication(#[from] AuthError),

    /// Scope authorization denied.
    #[error(transparent)]
    Authorization(#[from] AuthzError),

    /// Input validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The business operation rejected the request.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Anything else. The message and source are never shown to clients.
    #[error("unexpected error: {message}")]
    Unexpected {
        /// Internal description, logged only.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl PipelineError {
    /// Creates an unexpected error.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unexpected error wrapping a source.
    pub fn unexpected_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Unexpected {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Domain(DomainError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Domain(DomainError::Conflict(_)) => ErrorKind::Conflict,
            Self::Unexpected { .. } => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Returns the field errors for validation failures.
    #[must_use]
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::Validation(err) => Some(&err.fields),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_status_mapping() {
        let cases = [
            (ErrorKind::Authentication, 401),
            (ErrorKind::Authorization, 403),
            (ErrorKind::Validation, 400),
            (ErrorKind::NotFound, 404),
            (ErrorKind::Conflict, 409),
            (ErrorKind::Internal, 500),
        ];
        for (kind, status) in cases {
            assert_eq!(kind.status_code().as_u16(), status, "{kind:?}");
        }
    }

    #[test]
    fn test_domain_errors_classified() {
        let err: PipelineError = DomainError::not_found("movie", "abc").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "movie 'abc' not found");

        let err: PipelineError = DomainError::Conflict("duplicate title".into()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_validation_error_message_lists_fields() {
        let err = ValidationError::new(
            Location::Body,
            vec![
                FieldError::new("title", "title is required", "FIELD_REQUIRED"),
                FieldError::new("year", "year is required", "FIELD_REQUIRED"),
            ],
        );
        assert!(err.names_field("title"));
        assert!(!err.names_field("cover"));
        assert_eq!(
            err.to_string(),
            "invalid request body: title is required; year is required"
        );
    }

    #[test]
    fn test_authz_message_names_missing_scopes() {
        let err = AuthzError::InsufficientScope {
            missing: vec!["create:movies".into()],
        };
        assert_eq!(err.to_string(), "insufficient scope: missing create:movies");
    }

    #[test]
    fn test_unexpected_keeps_source() {
        let err = PipelineError::unexpected_with_source(
            "store unavailable",
            std::io::Error::new(std::io::ErrorKind::Other, "connection reset"),
        );
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.field_errors().is_none());
    }
}
