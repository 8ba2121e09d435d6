//! Unified error handling.
//!
//! Every failure, from any stage or from the business operation, is turned
//! into a response here and nowhere else:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "VALIDATION_FAILED",
//!     "message": "invalid request body: title is required",
//!     "request_id": "0190a0c2-...",
//!     "details": [{"field": "title", "message": "title is required", "code": "FIELD_REQUIRED"}]
//!   }
//! }
//! ```
//!
//! `details` is present only for validation failures. Unexpected errors are
//! logged with their full chain and answered with a fixed message.

use http::{HeaderValue, Method, StatusCode};
use marquee_core::{ErrorKind, FieldError, PipelineError, RequestId};
use serde::Serialize;

use crate::types::{Response, ResponseExt};

/// Message returned for every unexpected error.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

const FALLBACK_BODY: &str =
    r#"{"error":{"code":"INTERNAL_ERROR","message":"An internal error occurred"}}"#;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
    request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [FieldError]>,
}

/// Builds a response in the unified error shape.
#[must_use]
pub fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    request_id: RequestId,
    details: Option<&[FieldError]>,
) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code,
            message,
            request_id: request_id.to_string(),
            details,
        },
    };
    let bytes = serde_json::to_vec(&body).unwrap_or_else(|_| FALLBACK_BODY.as_bytes().to_vec());
    Response::json_bytes(status, bytes)
}

/// Maps pipeline errors to responses.
#[derive(Debug, Clone, Default)]
pub struct ErrorHandler {
    _private: (),
}

impl ErrorHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs `error` and converts it to a response.
    ///
    /// `stage` names where the traversal stopped.
    #[must_use]
    pub fn handle(&self, error: &PipelineError, request_id: RequestId, stage: &str) -> Response {
        let kind = error.kind();
        let message = if kind == ErrorKind::Internal {
            tracing::error!(
                stage,
                error = %error,
                source = ?std::error::Error::source(error),
                "request failed unexpectedly"
            );
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            tracing::warn!(stage, kind = kind.as_str(), error = %error, "request rejected");
            error.to_string()
        };

        error_response(
            kind.status_code(),
            kind.code(),
            &message,
            request_id,
            error.field_errors(),
        )
    }

    /// No route pattern matched the path.
    #[must_use]
    pub fn route_not_found(&self, request_id: RequestId, path: &str) -> Response {
        tracing::debug!(path, "no route matched");
        error_response(
            StatusCode::NOT_FOUND,
            "ROUTE_NOT_FOUND",
            &format!("no route for path '{path}'"),
            request_id,
            None,
        )
    }

    /// A pattern matched the path but not the method.
    #[must_use]
    pub fn method_not_allowed(&self, request_id: RequestId, method: &Method, allowed: &[Method]) -> Response {
        let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
        let mut response = error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "METHOD_NOT_ALLOWED",
            &format!("method {method} is not allowed here"),
            request_id,
            None,
        );
        if let Ok(value) = HeaderValue::from_str(&allow) {
            response.headers_mut().insert(http::header::ALLOW, value);
        }
        response
    }
}
