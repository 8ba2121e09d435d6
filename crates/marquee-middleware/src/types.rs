//! HTTP types used throughout the pipeline.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

/// The HTTP request type the pipeline consumes.
///
/// The body is fully buffered before the pipeline runs.
pub type Request = http::Request<Bytes>;

/// The HTTP response type the pipeline produces.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building JSON responses.
pub trait ResponseExt {
    /// Creates a JSON response from raw bytes.
    fn json_bytes(status: StatusCode, body: Vec<u8>) -> Response;

    /// Serializes `body` into a JSON response.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `body` cannot be encoded.
    fn json<T: Serialize>(status: StatusCode, body: &T) -> serde_json::Result<Response>;
}

impl ResponseExt for Response {
    fn json_bytes(status: StatusCode, body: Vec<u8>) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    fn json<T: Serialize>(status: StatusCode, body: &T) -> serde_json::Result<Response> {
        Ok(Self::json_bytes(status, serde_json::to_vec(body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_json_response() {
        let response = Response::json(StatusCode::CREATED, &serde_json::json!({"ok": true})).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"ok":true}"#);
    }
}
