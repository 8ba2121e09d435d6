//! Raw request inputs as JSON values.
//!
//! Validators and the business invoker read the same three locations; this
//! module turns each into a `serde_json::Value` object.

use marquee_core::{FieldError, Location, ValidationError};
use serde_json::{Map, Value};

use crate::route::PathParams;
use crate::types::Request;

/// Returns the path parameters as an object of strings.
#[must_use]
pub fn path_input(params: &PathParams) -> Value {
    Value::Object(
        params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect(),
    )
}

/// Parses the query string into an object.
///
/// A key that appears once maps to a string; a repeated key maps to an array
/// of strings in order of appearance.
///
/// # Errors
///
/// Returns a validation error if the query string is not valid
/// `application/x-www-form-urlencoded`.
pub fn query_input(request: &Request) -> Result<Value, ValidationError> {
    let query = request.uri().query().unwrap_or_default();
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).map_err(|e| {
        ValidationError::single(
            Location::Query,
            FieldError::new("", format!("malformed query string: {e}"), "INVALID_QUERY"),
        )
    })?;

    let mut object = Map::new();
    for (key, value) in pairs {
        match object.get_mut(&key) {
            None => {
                object.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    Ok(Value::Object(object))
}

/// Parses the JSON body. An empty body is treated as `{}`.
///
/// # Errors
///
/// Returns a validation error if the body is not valid JSON.
pub fn body_input(request: &Request) -> Result<Value, ValidationError> {
    let body = request.body();
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| {
        ValidationError::single(
            Location::Body,
            FieldError::new("", format!("request body is not valid JSON: {e}"), "INVALID_JSON"),
        )
    })
}

/// Reads the raw input for `location`.
///
/// # Errors
///
/// Propagates query and body parse failures.
pub fn raw_input(location: Location, params: &PathParams, request: &Request) -> Result<Value, ValidationError> {
    match location {
        Location::Path => Ok(path_input(params)),
        Location::Query => query_input(request),
        Location::Body => body_input(request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn get(uri: &str) -> Request {
        http::Request::builder().uri(uri).body(Bytes::new()).unwrap()
    }

    fn post(body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/api/movies")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    #[test]
    fn test_query_single_and_repeated_keys() {
        assert_eq!(query_input(&get("/m")).unwrap(), json!({}));
        assert_eq!(
            query_input(&get("/m?tags=action")).unwrap(),
            json!({"tags": "action"})
        );
        assert_eq!(
            query_input(&get("/m?tags=action&tags=drama&tags=crime&q=x%20y")).unwrap(),
            json!({"tags": ["action", "drama", "crime"], "q": "x y"})
        );
    }

    #[test]
    fn test_body_parsing() {
        assert_eq!(body_input(&post("")).unwrap(), json!({}));
        assert_eq!(body_input(&post(" \n")).unwrap(), json!({}));
        assert_eq!(body_input(&post(r#"{"a":1}"#)).unwrap(), json!({"a": 1}));
        let err = body_input(&post("{not json")).unwrap_err();
        assert_eq!(err.location, Location::Body);
        assert_eq!(err.fields[0].code, "INVALID_JSON");
    }

    #[test]
    fn test_path_input() {
        let params: PathParams = [("movieId", "abc")].into_iter().collect();
        assert_eq!(path_input(&params), json!({"movieId": "abc"}));
    }
}
