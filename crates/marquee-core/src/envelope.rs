//! The uniform success body.

use serde::{Deserialize, Serialize};

/// Every successful response body is `{"data": ..., "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Operation result.
    pub data: T,
    /// Route-specific success message, e.g. `movies listed`.
    pub message: String,
}

impl<T> Envelope<T> {
    /// Wraps `data` with a message.
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

impl<T: Serialize> Envelope<T> {
    /// Serializes the envelope to JSON bytes.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let envelope = Envelope::new(vec!["a", "b"], "movies listed");
        let value: serde_json::Value =
            serde_json::from_slice(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"data": ["a", "b"], "message": "movies listed"}));
    }
}
