//! Request identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps request IDs sortable in logs.
///
/// # Example
///
/// ```
/// use marquee_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(RequestId::parse(&id.to_string()), Some(id));
/// assert_eq!(RequestId::parse("not-a-uuid"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a caller-supplied `x-request-id` value.
    ///
    /// Returns `None` unless the value is a well-formed UUID.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_time_ordered() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert!(a.as_uuid() < b.as_uuid());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id = RequestId::new();
        assert_eq!(RequestId::parse(&format!("  {id} ")), Some(id));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RequestId::parse("").is_none());
        assert!(RequestId::parse("12345").is_none());
    }
}
