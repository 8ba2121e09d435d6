//! Authenticated caller identity and scope sets.
//!
//! An [`Identity`] only exists after a credential has been verified, so
//! holding one is proof of authentication. Scope checks use all-of
//! semantics: an identity satisfies a requirement only when every required
//! scope is granted.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered set of scope strings such as `read:movies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    /// Creates an empty scope set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if `scope` is in the set.
    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    /// Returns true if the set has no scopes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the scopes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the scopes of `self` that `granted` does not contain.
    #[must_use]
    pub fn missing_from(&self, granted: &Self) -> Vec<String> {
        self.0.difference(&granted.0).cloned().collect()
    }

    /// Returns true if every scope in `self` is in `granted`.
    #[must_use]
    pub fn is_subset_of(&self, granted: &Self) -> bool {
        self.0.is_subset(&granted.0)
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.iter().collect::<Vec<_>>().join(" ");
        f.write_str(&joined)
    }
}

/// A verified caller.
///
/// # Example
///
/// ```
/// use marquee_core::{Identity, ScopeSet};
///
/// let identity = Identity::new("user-1", ["read:movies", "create:movies"]);
/// let required: ScopeSet = ["read:movies"].into_iter().collect();
/// assert!(identity.satisfies(&required));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    subject: String,
    scopes: ScopeSet,
}

impl Identity {
    /// Creates an identity from a subject and its granted scopes.
    pub fn new<S: Into<String>>(
        subject: impl Into<String>,
        scopes: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            subject: subject.into(),
            scopes: scopes.into_iter().collect(),
        }
    }

    /// The subject claim (user or client id).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The granted scopes.
    #[must_use]
    pub const fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    /// Returns true if `scope` is granted.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Returns true if every scope in `required` is granted.
    ///
    /// An empty requirement is satisfied by any identity.
    #[must_use]
    pub fn satisfies(&self, required: &ScopeSet) -> bool {
        required.is_subset_of(&self.scopes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_requirement_always_satisfied() {
        let identity = Identity::new("anyone", Vec::<String>::new());
        assert!(identity.satisfies(&ScopeSet::empty()));
    }

    #[test]
    fn test_partial_grant_is_not_enough() {
        let identity = Identity::new("u", ["read:movies"]);
        let required: ScopeSet = ["read:movies", "create:movies"].into_iter().collect();
        assert!(!identity.satisfies(&required));
        assert_eq!(
            required.missing_from(identity.scopes()),
            vec!["create:movies".to_string()]
        );
    }

    #[test]
    fn test_scope_set_display_is_sorted() {
        let scopes: ScopeSet = ["update:movies", "create:movies"].into_iter().collect();
        assert_eq!(scopes.to_string(), "create:movies update:movies");
    }

    fn scope() -> impl Strategy<Value = String> {
        prop::sample::select(vec![
            "read:movies",
            "create:movies",
            "update:movies",
            "delete:movies",
            "admin",
        ])
        .prop_map(String::from)
    }

    proptest! {
        #[test]
        fn prop_satisfies_iff_every_required_scope_granted(
            granted in prop::collection::vec(scope(), 0..5),
            required in prop::collection::vec(scope(), 0..5),
        ) {
            let identity = Identity::new("subject", granted.clone());
            let required_set: ScopeSet = required.iter().cloned().collect();
            let expected = required.iter().all(|s| granted.contains(s));
            prop_assert_eq!(identity.satisfies(&required_set), expected);
            prop_assert_eq!(required_set.missing_from(identity.scopes()).is_empty(), expected);
        }
    }
}
