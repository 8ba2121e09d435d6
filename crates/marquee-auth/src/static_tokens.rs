//! Opaque bearer tokens from a fixed table.

use std::collections::HashMap;
use std::fmt;

use marquee_core::{BoxFuture, CredentialVerifier, VerificationError, VerifiedCredential};

/// Verifies tokens by exact lookup in a startup-time table.
#[derive(Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, VerifiedCredential>,
}

impl StaticTokenVerifier {
    /// Creates an empty table; every token is rejected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `token`, granting `scopes` to `subject`.
    #[must_use]
    pub fn with_token<S: Into<String>>(
        mut self,
        token: impl Into<String>,
        subject: impl Into<String>,
        scopes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.insert(token, subject, scopes);
        self
    }

    /// Adds `token`, replacing any previous entry for it.
    pub fn insert<S: Into<String>>(
        &mut self,
        token: impl Into<String>,
        subject: impl Into<String>,
        scopes: impl IntoIterator<Item = S>,
    ) {
        self.tokens
            .insert(token.into(), VerifiedCredential::new(subject, scopes));
    }

    /// Number of configured tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when no tokens are configured.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

// Token values stay out of debug output.
impl fmt::Debug for StaticTokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenVerifier")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl CredentialVerifier for StaticTokenVerifier {
    fn verify<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, Result<VerifiedCredential, VerificationError>> {
        let result = self
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| VerificationError::Rejected("unknown token".to_string()));
        Box::pin(std::future::ready(result))
    }
}
