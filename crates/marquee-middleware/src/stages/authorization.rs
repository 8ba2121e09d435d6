//! Scope authorization.
//!
//! Policy is all-of: the identity must hold every scope the route declares.
//! The check is pure and never suspends.
//!
//! ```text
//! Request → Authenticate → [Authorize] → CacheAnnotate → Validate → Invoke
//! ```

use std::future;

use marquee_core::{
    AuthError, AuthzError, BoxFuture, CredentialRejection, Identity, PipelineResult, ScopeSet,
};

use crate::context::PipelineContext;
use crate::stage::Stage;
use crate::types::Request;

/// Decides whether `identity` may proceed.
///
/// # Errors
///
/// Returns `AuthzError::InsufficientScope` naming every missing scope.
pub fn authorize(identity: &Identity, required: &ScopeSet) -> Result<(), AuthzError> {
    let missing = required.missing_from(identity.scopes());
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthzError::InsufficientScope { missing })
    }
}

/// Requires the declared scopes of the authenticated identity.
#[derive(Debug, Clone)]
pub struct AuthorizeStage {
    required: ScopeSet,
}

impl AuthorizeStage {
    /// Creates the stage for a route's required scopes.
    #[must_use]
    pub fn new(required: ScopeSet) -> Self {
        Self { required }
    }

    /// Returns the required scopes.
    #[must_use]
    pub fn required(&self) -> &ScopeSet {
        &self.required
    }

    fn check(&self, ctx: &PipelineContext) -> PipelineResult<()> {
        // Unreachable when the route was built through the composer, which
        // always places authentication first.
        let identity = ctx
            .identity()
            .ok_or(AuthError::InvalidCredential(CredentialRejection::Missing))?;

        authorize(identity, &self.required).map_err(|err| {
            tracing::debug!(subject = identity.subject(), %err, "scope check failed");
            err.into()
        })
    }
}

impl Stage for AuthorizeStage {
    fn name(&self) -> &'static str {
        "authorize"
    }

    fn run<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        _request: &'a Request,
    ) -> BoxFuture<'a, PipelineResult<()>> {
        Box::pin(future::ready(self.check(ctx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use marquee_core::{ErrorKind, RequestId};

    use crate::route::{Operation, PathParams};

    fn scopes(list: &[&str]) -> ScopeSet {
        list.iter().copied().collect()
    }

    #[test]
    fn test_all_of_policy() {
        let identity = Identity::new("u", ["read:movies", "create:movies"]);
        assert!(authorize(&identity, &scopes(&["read:movies"])).is_ok());
        assert!(authorize(&identity, &scopes(&["read:movies", "create:movies"])).is_ok());
        assert_eq!(
            authorize(&identity, &scopes(&["create:movies", "delete:movies"])),
            Err(AuthzError::InsufficientScope {
                missing: vec!["delete:movies".to_string()]
            })
        );
    }

    #[test]
    fn test_empty_requirement_allows() {
        let identity = Identity::new("u", Vec::<String>::new());
        assert!(authorize(&identity, &ScopeSet::empty()).is_ok());
    }

    #[tokio::test]
    async fn test_stage_without_identity_is_authentication_error() {
        let stage = AuthorizeStage::new(scopes(&["read:movies"]));
        let mut ctx =
            PipelineContext::new(RequestId::new(), Operation::ListMovies, PathParams::default());
        let request = http::Request::new(Bytes::new());
        let err = stage.run(&mut ctx, &request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_stage_denies_missing_scope() {
        let stage = AuthorizeStage::new(scopes(&["create:movies"]));
        let mut ctx =
            PipelineContext::new(RequestId::new(), Operation::CreateMovie, PathParams::default());
        ctx.set_identity(Identity::new("u", ["read:movies"]));
        let request = http::Request::new(Bytes::new());
        let err = stage.run(&mut ctx, &request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }
}
