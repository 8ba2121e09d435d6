//! Bearer credential authentication.
//!
//! Extracts the token from `Authorization: Bearer <token>` and delegates
//! verification to the injected [`CredentialVerifier`]. This is the only
//! stage that suspends on I/O.
//!
//! ```text
//! Request → [Authenticate] → Authorize → CacheAnnotate → Validate → Invoke
//! ```

use std::sync::Arc;

use http::header::AUTHORIZATION;
use marquee_core::{
    AuthError, BoxFuture, CredentialRejection, CredentialVerifier, Identity, PipelineError,
    PipelineResult,
};

use crate::context::PipelineContext;
use crate::stage::Stage;
use crate::types::Request;

/// Authenticates the caller and stores the [`Identity`] on the context.
#[derive(Clone)]
pub struct AuthenticateStage {
    verifier: Arc<dyn CredentialVerifier>,
}

impl std::fmt::Debug for AuthenticateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticateStage").finish_non_exhaustive()
    }
}

impl AuthenticateStage {
    /// Creates the stage around a verifier.
    #[must_use]
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }
}

/// Extracts the bearer token from the `Authorization` header.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredential` when the header is absent, not
/// valid UTF-8, not a `Bearer` scheme, or carries an empty token.
pub fn bearer_token(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::InvalidCredential(CredentialRejection::Missing))?;

    let value = header
        .to_str()
        .map_err(|_| AuthError::InvalidCredential(CredentialRejection::Malformed))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::InvalidCredential(CredentialRejection::Malformed))?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidCredential(CredentialRejection::Malformed));
    }
    Ok(token)
}

/// Verifies `token` and builds the caller's identity.
///
/// # Errors
///
/// Rejections become `AuthError::InvalidCredential`. A verifier that cannot
/// run at all yields an unexpected error.
pub async fn authenticate(
    verifier: &dyn CredentialVerifier,
    token: &str,
) -> PipelineResult<Identity> {
    match verifier.verify(token).await {
        Ok(credential) => Ok(Identity::new(credential.subject, credential.scopes)),
        Err(err) => match err.rejection() {
            Some(rejection) => Err(AuthError::InvalidCredential(rejection).into()),
            None => Err(PipelineError::unexpected(err.to_string())),
        },
    }
}

impl Stage for AuthenticateStage {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn run<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: &'a Request,
    ) -> BoxFuture<'a, PipelineResult<()>> {
        Box::pin(async move {
            let token = bearer_token(request)?;
            let identity = authenticate(self.verifier.as_ref(), token).await?;
            tracing::debug!(subject = identity.subject(), "caller authenticated");
            ctx.set_identity(identity);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use marquee_core::fixtures::StubVerifier;
    use marquee_core::{ErrorKind, RequestId, VerificationError};

    use crate::route::{Operation, PathParams};

    fn request(auth: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/api/movies");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Bytes::new()).unwrap()
    }

    fn ctx() -> PipelineContext {
        PipelineContext::new(RequestId::new(), Operation::ListMovies, PathParams::default())
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&request(Some("Bearer abc"))), Ok("abc"));
        assert_eq!(bearer_token(&request(Some("bearer  abc "))), Ok("abc"));
        assert_eq!(
            bearer_token(&request(None)),
            Err(AuthError::InvalidCredential(CredentialRejection::Missing))
        );
        for bad in ["Basic abc", "Bearer", "Bearer   ", "abc"] {
            assert_eq!(
                bearer_token(&request(Some(bad))),
                Err(AuthError::InvalidCredential(CredentialRejection::Malformed)),
                "{bad}"
            );
        }
    }

    #[tokio::test]
    async fn test_valid_token_sets_identity() {
        let stage = AuthenticateStage::new(Arc::new(
            StubVerifier::new().with_token("t1", "user-1", ["read:movies"]),
        ));
        let mut ctx = ctx();
        stage.run(&mut ctx, &request(Some("Bearer t1"))).await.unwrap();

        let identity = ctx.identity().unwrap();
        assert_eq!(identity.subject(), "user-1");
        assert!(identity.has_scope("read:movies"));
    }

    #[tokio::test]
    async fn test_missing_token_skips_verifier() {
        let verifier = Arc::new(StubVerifier::new());
        let stage = AuthenticateStage::new(verifier.clone());
        let mut ctx = ctx();

        let err = stage.run(&mut ctx, &request(None)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(verifier.call_count(), 0);
        assert!(ctx.identity().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_authentication_error() {
        let stage = AuthenticateStage::new(Arc::new(
            StubVerifier::new().with_failure("old", VerificationError::Expired),
        ));
        let err = stage
            .run(&mut ctx(), &request(Some("Bearer old")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Authentication(AuthError::InvalidCredential(CredentialRejection::Expired))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_verifier_is_internal() {
        let stage = AuthenticateStage::new(Arc::new(StubVerifier::new().with_failure(
            "t",
            VerificationError::Unavailable("jwks fetch failed".into()),
        )));
        let err = stage
            .run(&mut ctx(), &request(Some("Bearer t")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
