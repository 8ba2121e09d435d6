//! Test doubles for the pipeline's collaborators.
//!
//! [`SpyMovieService`] records every call it receives so tests can assert that
//! a rejected request never reached the business layer. [`StubVerifier`]
//! answers from a fixed token table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::DomainError;
use crate::movie::{Movie, MovieFields, MovieFilter, MovieId, MovieService, ServiceError, ServiceResult};
use crate::verifier::{CredentialVerifier, VerificationError, VerifiedCredential};
use crate::BoxFuture;

/// Identifier returned by [`SpyMovieService::create_movie`].
pub const CREATED_MOVIE_ID: &str = "5d9f1140fc13ae1f8d0000aa";

/// One recorded [`MovieService`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    /// `list_movies`
    List(MovieFilter),
    /// `get_movie`
    Get(MovieId),
    /// `create_movie`
    Create(MovieFields),
    /// `update_movie`
    Update(MovieId, MovieFields),
    /// `delete_movie`
    Delete(MovieId),
    /// `replace_movie`
    Replace(MovieId, MovieFields),
}

/// A [`MovieService`] that records calls and answers from a fixed catalogue.
///
/// Lookups of ids outside the catalogue fail with `NotFound`, except for
/// `create_movie`, which always returns [`CREATED_MOVIE_ID`].
#[derive(Debug, Default)]
pub struct SpyMovieService {
    movies: Vec<Movie>,
    calls: Mutex<Vec<ServiceCall>>,
    failure: Option<ServiceError>,
}

impl SpyMovieService {
    /// Creates a spy with an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the catalogue.
    #[must_use]
    pub fn with_movies(mut self, movies: Vec<Movie>) -> Self {
        self.movies = movies;
        self
    }

    /// Makes every operation fail with `error`.
    #[must_use]
    pub fn failing_with(mut self, error: ServiceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Returns the recorded calls.
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, call: ServiceCall) -> ServiceResult<()> {
        self.calls.lock().push(call);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn find(&self, id: &MovieId) -> ServiceResult<&Movie> {
        self.movies
            .iter()
            .find(|m| &m.id == id)
            .ok_or_else(|| DomainError::not_found("movie", id.as_str()).into())
    }
}

impl MovieService for SpyMovieService {
    fn list_movies<'a>(&'a self, filter: &'a MovieFilter) -> BoxFuture<'a, ServiceResult<Vec<Movie>>> {
        Box::pin(async move {
            self.record(ServiceCall::List(filter.clone()))?;
            Ok(self
                .movies
                .iter()
                .filter(|m| filter.matches(m))
                .cloned()
                .collect())
        })
    }

    fn get_movie<'a>(&'a self, id: &'a MovieId) -> BoxFuture<'a, ServiceResult<Movie>> {
        Box::pin(async move {
            self.record(ServiceCall::Get(id.clone()))?;
            self.find(id).cloned()
        })
    }

    fn create_movie(&self, movie: MovieFields) -> BoxFuture<'_, ServiceResult<MovieId>> {
        Box::pin(async move {
            self.record(ServiceCall::Create(movie))?;
            Ok(MovieId::from(CREATED_MOVIE_ID))
        })
    }

    fn update_movie<'a>(
        &'a self,
        id: &'a MovieId,
        movie: MovieFields,
    ) -> BoxFuture<'a, ServiceResult<MovieId>> {
        Box::pin(async move {
            self.record(ServiceCall::Update(id.clone(), movie))?;
            self.find(id).map(|m| m.id.clone())
        })
    }

    fn delete_movie<'a>(&'a self, id: &'a MovieId) -> BoxFuture<'a, ServiceResult<MovieId>> {
        Box::pin(async move {
            self.record(ServiceCall::Delete(id.clone()))?;
            self.find(id).map(|m| m.id.clone())
        })
    }

    fn replace_movie<'a>(
        &'a self,
        id: &'a MovieId,
        movie: MovieFields,
    ) -> BoxFuture<'a, ServiceResult<MovieId>> {
        Box::pin(async move {
            self.record(ServiceCall::Replace(id.clone(), movie))?;
            self.find(id).map(|m| m.id.clone())
        })
    }
}

/// A [`CredentialVerifier`] backed by a fixed token table.
///
/// Tokens not in the table are rejected.
#[derive(Debug, Default)]
pub struct StubVerifier {
    tokens: HashMap<String, Result<VerifiedCredential, VerificationError>>,
    calls: AtomicUsize,
}

impl StubVerifier {
    /// Creates a verifier that rejects every token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as `subject` with `scopes`.
    #[must_use]
    pub fn with_token<S: Into<String>>(
        mut self,
        token: impl Into<String>,
        subject: impl Into<String>,
        scopes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.tokens.insert(
            token.into(),
            Ok(VerifiedCredential::new(subject, scopes)),
        );
        self
    }

    /// Fails `token` with `error`.
    #[must_use]
    pub fn with_failure(mut self, token: impl Into<String>, error: VerificationError) -> Self {
        self.tokens.insert(token.into(), Err(error));
        self
    }

    /// Returns how many tokens were presented.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialVerifier for StubVerifier {
    fn verify<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, Result<VerifiedCredential, VerificationError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tokens
                .get(token)
                .cloned()
                .unwrap_or_else(|| Err(VerificationError::Rejected("unknown token".to_string())))
        })
    }
}

/// Builds a complete, valid movie record.
#[must_use]
pub fn sample_movie(id: &str, title: &str, tags: &[&str]) -> Movie {
    Movie::new(
        MovieId::from(id),
        MovieFields {
            title: Some(title.to_string()),
            year: Some(1994),
            cover: Some("https://img.example.com/cover.jpg".to_string()),
            description: Some("A sample movie.".to_string()),
            duration: Some(120),
            content_rating: Some("PG".to_string()),
            source: Some("https://stream.example.com/movie".to_string()),
            tags: Some(tags.iter().map(ToString::to_string).collect()),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spy_records_calls_and_reports_missing() {
        let spy = SpyMovieService::new().with_movies(vec![sample_movie(
            "5d9f1140fc13ae1f8d000001",
            "Heat",
            &["crime"],
        )]);

        let found = spy.get_movie(&MovieId::from("5d9f1140fc13ae1f8d000001")).await;
        assert!(found.is_ok());

        let missing = spy.delete_movie(&MovieId::from("5d9f1140fc13ae1f8d000002")).await;
        assert!(matches!(missing, Err(ServiceError::Domain(DomainError::NotFound { .. }))));
        assert_eq!(spy.call_count(), 2);
    }

    #[tokio::test]
    async fn test_spy_failure_still_records() {
        let spy = SpyMovieService::new().failing_with(ServiceError::Unavailable("down".into()));
        assert!(spy.create_movie(MovieFields::default()).await.is_err());
        assert_eq!(spy.calls(), vec![ServiceCall::Create(MovieFields::default())]);
    }

    #[tokio::test]
    async fn test_stub_verifier_table() {
        let verifier = StubVerifier::new()
            .with_token("good", "user-1", ["read:movies"])
            .with_failure("old", VerificationError::Expired);

        let cred = verifier.verify("good").await.unwrap();
        assert_eq!(cred.subject, "user-1");
        assert_eq!(verifier.verify("old").await, Err(VerificationError::Expired));
        assert!(verifier.verify("other").await.is_err());
        assert_eq!(verifier.call_count(), 3);
    }
}
