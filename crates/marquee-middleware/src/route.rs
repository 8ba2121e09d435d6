//! Route descriptors and path patterns.
//!
//! A [`RouteDescriptor`] is the static, declarative description of one
//! endpoint: method, path pattern, required scopes, validators, cache policy,
//! success status and message. The composer derives each route's stage list
//! from its descriptor, so no route hand-writes its own ordering.

use std::fmt;
use std::sync::Arc;

use http::{Method, StatusCode};
use marquee_core::{Location, ScopeSet};
use thiserror::Error;

use crate::schema::Schema;
use crate::stages::CachePolicy;

/// Name of the movie identifier path parameter.
pub const MOVIE_ID_PARAM: &str = "movieId";

/// The business operation a route invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// List movies, optionally filtered by tags.
    ListMovies,
    /// Fetch one movie.
    RetrieveMovie,
    /// Create a movie.
    CreateMovie,
    /// Update a movie with the provided fields.
    UpdateMovie,
    /// Delete a movie.
    DeleteMovie,
    /// Replace a movie with the raw request body.
    ReplaceMovie,
}

impl Operation {
    /// Returns the operation id used in logs and metrics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ListMovies => "listMovies",
            Self::RetrieveMovie => "getMovie",
            Self::CreateMovie => "createMovie",
            Self::UpdateMovie => "updateMovie",
            Self::DeleteMovie => "deleteMovie",
            Self::ReplaceMovie => "replaceMovie",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors building a route table.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The path pattern could not be parsed.
    #[error("invalid path pattern '{path}': {reason}")]
    InvalidPath {
        /// The offending pattern.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two routes share a method and pattern.
    #[error("duplicate route {method} {path}")]
    DuplicateRoute {
        /// HTTP method.
        method: Method,
        /// Path pattern.
        path: String,
    },

    /// A guarded route was registered without a credential verifier.
    #[error("route '{0}' requires authentication but no credential verifier was provided")]
    MissingVerifier(Operation),

    /// An unguarded route declared required scopes it could never check.
    #[error("route '{0}' is unguarded but declares required scopes")]
    UnguardedWithScopes(Operation),

    /// No business service was provided.
    #[error("no movie service was provided")]
    MissingService,
}

/// Path parameters captured by a [`PathPattern`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Adds a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push((name.into(), value.into()));
    }

    /// Gets a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if no parameters were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates parameters in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed path pattern such as `/api/movies/{movieId}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::InvalidPath` if the pattern does not start with
    /// `/`, has an empty or unterminated parameter, or repeats a parameter.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPath {
            path: pattern.to_string(),
            reason: reason.to_string(),
        };

        let rest = pattern.strip_prefix('/').ok_or_else(|| invalid("must start with '/'"))?;
        let mut segments = Vec::new();
        for part in split_segments(rest) {
            if let Some(inner) = part.strip_prefix('{') {
                let name = inner
                    .strip_suffix('}')
                    .ok_or_else(|| invalid("unterminated parameter"))?;
                if name.is_empty() {
                    return Err(invalid("empty parameter name"));
                }
                if segments.iter().any(|s| matches!(s, Segment::Param(n) if n == name)) {
                    return Err(invalid("repeated parameter name"));
                }
                segments.push(Segment::Param(name.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(invalid("parameters must span a whole segment"));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// Matches `path`, returning the captured parameters.
    ///
    /// A single trailing slash is ignored. Captured values are
    /// percent-decoded; a segment that does not decode to UTF-8 never
    /// matches.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = split_segments(rest).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.push(name.as_str(), urlencoding::decode(part).ok()?);
                }
                _ => return None,
            }
        }
        Some(params)
    }

    /// Returns the pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn split_segments(rest: &str) -> impl Iterator<Item = &str> {
    let trimmed = rest.strip_suffix('/').unwrap_or(rest);
    trimmed.split('/').filter(move |_| !trimmed.is_empty())
}

/// Static metadata for one endpoint.
///
/// # Example
///
/// ```
/// use http::{Method, StatusCode};
/// use marquee_middleware::route::{Operation, RouteDescriptor};
/// use marquee_middleware::stages::CachePolicy;
///
/// let route = RouteDescriptor::new(Operation::ListMovies, Method::GET, "/api/movies")
///     .require_scopes(["read:movies"])
///     .cache(CachePolicy::FIVE_MINUTES)
///     .message("movies listed");
///
/// assert!(route.is_guarded());
/// assert_eq!(route.success_status(), StatusCode::OK);
/// ```
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    operation: Operation,
    method: Method,
    path: String,
    required_scopes: ScopeSet,
    validators: Vec<(Location, Arc<Schema>)>,
    cache: Option<CachePolicy>,
    success_status: StatusCode,
    message: String,
    guarded: bool,
}

impl RouteDescriptor {
    /// Creates a guarded route answering 200 with an empty message.
    pub fn new(operation: Operation, method: Method, path: impl Into<String>) -> Self {
        Self {
            operation,
            method,
            path: path.into(),
            required_scopes: ScopeSet::empty(),
            validators: Vec::new(),
            cache: None,
            success_status: StatusCode::OK,
            message: String::new(),
            guarded: true,
        }
    }

    /// Adds required scopes.
    #[must_use]
    pub fn require_scopes<S: Into<String>>(mut self, scopes: impl IntoIterator<Item = S>) -> Self {
        let mut all: Vec<String> = self.required_scopes.iter().map(str::to_string).collect();
        all.extend(scopes.into_iter().map(Into::into));
        self.required_scopes = all.into_iter().collect();
        self
    }

    /// Appends a validator. Validators run in the order they are added.
    #[must_use]
    pub fn validate(mut self, location: Location, schema: Arc<Schema>) -> Self {
        self.validators.push((location, schema));
        self
    }

    /// Sets the cache policy.
    #[must_use]
    pub fn cache(mut self, policy: CachePolicy) -> Self {
        self.cache = Some(policy);
        self
    }

    /// Sets or clears the cache policy.
    #[must_use]
    pub fn cache_opt(mut self, policy: Option<CachePolicy>) -> Self {
        self.cache = policy;
        self
    }

    /// Sets the success status.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.success_status = status;
        self
    }

    /// Sets the success message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Skips authentication and authorization for this route.
    #[must_use]
    pub fn unguarded(mut self) -> Self {
        self.guarded = false;
        self
    }

    /// The business operation.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path pattern text.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Scopes the caller must hold.
    #[must_use]
    pub fn required_scopes(&self) -> &ScopeSet {
        &self.required_scopes
    }

    /// Validators in declaration order.
    #[must_use]
    pub fn validators(&self) -> &[(Location, Arc<Schema>)] {
        &self.validators
    }

    /// The cache policy, if this is a cached read route.
    #[must_use]
    pub fn cache_policy(&self) -> Option<CachePolicy> {
        self.cache
    }

    /// Status returned on success.
    #[must_use]
    pub fn success_status(&self) -> StatusCode {
        self.success_status
    }

    /// Message returned on success.
    #[must_use]
    pub fn success_message(&self) -> &str {
        &self.message
    }

    /// Whether authentication and authorization run.
    #[must_use]
    pub fn is_guarded(&self) -> bool {
        self.guarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        let pattern = PathPattern::parse("/api/movies/{movieId}").unwrap();
        let params = pattern.matches("/api/movies/abc").unwrap();
        assert_eq!(params.get(MOVIE_ID_PARAM), Some("abc"));
        assert!(pattern.matches("/api/movies/abc/").is_some());
        assert!(pattern.matches("/api/movies").is_none());
        assert!(pattern.matches("/api/movies/").is_none());
        assert!(pattern.matches("/api/shows/abc").is_none());
        assert!(pattern.matches("/api/movies/abc/extra").is_none());
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let pattern = PathPattern::parse("/api/movies/{movieId}").unwrap();
        let params = pattern.matches("/api/movies/5d9f%20x%2Fy").unwrap();
        assert_eq!(params.get(MOVIE_ID_PARAM), Some("5d9f x/y"));
        assert!(pattern.matches("/api/movies/%FF").is_none());
    }

    #[test]
    fn test_collection_pattern() {
        let pattern = PathPattern::parse("/api/movies").unwrap();
        let params = pattern.matches("/api/movies").unwrap();
        assert!(params.is_empty());
        assert!(pattern.matches("/api/movies/").is_some());
        assert!(pattern.matches("/").is_none());
    }

    #[test]
    fn test_root_pattern() {
        let pattern = PathPattern::parse("/").unwrap();
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("/x").is_none());
    }

    #[test]
    fn test_invalid_patterns() {
        for bad in ["api/movies", "/movies/{", "/movies/{}", "/m/{a}/{a}", "/m/x{a}"] {
            assert!(PathPattern::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_descriptor_builder() {
        let route = RouteDescriptor::new(Operation::CreateMovie, Method::POST, "/api/movies")
            .require_scopes(["create:movies"])
            .require_scopes(["audit:movies"])
            .status(StatusCode::CREATED)
            .message("movies created");

        assert_eq!(route.required_scopes().len(), 2);
        assert_eq!(route.success_status(), StatusCode::CREATED);
        assert_eq!(route.success_message(), "movies created");
        assert!(route.cache_policy().is_none());
        assert!(!route.clone().unguarded().is_guarded());
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::RetrieveMovie.to_string(), "getMovie");
        assert_eq!(Operation::ReplaceMovie.name(), "replaceMovie");
    }
}
