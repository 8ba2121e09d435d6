//! Movie catalogue model and the business collaborator contract.
//!
//! The pipeline never touches storage directly. Every route ends by invoking
//! one [`MovieService`] operation with inputs that have already been
//! authenticated, authorized and validated.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::{DomainError, PipelineError};
use crate::BoxFuture;

/// Length of a movie identifier in hex characters.
pub const MOVIE_ID_LEN: usize = 24;

/// A 24-character hexadecimal movie identifier.
///
/// Identifiers are case-insensitive and always held in lower case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MovieId(String);

impl MovieId {
    /// Wraps an identifier string, lower-casing it.
    pub fn new(id: impl Into<String>) -> Self {
        let mut id = id.into();
        id.make_ascii_lowercase();
        Self(id)
    }

    /// Generates a fresh time-ordered identifier.
    #[must_use]
    pub fn generate() -> Self {
        let hex = Uuid::now_v7().simple().to_string();
        Self(hex[..MOVIE_ID_LEN].to_string())
    }

    /// Returns true if the identifier is exactly 24 hex characters.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == MOVIE_ID_LEN && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MovieId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MovieId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<MovieId> for String {
    fn from(id: MovieId) -> Self {
        id.0
    }
}

/// Movie attributes.
///
/// Every field is optional so the same type carries full records, partial
/// updates and raw replacements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieFields {
    /// Title, at most 80 characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Release year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    /// Cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    /// Synopsis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Running time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    /// Content rating, e.g. `PG-13`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_rating: Option<String>,
    /// Streaming source URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl MovieFields {
    /// Overlays every field present in `patch` onto `self`.
    pub fn merge(&mut self, patch: Self) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if patch.$field.is_some() { self.$field = patch.$field; })*
            };
        }
        overlay!(title, year, cover, description, duration, content_rating, source, tags);
    }
}

/// A stored movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// Identifier.
    pub id: MovieId,
    /// Attributes.
    #[serde(flatten)]
    pub fields: MovieFields,
}

impl Movie {
    /// Creates a movie record.
    #[must_use]
    pub const fn new(id: MovieId, fields: MovieFields) -> Self {
        Self { id, fields }
    }
}

/// List filter.
///
/// A movie matches when it carries at least one of the requested tags. An
/// empty filter matches every movie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieFilter {
    /// Requested tags.
    pub tags: Vec<String>,
}

impl MovieFilter {
    /// Creates a filter on the given tags.
    pub fn tags<S: Into<String>>(tags: impl IntoIterator<Item = S>) -> Self {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `movie` passes the filter.
    #[must_use]
    pub fn matches(&self, movie: &Movie) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        movie
            .fields
            .tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| self.tags.contains(t)))
    }
}

/// Failure reported by a [`MovieService`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The operation was rejected for a domain reason.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The backing store could not serve the request.
    #[error("movie service unavailable: {0}")]
    Unavailable(String),
}

impl From<ServiceError> for PipelineError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(domain) => Self::Domain(domain),
            ServiceError::Unavailable(reason) => Self::unexpected(format!(
                "movie service unavailable: {reason}"
            )),
        }
    }
}

/// Result type for [`MovieService`] operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// The business collaborator behind every movie route.
pub trait MovieService: Send + Sync + 'static {
    /// Lists movies matching `filter`.
    fn list_movies<'a>(&'a self, filter: &'a MovieFilter) -> BoxFuture<'a, ServiceResult<Vec<Movie>>>;

    /// Fetches one movie.
    fn get_movie<'a>(&'a self, id: &'a MovieId) -> BoxFuture<'a, ServiceResult<Movie>>;

    /// Stores a new movie and returns its identifier.
    fn create_movie(&self, movie: MovieFields) -> BoxFuture<'_, ServiceResult<MovieId>>;

    /// Overlays `movie` onto an existing record.
    fn update_movie<'a>(
        &'a self,
        id: &'a MovieId,
        movie: MovieFields,
    ) -> BoxFuture<'a, ServiceResult<MovieId>>;

    /// Removes a movie.
    fn delete_movie<'a>(&'a self, id: &'a MovieId) -> BoxFuture<'a, ServiceResult<MovieId>>;

    /// Replaces an existing record wholesale.
    fn replace_movie<'a>(
        &'a self,
        id: &'a MovieId,
        movie: MovieFields,
    ) -> BoxFuture<'a, ServiceResult<MovieId>>;
}
