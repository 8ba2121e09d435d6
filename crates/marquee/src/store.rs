//! In-memory movie store.

use std::collections::BTreeMap;
use std::future::ready;

use marquee_core::{
    BoxFuture, DomainError, Movie, MovieFields, MovieFilter, MovieId, MovieService, ServiceResult,
};
use parking_lot::RwLock;

/// A [`MovieService`] backed by a map in process memory.
///
/// Listing returns movies in identifier order. Nothing is persisted.
#[derive(Debug, Default)]
pub struct InMemoryMovieService {
    movies: RwLock<BTreeMap<MovieId, MovieFields>>,
}

impl InMemoryMovieService {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `movies`.
    #[must_use]
    pub fn with_movies(movies: impl IntoIterator<Item = Movie>) -> Self {
        let movies = movies.into_iter().map(|m| (m.id, m.fields)).collect();
        Self {
            movies: RwLock::new(movies),
        }
    }

    /// Number of stored movies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.movies.read().len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.movies.read().is_empty()
    }

    fn list(&self, filter: &MovieFilter) -> Vec<Movie> {
        self.movies
            .read()
            .iter()
            .map(|(id, fields)| Movie::new(id.clone(), fields.clone()))
            .filter(|movie| filter.matches(movie))
            .collect()
    }

    fn get(&self, id: &MovieId) -> ServiceResult<Movie> {
        self.movies
            .read()
            .get(id)
            .map(|fields| Movie::new(id.clone(), fields.clone()))
            .ok_or_else(|| not_found(id))
    }

    fn create(&self, fields: MovieFields) -> MovieId {
        let mut movies = self.movies.write();
        let mut id = MovieId::generate();
        while movies.contains_key(&id) {
            id = MovieId::generate();
        }
        movies.insert(id.clone(), fields);
        id
    }

    fn modify(&self, id: &MovieId, apply: impl FnOnce(&mut MovieFields)) -> ServiceResult<MovieId> {
        let mut movies = self.movies.write();
        let fields = movies.get_mut(id).ok_or_else(|| not_found(id))?;
        apply(fields);
        Ok(id.clone())
    }

    fn remove(&self, id: &MovieId) -> ServiceResult<MovieId> {
        self.movies
            .write()
            .remove(id)
            .map(|_| id.clone())
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: &MovieId) -> marquee_core::ServiceError {
    DomainError::not_found("movie", id.as_str()).into()
}

impl MovieService for InMemoryMovieService {
    fn list_movies<'a>(&'a self, filter: &'a MovieFilter) -> BoxFuture<'a, ServiceResult<Vec<Movie>>> {
        Box::pin(ready(Ok(self.list(filter))))
    }

    fn get_movie<'a>(&'a self, id: &'a MovieId) -> BoxFuture<'a, ServiceResult<Movie>> {
        Box::pin(ready(self.get(id)))
    }

    fn create_movie(&self, movie: MovieFields) -> BoxFuture<'_, ServiceResult<MovieId>> {
        Box::pin(ready(Ok(self.create(movie))))
    }

    fn update_movie<'a>(
        &'a self,
        id: &'a MovieId,
        movie: MovieFields,
    ) -> BoxFuture<'a, ServiceResult<MovieId>> {
        Box::pin(ready(self.modify(id, |fields| fields.merge(movie))))
    }

    fn delete_movie<'a>(&'a self, id: &'a MovieId) -> BoxFuture<'a, ServiceResult<MovieId>> {
        Box::pin(ready(self.remove(id)))
    }

    fn replace_movie<'a>(
        &'a self,
        id: &'a MovieId,
        movie: MovieFields,
    ) -> BoxFuture<'a, ServiceResult<MovieId>> {
        Box::pin(ready(self.modify(id, |fields| *fields = movie)))
    }
}
