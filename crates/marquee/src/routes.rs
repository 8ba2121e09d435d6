//! The movie route table.

use http::{Method, StatusCode};
use marquee_config::{CacheConfig, MarqueeConfig};
use marquee_core::Location;
use marquee_middleware::{CachePolicy, Operation, RouteDescriptor};

use crate::schemas::MovieSchemas;

/// Collection path.
pub const MOVIES_PATH: &str = "/api/movies";

/// Item path.
pub const MOVIE_PATH: &str = "/api/movies/{movieId}";

/// Scope required to list or retrieve.
pub const READ_SCOPE: &str = "read:movies";
/// Scope required to create.
pub const CREATE_SCOPE: &str = "create:movies";
/// Scope required to update, and to replace when that route is guarded.
pub const UPDATE_SCOPE: &str = "update:movies";
/// Scope required to delete.
pub const DELETE_SCOPE: &str = "delete:movies";

/// Builds the six movie routes from `config`.
///
/// | Method | Path | Scope | Cache | Status |
/// |--------|------|-------|-------|--------|
/// | GET | `/api/movies` | `read:movies` | list max-age | 200 |
/// | GET | `/api/movies/{movieId}` | `read:movies` | item max-age | 200 |
/// | POST | `/api/movies` | `create:movies` | - | 201 |
/// | PUT | `/api/movies/{movieId}` | `update:movies` | - | 200 |
/// | DELETE | `/api/movies/{movieId}` | `delete:movies` | - | 200 |
/// | PATCH | `/api/movies/{movieId}` | none unless `routes.guard_replace` | - | 200 |
#[must_use]
pub fn movie_routes(config: &MarqueeConfig, schemas: &MovieSchemas) -> Vec<RouteDescriptor> {
    let (list_cache, item_cache) = cache_policies(&config.cache);

    let replace = RouteDescriptor::new(Operation::ReplaceMovie, Method::PATCH, MOVIE_PATH)
        .message("movie replaced");
    let replace = if config.routes.guard_replace {
        replace
            .require_scopes([UPDATE_SCOPE])
            .validate(Location::Path, schemas.movie_id.clone())
            .validate(Location::Body, schemas.update.clone())
    } else {
        replace.unguarded()
    };

    vec![
        RouteDescriptor::new(Operation::ListMovies, Method::GET, MOVIES_PATH)
            .require_scopes([READ_SCOPE])
            .cache_opt(list_cache)
            .message("movies listed"),
        RouteDescriptor::new(Operation::RetrieveMovie, Method::GET, MOVIE_PATH)
            .require_scopes([READ_SCOPE])
            .cache_opt(item_cache)
            .validate(Location::Path, schemas.movie_id.clone())
            .message("movies retrieved"),
        RouteDescriptor::new(Operation::CreateMovie, Method::POST, MOVIES_PATH)
            .require_scopes([CREATE_SCOPE])
            .validate(Location::Body, schemas.create.clone())
            .status(StatusCode::CREATED)
            .message("movies created"),
        RouteDescriptor::new(Operation::UpdateMovie, Method::PUT, MOVIE_PATH)
            .require_scopes([UPDATE_SCOPE])
            .validate(Location::Path, schemas.movie_id.clone())
            .validate(Location::Body, schemas.update.clone())
            .message("movies updated"),
        RouteDescriptor::new(Operation::DeleteMovie, Method::DELETE, MOVIE_PATH)
            .require_scopes([DELETE_SCOPE])
            .validate(Location::Path, schemas.movie_id.clone())
            .message("movies deleted"),
        replace,
    ]
}

fn cache_policies(cache: &CacheConfig) -> (Option<CachePolicy>, Option<CachePolicy>) {
    if cache.enabled {
        (
            Some(CachePolicy::from_secs(cache.list_max_age_secs)),
            Some(CachePolicy::from_secs(cache.item_max_age_secs)),
        )
    } else {
        (None, None)
    }
}
