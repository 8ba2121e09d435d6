//! Business operation dispatch.
//!
//! Reads the validated inputs from the context (falling back to the raw
//! request for locations no validator covered) and calls the matching
//! [`MovieService`] method.

use marquee_core::{
    FieldError, Location, MovieFields, MovieFilter, MovieId, MovieService, PipelineError,
    PipelineResult, ValidationError,
};
use serde::Serialize;
use serde_json::Value;

use crate::context::PipelineContext;
use crate::inputs::raw_input;
use crate::route::{Operation, MOVIE_ID_PARAM};
use crate::types::Request;

impl Operation {
    /// Invokes the operation and returns its result as JSON.
    ///
    /// # Errors
    ///
    /// Service failures are converted into [`PipelineError`]; they are never
    /// swallowed.
    pub async fn invoke(
        self,
        ctx: &PipelineContext,
        request: &Request,
        service: &dyn MovieService,
    ) -> PipelineResult<Value> {
        match self {
            Self::ListMovies => {
                let filter = movie_filter(&input(ctx, request, Location::Query)?);
                encode(&service.list_movies(&filter).await?)
            }
            Self::RetrieveMovie => {
                let id = movie_id(ctx, request)?;
                encode(&service.get_movie(&id).await?)
            }
            Self::CreateMovie => {
                let movie = movie_fields(ctx, request)?;
                encode(&service.create_movie(movie).await?)
            }
            Self::UpdateMovie => {
                let id = movie_id(ctx, request)?;
                let movie = movie_fields(ctx, request)?;
                encode(&service.update_movie(&id, movie).await?)
            }
            Self::DeleteMovie => {
                let id = movie_id(ctx, request)?;
                encode(&service.delete_movie(&id).await?)
            }
            Self::ReplaceMovie => {
                let id = movie_id(ctx, request)?;
                let movie = movie_fields(ctx, request)?;
                encode(&service.replace_movie(&id, movie).await?)
            }
        }
    }
}

fn input(ctx: &PipelineContext, request: &Request, location: Location) -> PipelineResult<Value> {
    match ctx.input(location) {
        Some(value) => Ok(value.clone()),
        None => Ok(raw_input(location, ctx.path_params(), request)?),
    }
}

fn movie_id(ctx: &PipelineContext, request: &Request) -> PipelineResult<MovieId> {
    input(ctx, request, Location::Path)?
        .get(MOVIE_ID_PARAM)
        .and_then(Value::as_str)
        .map(MovieId::from)
        .ok_or_else(|| {
            ValidationError::single(
                Location::Path,
                FieldError::new(MOVIE_ID_PARAM, "movieId is required", "FIELD_REQUIRED"),
            )
            .into()
        })
}

/// `tags` may be a single string or an array of strings.
fn movie_filter(query: &Value) -> MovieFilter {
    match query.get("tags") {
        Some(Value::String(tag)) => MovieFilter::tags([tag.as_str()]),
        Some(Value::Array(tags)) => MovieFilter::tags(tags.iter().filter_map(Value::as_str)),
        _ => MovieFilter::default(),
    }
}

fn movie_fields(ctx: &PipelineContext, request: &Request) -> PipelineResult<MovieFields> {
    let body = input(ctx, request, Location::Body)?;
    serde_json::from_value(body).map_err(|e| {
        ValidationError::single(
            Location::Body,
            FieldError::new("", format!("request body is not a movie: {e}"), "INVALID_BODY"),
        )
        .into()
    })
}

fn encode<T: Serialize>(result: &T) -> PipelineResult<Value> {
    serde_json::to_value(result)
        .map_err(|e| PipelineError::unexpected_with_source("failed to encode operation result", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use marquee_core::fixtures::{sample_movie, ServiceCall, SpyMovieService};
    use marquee_core::{ErrorKind, RequestId};
    use serde_json::json;

    use crate::route::PathParams;

    const ID: &str = "5d9f1140fc13ae1f8d000001";

    fn ctx(operation: Operation, id: Option<&str>) -> PipelineContext {
        let params = id
            .map(|id| [(MOVIE_ID_PARAM, id)].into_iter().collect::<PathParams>())
            .unwrap_or_default();
        PipelineContext::new(RequestId::new(), operation, params)
    }

    #[test]
    fn test_filter_from_query_shapes() {
        assert_eq!(movie_filter(&json!({})), MovieFilter::default());
        assert_eq!(movie_filter(&json!({"tags": "action"})), MovieFilter::tags(["action"]));
        assert_eq!(
            movie_filter(&json!({"tags": ["action", "drama"]})),
            MovieFilter::tags(["action", "drama"])
        );
    }

    #[tokio::test]
    async fn test_list_uses_validated_query() {
        let spy = SpyMovieService::new().with_movies(vec![sample_movie(ID, "Heat", &["action"])]);
        let mut ctx = ctx(Operation::ListMovies, None);
        ctx.set_input(Location::Query, json!({"tags": ["action"]}));
        let request = http::Request::new(Bytes::new());

        let data = Operation::ListMovies.invoke(&ctx, &request, &spy).await.unwrap();
        assert_eq!(data.as_array().unwrap().len(), 1);
        assert_eq!(spy.calls(), vec![ServiceCall::List(MovieFilter::tags(["action"]))]);
    }

    #[tokio::test]
    async fn test_replace_reads_raw_inputs() {
        let spy = SpyMovieService::new().with_movies(vec![sample_movie(ID, "Heat", &[])]);
        let ctx = ctx(Operation::ReplaceMovie, Some(ID));
        let request = http::Request::new(Bytes::from_static(br#"{"title":"Ronin"}"#));

        let data = Operation::ReplaceMovie.invoke(&ctx, &request, &spy).await.unwrap();
        assert_eq!(data, json!(ID));
        let ServiceCall::Replace(id, fields) = &spy.calls()[0] else {
            panic!("expected a replace call");
        };
        assert_eq!(id.as_str(), ID);
        assert_eq!(fields.title.as_deref(), Some("Ronin"));
    }

    #[tokio::test]
    async fn test_ill_typed_body_is_validation_error() {
        let spy = SpyMovieService::new();
        let ctx = ctx(Operation::ReplaceMovie, Some(ID));
        let request = http::Request::new(Bytes::from_static(br#"{"year":"soon"}"#));

        let err = Operation::ReplaceMovie.invoke(&ctx, &request, &spy).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn test_not_found_is_forwarded() {
        let spy = SpyMovieService::new();
        let ctx = ctx(Operation::RetrieveMovie, Some(ID));
        let request = http::Request::new(Bytes::new());

        let err = Operation::RetrieveMovie.invoke(&ctx, &request, &spy).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
