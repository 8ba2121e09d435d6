//! The pipeline composer.
//!
//! Each [`RouteDescriptor`] is compiled once, at startup, into a
//! [`RoutePipeline`]: an ordered list of stages derived from the descriptor.
//!
//! ## Stage Order
//!
//! 1. **Authenticate** - guarded routes only
//! 2. **Authorize** - guarded routes only, all-of over the declared scopes
//! 3. **Cache-annotate** - routes with a cache policy
//! 4. **Validate** - each declared validator, in declaration order
//! 5. **Invoke** - the business operation
//!
//! A traversal is a single linear pass with one terminal [`Outcome`]. The
//! first stage to return `Err` ends it; nothing after that stage runs and no
//! success envelope is built.
//!
//! All routes, the business service and the error handler are held in a
//! [`RouteTable`], which is immutable and shared across requests.

use std::sync::Arc;

use bytes::Bytes;
use http::header::CACHE_CONTROL;
use http::{HeaderValue, Method, StatusCode};
use marquee_core::{
    CredentialVerifier, Envelope, ErrorKind, MovieService, PipelineError, PipelineResult,
    RequestId,
};
use http_body_util::Full;
use marquee_telemetry::metrics::{record_request, record_stage_failure};
use serde_json::Value;
use tracing::Instrument;

use crate::context::PipelineContext;
use crate::error_handler::ErrorHandler;
use crate::route::{PathParams, PathPattern, RouteDescriptor, RouteError};
use crate::stage::BoxedStage;
use crate::stages::{AuthenticateStage, AuthorizeStage, CacheAnnotateStage, ValidateStage};
use crate::types::{Request, Response, ResponseExt};

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Stage name reported when the business operation fails.
pub const INVOKE_STAGE: &str = "invoke";

/// The terminal state of one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every stage passed and the operation returned.
    Succeeded {
        /// The success status sent.
        status: StatusCode,
    },
    /// A stage or the operation failed.
    Failed {
        /// The stage that failed.
        stage: &'static str,
        /// The classified error kind.
        kind: ErrorKind,
    },
}

/// A failure tagged with the stage that produced it.
#[derive(Debug)]
pub struct StageFailure {
    /// Stage name.
    pub stage: &'static str,
    /// The error.
    pub error: PipelineError,
}

/// A descriptor plus its derived stage list.
pub struct RoutePipeline {
    descriptor: RouteDescriptor,
    pattern: PathPattern,
    stages: Vec<BoxedStage>,
}

impl std::fmt::Debug for RoutePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutePipeline")
            .field("operation", &self.descriptor.operation())
            .field("method", self.descriptor.method())
            .field("path", &self.pattern.as_str())
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl RoutePipeline {
    /// Derives the stage list for `descriptor`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid path, a guarded route with no verifier, or an
    /// unguarded route that declares scopes.
    pub fn build(
        descriptor: RouteDescriptor,
        verifier: Option<&Arc<dyn CredentialVerifier>>,
    ) -> Result<Self, RouteError> {
        let pattern = PathPattern::parse(descriptor.path())?;
        let mut stages: Vec<BoxedStage> = Vec::new();

        if descriptor.is_guarded() {
            let verifier =
                verifier.ok_or(RouteError::MissingVerifier(descriptor.operation()))?;
            stages.push(Arc::new(AuthenticateStage::new(Arc::clone(verifier))));
            stages.push(Arc::new(AuthorizeStage::new(
                descriptor.required_scopes().clone(),
            )));
        } else if !descriptor.required_scopes().is_empty() {
            return Err(RouteError::UnguardedWithScopes(descriptor.operation()));
        }

        if let Some(policy) = descriptor.cache_policy() {
            stages.push(Arc::new(CacheAnnotateStage::new(policy)));
        }

        for (location, schema) in descriptor.validators() {
            stages.push(Arc::new(ValidateStage::new(*location, Arc::clone(schema))));
        }

        Ok(Self {
            descriptor,
            pattern,
            stages,
        })
    }

    /// The route's descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &RouteDescriptor {
        &self.descriptor
    }

    /// Stage names in execution order, ending with the invocation.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .map(|stage| stage.name())
            .chain(std::iter::once(INVOKE_STAGE))
            .collect()
    }

    /// Runs every stage, then the operation.
    ///
    /// # Errors
    ///
    /// Returns the first failure, tagged with its stage.
    pub async fn traverse(
        &self,
        ctx: &mut PipelineContext,
        request: &Request,
        service: &dyn MovieService,
    ) -> Result<Value, StageFailure> {
        for stage in &self.stages {
            if let Err(error) = stage.run(ctx, request).await {
                return Err(StageFailure {
                    stage: stage.name(),
                    error,
                });
            }
        }

        self.descriptor
            .operation()
            .invoke(ctx, request, service)
            .await
            .map_err(|error| StageFailure {
                stage: INVOKE_STAGE,
                error,
            })
    }

    fn envelope(&self, data: Value) -> PipelineResult<Response> {
        let envelope = Envelope::new(data, self.descriptor.success_message());
        Response::json(self.descriptor.success_status(), &envelope)
            .map_err(|e| PipelineError::unexpected_with_source("failed to encode envelope", e))
    }
}

enum Resolution<'a> {
    Matched(&'a RoutePipeline, PathParams),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// A response together with the traversal outcome.
#[derive(Debug)]
pub struct Dispatch {
    /// The response to send.
    pub response: Response,
    /// The outcome, or `None` when no route matched.
    pub outcome: Option<Outcome>,
}

/// All compiled routes plus their shared collaborators.
///
/// # Example
///
/// ```ignore
/// let table = RouteTable::builder()
///     .verifier(verifier)
///     .service(service)
///     .route(RouteDescriptor::new(Operation::ListMovies, Method::GET, "/api/movies")
///         .require_scopes(["read:movies"]))
///     .build()?;
///
/// let response = table.handle(request).await;
/// ```
pub struct RouteTable {
    routes: Vec<RoutePipeline>,
    service: Arc<dyn MovieService>,
    errors: ErrorHandler,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl RouteTable {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// The compiled routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[RoutePipeline] {
        &self.routes
    }

    /// Routes reachable without authentication.
    pub fn unguarded_routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes
            .iter()
            .map(RoutePipeline::descriptor)
            .filter(|d| !d.is_guarded())
    }

    /// Handles one request.
    pub async fn handle(&self, request: Request) -> Response {
        self.dispatch(request).await.response
    }

    /// Handles one request and reports the outcome.
    pub async fn dispatch(&self, request: Request) -> Dispatch {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(RequestId::parse)
            .unwrap_or_default();

        let mut dispatch = match self.resolve(request.method(), request.uri().path()) {
            Resolution::Matched(route, params) => {
                let span = tracing::info_span!(
                    "request",
                    request_id = %request_id,
                    operation = route.descriptor().operation().name(),
                    http.method = %request.method(),
                    http.path = %request.uri().path(),
                );
                self.run_route(route, params, request_id, &request)
                    .instrument(span)
                    .await
            }
            Resolution::MethodNotAllowed(allowed) => Dispatch {
                response: self
                    .errors
                    .method_not_allowed(request_id, request.method(), &allowed),
                outcome: None,
            },
            Resolution::NotFound => Dispatch {
                response: self.errors.route_not_found(request_id, request.uri().path()),
                outcome: None,
            },
        };

        if request.method() == Method::HEAD {
            *dispatch.response.body_mut() = Full::new(Bytes::new());
        }
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            dispatch.response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        dispatch
    }

    fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let mut allowed = Vec::new();
        for route in &self.routes {
            if let Some(params) = route.pattern.matches(path) {
                let route_method = route.descriptor.method();
                // HEAD is served by the GET route with the body dropped.
                if route_method == method || (method == Method::HEAD && route_method == Method::GET) {
                    return Resolution::Matched(route, params);
                }
                allowed.push(route_method.clone());
                if route_method == Method::GET {
                    allowed.push(Method::HEAD);
                }
            }
        }
        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed(allowed)
        }
    }

    async fn run_route(
        &self,
        route: &RoutePipeline,
        params: PathParams,
        request_id: RequestId,
        request: &Request,
    ) -> Dispatch {
        let operation = route.descriptor().operation();
        let mut ctx = PipelineContext::new(request_id, operation, params);

        let result = match route.traverse(&mut ctx, request, self.service.as_ref()).await {
            Ok(data) => route.envelope(data).map_err(|error| StageFailure {
                stage: INVOKE_STAGE,
                error,
            }),
            Err(failure) => Err(failure),
        };

        let response = match result {
            Ok(mut response) => {
                if let Some(value) = ctx.cache_control().cloned() {
                    response.headers_mut().insert(CACHE_CONTROL, value);
                }
                ctx.set_outcome(Outcome::Succeeded {
                    status: response.status(),
                });
                tracing::info!(
                    http.status_code = response.status().as_u16(),
                    subject = ctx.identity().map(|i| i.subject()),
                    "request succeeded"
                );
                response
            }
            Err(StageFailure { stage, error }) => {
                let kind = error.kind();
                ctx.set_outcome(Outcome::Failed { stage, kind });
                record_stage_failure(stage, kind.as_str());
                self.errors.handle(&error, request_id, stage)
            }
        };

        record_request(operation.name(), response.status().as_u16(), ctx.elapsed());
        Dispatch {
            response,
            outcome: ctx.outcome().copied(),
        }
    }
}

/// Builder for [`RouteTable`].
#[derive(Default)]
pub struct RouteTableBuilder {
    routes: Vec<RouteDescriptor>,
    verifier: Option<Arc<dyn CredentialVerifier>>,
    service: Option<Arc<dyn MovieService>>,
}

impl RouteTableBuilder {
    /// Sets the credential verifier used by every guarded route.
    #[must_use]
    pub fn verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Sets the business service.
    #[must_use]
    pub fn service(mut self, service: Arc<dyn MovieService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Registers a route.
    #[must_use]
    pub fn route(mut self, descriptor: RouteDescriptor) -> Self {
        self.routes.push(descriptor);
        self
    }

    /// Registers several routes.
    #[must_use]
    pub fn routes(mut self, descriptors: impl IntoIterator<Item = RouteDescriptor>) -> Self {
        self.routes.extend(descriptors);
        self
    }

    /// Compiles every route.
    ///
    /// # Errors
    ///
    /// Returns the first [`RouteError`].
    pub fn build(self) -> Result<RouteTable, RouteError> {
        let service = self.service.ok_or(RouteError::MissingService)?;
        let mut routes: Vec<RoutePipeline> = Vec::with_capacity(self.routes.len());

        for descriptor in self.routes {
            let duplicate = routes.iter().any(|r| {
                r.descriptor.method() == descriptor.method()
                    && r.descriptor.path() == descriptor.path()
            });
            if duplicate {
                return Err(RouteError::DuplicateRoute {
                    method: descriptor.method().clone(),
                    path: descriptor.path().to_string(),
                });
            }
            routes.push(RoutePipeline::build(descriptor, self.verifier.as_ref())?);
        }

        Ok(RouteTable {
            routes,
            service,
            errors: ErrorHandler::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use marquee_core::fixtures::{SpyMovieService, StubVerifier};
    use marquee_core::Location;

    use crate::route::Operation;
    use crate::schema::Schema;
    use crate::stages::CachePolicy;

    fn verifier() -> Arc<dyn CredentialVerifier> {
        Arc::new(StubVerifier::new())
    }

    #[test]
    fn test_guarded_route_stage_order() {
        let descriptor = RouteDescriptor::new(Operation::UpdateMovie, Method::PUT, "/m/{movieId}")
            .require_scopes(["update:movies"])
            .validate(Location::Path, Arc::new(Schema::any()))
            .validate(Location::Body, Arc::new(Schema::any()));
        let route = RoutePipeline::build(descriptor, Some(&verifier())).unwrap();
        assert_eq!(
            route.stage_names(),
            vec!["authenticate", "authorize", "validate_path", "validate_body", "invoke"]
        );
    }

    #[test]
    fn test_cached_read_route_stage_order() {
        let descriptor = RouteDescriptor::new(Operation::ListMovies, Method::GET, "/m")
            .require_scopes(["read:movies"])
            .cache(CachePolicy::FIVE_MINUTES)
            .validate(Location::Query, Arc::new(Schema::any()));
        let route = RoutePipeline::build(descriptor, Some(&verifier())).unwrap();
        assert_eq!(
            route.stage_names(),
            vec!["authenticate", "authorize", "cache_annotate", "validate_query", "invoke"]
        );
    }

    #[test]
    fn test_unguarded_route_has_no_auth_stages() {
        let descriptor =
            RouteDescriptor::new(Operation::ReplaceMovie, Method::PATCH, "/m/{movieId}").unguarded();
        let route = RoutePipeline::build(descriptor, None).unwrap();
        assert_eq!(route.stage_names(), vec!["invoke"]);
    }

    #[test]
    fn test_build_errors() {
        let guarded = RouteDescriptor::new(Operation::ListMovies, Method::GET, "/m");
        assert!(matches!(
            RoutePipeline::build(guarded, None),
            Err(RouteError::MissingVerifier(Operation::ListMovies))
        ));

        let contradictory = RouteDescriptor::new(Operation::ReplaceMovie, Method::PATCH, "/m")
            .require_scopes(["update:movies"])
            .unguarded();
        assert!(matches!(
            RoutePipeline::build(contradictory, None),
            Err(RouteError::UnguardedWithScopes(_))
        ));

        let no_service = RouteTable::builder().verifier(verifier()).build();
        assert!(matches!(no_service, Err(RouteError::MissingService)));

        let duplicate = RouteTable::builder()
            .verifier(verifier())
            .service(Arc::new(SpyMovieService::new()))
            .route(RouteDescriptor::new(Operation::ListMovies, Method::GET, "/m"))
            .route(RouteDescriptor::new(Operation::ListMovies, Method::GET, "/m"))
            .build();
        assert!(matches!(duplicate, Err(RouteError::DuplicateRoute { .. })));
    }

    #[tokio::test]
    async fn test_unmatched_requests() {
        let table = RouteTable::builder()
            .verifier(verifier())
            .service(Arc::new(SpyMovieService::new()))
            .route(RouteDescriptor::new(Operation::ListMovies, Method::GET, "/m"))
            .build()
            .unwrap();

        let request = http::Request::builder().uri("/nowhere").body(Bytes::new()).unwrap();
        let dispatch = table.dispatch(request).await;
        assert_eq!(dispatch.response.status(), StatusCode::NOT_FOUND);
        assert!(dispatch.outcome.is_none());
        assert!(dispatch.response.headers().contains_key(REQUEST_ID_HEADER));

        let request = http::Request::builder()
            .method(Method::DELETE)
            .uri("/m")
            .body(Bytes::new())
            .unwrap();
        let response = table.handle(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_client_request_id_is_echoed() {
        let table = RouteTable::builder()
            .service(Arc::new(SpyMovieService::new()))
            .route(RouteDescriptor::new(Operation::ListMovies, Method::GET, "/m").unguarded())
            .build()
            .unwrap();

        let id = RequestId::new();
        let request = http::Request::builder()
            .uri("/m")
            .header(REQUEST_ID_HEADER, id.to_string())
            .body(Bytes::new())
            .unwrap();
        let response = table.handle(request).await;
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            id.to_string().as_str()
        );

        let request = http::Request::builder()
            .uri("/m")
            .header(REQUEST_ID_HEADER, "not-a-uuid")
            .body(Bytes::new())
            .unwrap();
        let response = table.handle(request).await;
        let echoed = response.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert!(RequestId::parse(echoed).is_some());
    }

    #[tokio::test]
    async fn test_head_is_served_by_get_route() {
        let spy = Arc::new(SpyMovieService::new());
        let table = RouteTable::builder()
            .service(spy.clone())
            .route(RouteDescriptor::new(Operation::ListMovies, Method::GET, "/m").unguarded())
            .build()
            .unwrap();

        let request = http::Request::builder()
            .method(Method::HEAD)
            .uri("/m")
            .body(Bytes::new())
            .unwrap();
        let dispatch = table.dispatch(request).await;
        assert_eq!(dispatch.response.status(), StatusCode::OK);
        assert_eq!(
            dispatch.outcome,
            Some(Outcome::Succeeded {
                status: StatusCode::OK
            })
        );
        assert_eq!(spy.call_count(), 1);
        let body = dispatch.response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());

        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/m")
            .body(Bytes::new())
            .unwrap();
        let response = table.handle(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(http::header::ALLOW).unwrap(), "GET, HEAD");
    }
}
