//! Per-request pipeline state.
//!
//! A [`PipelineContext`] is created for each request once its route is
//! matched and is confined to that request's traversal. Stages enrich it in
//! order: authentication sets the identity, validators record their
//! validated inputs, and the cache annotator records a pending directive.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use http::HeaderValue;
use marquee_core::{Identity, Location, RequestId};
use serde_json::Value;

use crate::pipeline::Outcome;
use crate::route::{Operation, PathParams};

/// State that flows through one route traversal.
///
/// # Example
///
/// ```
/// use marquee_core::{Identity, RequestId};
/// use marquee_middleware::context::PipelineContext;
/// use marquee_middleware::route::{Operation, PathParams};
///
/// let mut ctx = PipelineContext::new(RequestId::new(), Operation::ListMovies, PathParams::default());
/// assert!(ctx.identity().is_none());
///
/// ctx.set_identity(Identity::new("user-1", ["read:movies"]));
/// assert_eq!(ctx.identity().map(Identity::subject), Some("user-1"));
/// ```
#[derive(Debug)]
pub struct PipelineContext {
    request_id: RequestId,
    operation: Operation,
    path_params: PathParams,
    identity: Option<Identity>,
    inputs: HashMap<Location, Value>,
    cache_control: Option<HeaderValue>,
    outcome: Option<Outcome>,
    started_at: Instant,
}

impl PipelineContext {
    /// Creates a context for a matched route.
    #[must_use]
    pub fn new(request_id: RequestId, operation: Operation, path_params: PathParams) -> Self {
        Self {
            request_id,
            operation,
            path_params,
            identity: None,
            inputs: HashMap::new(),
            cache_control: None,
            outcome: None,
            started_at: Instant::now(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the matched operation.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the raw path parameters captured by the route pattern.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Returns the authenticated identity, if authentication has run.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Sets the authenticated identity.
    ///
    /// Only the authenticate stage calls this.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Returns the validated input for `location`, if a validator ran there.
    #[must_use]
    pub fn input(&self, location: Location) -> Option<&Value> {
        self.inputs.get(&location)
    }

    /// Records the validated input for `location`.
    pub fn set_input(&mut self, location: Location, value: Value) {
        self.inputs.insert(location, value);
    }

    /// Returns the pending `Cache-Control` value.
    #[must_use]
    pub fn cache_control(&self) -> Option<&HeaderValue> {
        self.cache_control.as_ref()
    }

    /// Records a `Cache-Control` value to apply to the success response.
    pub fn set_cache_control(&mut self, value: HeaderValue) {
        self.cache_control = Some(value);
    }

    /// Returns the terminal outcome once the traversal has finished.
    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Records the terminal outcome. A traversal has exactly one.
    pub(crate) fn set_outcome(&mut self, outcome: Outcome) {
        debug_assert!(self.outcome.is_none(), "outcome recorded twice");
        self.outcome = Some(outcome);
    }

    /// Returns the time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> PipelineContext {
        PipelineContext::new(RequestId::new(), Operation::RetrieveMovie, PathParams::default())
    }

    #[test]
    fn test_inputs_are_per_location() {
        let mut ctx = ctx();
        ctx.set_input(Location::Path, json!({"movieId": "abc"}));
        assert_eq!(ctx.input(Location::Path), Some(&json!({"movieId": "abc"})));
        assert!(ctx.input(Location::Body).is_none());
    }

    #[test]
    fn test_cache_control_starts_empty() {
        let mut ctx = ctx();
        assert!(ctx.cache_control().is_none());
        ctx.set_cache_control(HeaderValue::from_static("public, max-age=60"));
        assert_eq!(ctx.cache_control().unwrap(), "public, max-age=60");
    }
}
