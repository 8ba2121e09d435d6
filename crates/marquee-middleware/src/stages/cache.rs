//! Cache-control annotation.
//!
//! Records a `Cache-Control: public, max-age=N` directive on the context. The
//! composer copies it onto the response only when the request succeeds.

use std::future;
use std::time::Duration;

use http::HeaderValue;
use marquee_core::{BoxFuture, PipelineResult};

use crate::context::PipelineContext;
use crate::stage::Stage;
use crate::types::Request;

/// How long a read response may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    max_age: Duration,
}

impl CachePolicy {
    /// Five minutes, for collection reads.
    pub const FIVE_MINUTES: Self = Self::from_secs(300);

    /// Sixty minutes, for single-item reads.
    pub const SIXTY_MINUTES: Self = Self::from_secs(3600);

    /// A policy of `secs` seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            max_age: Duration::from_secs(secs),
        }
    }

    /// Returns the max age.
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Renders the `Cache-Control` header value.
    #[must_use]
    pub fn header_value(&self) -> HeaderValue {
        let value = format!("public, max-age={}", self.max_age.as_secs());
        HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
    }
}

/// Records `policy` as the pending cache directive.
pub fn annotate(ctx: &mut PipelineContext, policy: CachePolicy) {
    ctx.set_cache_control(policy.header_value());
}

/// Annotates read routes with their cache policy.
#[derive(Debug, Clone, Copy)]
pub struct CacheAnnotateStage {
    policy: CachePolicy,
}

impl CacheAnnotateStage {
    /// Creates the stage.
    #[must_use]
    pub const fn new(policy: CachePolicy) -> Self {
        Self { policy }
    }
}

impl Stage for CacheAnnotateStage {
    fn name(&self) -> &'static str {
        "cache_annotate"
    }

    fn run<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        _request: &'a Request,
    ) -> BoxFuture<'a, PipelineResult<()>> {
        annotate(ctx, self.policy);
        Box::pin(future::ready(Ok(())))
    }
}
