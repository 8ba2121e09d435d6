//! The stage abstraction.
//!
//! A stage inspects the request, may enrich the [`PipelineContext`], and
//! either passes (`Ok(())`) or fails with a classified [`PipelineError`]. The
//! composer inspects the result and stops at the first failure; stages never
//! call each other.
//!
//! # Example
//!
//! ```
//! use marquee_core::{BoxFuture, PipelineError};
//! use marquee_middleware::context::PipelineContext;
//! use marquee_middleware::stage::Stage;
//! use marquee_middleware::types::Request;
//!
//! struct RejectEverything;
//!
//! impl Stage for RejectEverything {
//!     fn name(&self) -> &'static str {
//!         "reject"
//!     }
//!
//!     fn run<'a>(
//!         &'a self,
//!         _ctx: &'a mut PipelineContext,
//!         _request: &'a Request,
//!     ) -> BoxFuture<'a, Result<(), PipelineError>> {
//!         Box::pin(async { Err(PipelineError::unexpected("rejected")) })
//!     }
//! }
//! ```

use std::sync::Arc;

use marquee_core::{BoxFuture, PipelineResult};

use crate::context::PipelineContext;
use crate::types::Request;

/// One step of a route pipeline.
pub trait Stage: Send + Sync + 'static {
    /// Stable stage name used in logs, metrics and [`Outcome`](crate::Outcome).
    fn name(&self) -> &'static str;

    /// Runs the stage.
    fn run<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: &'a Request,
    ) -> BoxFuture<'a, PipelineResult<()>>;
}

/// A shared, type-erased stage.
pub type BoxedStage = Arc<dyn Stage>;
