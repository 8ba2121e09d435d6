//! Schema validation for path, query and body inputs.
//!
//! A route may attach several validators; they run in declaration order and
//! the first failure stops the traversal. Each validator stores its
//! normalized input on the context for the business invoker.
//!
//! ```text
//! Request → Authenticate → Authorize → CacheAnnotate → [Validate]* → Invoke
//! ```

use std::future;
use std::sync::Arc;

use marquee_core::{BoxFuture, Location, PipelineResult, ValidationError};
use serde_json::Value;

use crate::context::PipelineContext;
use crate::inputs::raw_input;
use crate::schema::Schema;
use crate::stage::Stage;
use crate::types::Request;

/// Validates `input` against `schema`.
///
/// # Errors
///
/// Returns the field-level [`ValidationError`].
pub fn validate(input: &Value, schema: &Schema, location: Location) -> Result<Value, ValidationError> {
    schema.validate(location, input)
}

/// Validates one request location against a schema.
#[derive(Debug, Clone)]
pub struct ValidateStage {
    location: Location,
    schema: Arc<Schema>,
}

impl ValidateStage {
    /// Creates a validator for `location`.
    #[must_use]
    pub fn new(location: Location, schema: Arc<Schema>) -> Self {
        Self { location, schema }
    }

    /// Returns the validated location.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    fn check(&self, ctx: &mut PipelineContext, request: &Request) -> PipelineResult<()> {
        let input = raw_input(self.location, ctx.path_params(), request)?;
        let valid = validate(&input, &self.schema, self.location)?;
        ctx.set_input(self.location, valid);
        Ok(())
    }
}

impl Stage for ValidateStage {
    fn name(&self) -> &'static str {
        match self.location {
            Location::Path => "validate_path",
            Location::Query => "validate_query",
            Location::Body => "validate_body",
        }
    }

    fn run<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: &'a Request,
    ) -> BoxFuture<'a, PipelineResult<()>> {
        Box::pin(future::ready(self.check(ctx, request)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use marquee_core::{ErrorKind, RequestId};
    use serde_json::json;

    use crate::route::{Operation, PathParams};
    use crate::schema::FieldSchema;

    fn id_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .required("movieId", FieldSchema::string().pattern("[0-9a-fA-F]{24}"))
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_path_validation_stores_input() {
        let params: PathParams = [("movieId", "5d9f1140fc13ae1f8d000001")].into_iter().collect();
        let mut ctx = PipelineContext::new(RequestId::new(), Operation::RetrieveMovie, params);
        let stage = ValidateStage::new(Location::Path, id_schema());
        let request = http::Request::new(Bytes::new());

        stage.run(&mut ctx, &request).await.unwrap();
        assert_eq!(stage.name(), "validate_path");
        assert_eq!(
            ctx.input(Location::Path),
            Some(&json!({"movieId": "5d9f1140fc13ae1f8d000001"}))
        );
    }

    #[tokio::test]
    async fn test_bad_path_id_fails() {
        let params: PathParams = [("movieId", "nope")].into_iter().collect();
        let mut ctx = PipelineContext::new(RequestId::new(), Operation::DeleteMovie, params);
        let stage = ValidateStage::new(Location::Path, id_schema());
        let request = http::Request::new(Bytes::new());

        let err = stage.run(&mut ctx, &request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(ctx.input(Location::Path).is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_body_fails() {
        let mut ctx =
            PipelineContext::new(RequestId::new(), Operation::CreateMovie, PathParams::default());
        let stage = ValidateStage::new(Location::Body, Arc::new(Schema::any()));
        let request = http::Request::new(Bytes::from_static(b"{"));

        let err = stage.run(&mut ctx, &request).await.unwrap_err();
        assert_eq!(err.field_errors().unwrap()[0].code, "INVALID_JSON");
    }
}
