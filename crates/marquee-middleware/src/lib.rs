//! # Marquee Middleware
//!
//! The request pipeline: declarative route descriptors compiled into fixed
//! stage sequences, run around a single business operation per route.
//!
//! ```text
//! Request → Authenticate → Authorize → CacheAnnotate → Validate(path) → Validate(body) → Invoke → Envelope
//!              │              │                            │                 │            │
//!              └──────────────┴────────────── Err ─────────┴─────────────────┴────────────┴──→ ErrorHandler
//! ```
//!
//! - [`stage::Stage`] - One step; returns `Ok(())` or a classified error
//! - [`stages`] - The four built-in stages
//! - [`schema::Schema`] - Declarative input schemas
//! - [`route::RouteDescriptor`] - Static per-endpoint metadata
//! - [`pipeline::RouteTable`] - Compiled routes plus collaborators
//! - [`error_handler::ErrorHandler`] - The single error-to-response mapping

#![doc(html_root_url = "https://docs.rs/marquee-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod error_handler;
pub mod inputs;
mod invoke;
pub mod pipeline;
pub mod route;
pub mod schema;
pub mod stage;
pub mod stages;
pub mod types;

pub use context::PipelineContext;
pub use error_handler::{error_response, ErrorHandler, INTERNAL_ERROR_MESSAGE};
pub use pipeline::{Dispatch, Outcome, RoutePipeline, RouteTable, RouteTableBuilder, REQUEST_ID_HEADER};
pub use route::{Operation, PathParams, RouteDescriptor, RouteError, MOVIE_ID_PARAM};
pub use schema::{FieldSchema, FieldType, Format, Schema, SchemaError};
pub use stage::{BoxedStage, Stage};
pub use stages::CachePolicy;
pub use types::{Request, Response, ResponseExt};
