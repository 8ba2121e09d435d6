//! Pipeline stages.
//!
//! Stages run in a fixed order for every guarded route:
//!
//! 1. [`authentication`] - Verify the bearer credential
//! 2. [`authorization`] - Require every declared scope
//! 3. [`cache`] - Record the cache directive (read routes only)
//! 4. [`validation`] - Validate path, then query, then body
//!
//! The business operation runs after the last stage passes.

pub mod authentication;
pub mod authorization;
pub mod cache;
pub mod validation;

pub use authentication::AuthenticateStage;
pub use authorization::AuthorizeStage;
pub use cache::{CacheAnnotateStage, CachePolicy};
pub use validation::ValidateStage;
