//! # Marquee Core
//!
//! Core types and collaborator contracts for the Marquee request pipeline.
//!
//! This crate provides the types shared by every pipeline stage:
//!
//! - [`Identity`] / [`ScopeSet`] - The authenticated caller and its granted scopes
//! - [`RequestId`] - UUID v7 request identifier
//! - [`Envelope`] - The uniform `{data, message}` success body
//! - [`PipelineError`] - The unified error taxonomy every stage reports into
//! - [`CredentialVerifier`] - Contract for the external token verifier
//! - [`MovieService`] - Contract for the external business collaborator
//!
//! Test doubles for both collaborators live in [`fixtures`].

#![doc(html_root_url = "https://docs.rs/marquee-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod envelope;
mod error;
pub mod fixtures;
mod identity;
pub mod movie;
mod request_id;
mod verifier;

use std::future::Future;
use std::pin::Pin;

pub use envelope::Envelope;
pub use error::{
    AuthError, AuthzError, CredentialRejection, DomainError, ErrorKind, FieldError, Location,
    PipelineError, PipelineResult, ValidationError,
};
pub use identity::{Identity, ScopeSet};
pub use movie::{Movie, MovieFields, MovieFilter, MovieId, MovieService, ServiceError, ServiceResult};
pub use request_id::RequestId;
pub use verifier::{CredentialVerifier, VerificationError, VerifiedCredential};

/// A boxed, sendable future.
///
/// Collaborator traits return this so they stay object-safe behind `Arc<dyn _>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
