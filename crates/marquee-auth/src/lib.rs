//! # Marquee Auth
//!
//! Concrete [`CredentialVerifier`](marquee_core::CredentialVerifier)
//! implementations for the Marquee pipeline.
//!
//! - [`JwtVerifier`] checks compact JWTs signed with Ed25519 (`alg: EdDSA`)
//!   and maps `sub` and `scopes` onto a verified credential.
//! - [`StaticTokenVerifier`] answers from a fixed table of opaque tokens,
//!   for local development and tests.
//!
//! Verifiers are constructed once at startup and injected into the route
//! table; nothing here is process-global.
//!
//! ## Example
//!
//! ```
//! use marquee_auth::StaticTokenVerifier;
//!
//! let verifier = StaticTokenVerifier::new()
//!     .with_token("dev-token", "alice", ["read:movies"]);
//! assert_eq!(verifier.len(), 1);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod jwt;
mod static_tokens;

pub use error::KeyError;
pub use jwt::{JwtVerifier, DEFAULT_LEEWAY_SECS};
pub use static_tokens::StaticTokenVerifier;
