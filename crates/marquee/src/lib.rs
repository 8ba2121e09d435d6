//! # Marquee
//!
//! A movie catalogue served through the Marquee request pipeline.
//!
//! Every route under `/api/movies` runs the same fixed sequence:
//!
//! ```text
//! Authenticate → Authorize → CacheAnnotate → Validate(path) → Validate(body) → MovieService
//! ```
//!
//! This crate supplies the domain half of that sequence:
//!
//! - [`schemas`] - movie identifier, body, and query schemas
//! - [`routes`] - the six route descriptors
//! - [`store`] - an in-memory [`MovieService`](marquee_core::MovieService)
//! - [`app`] - wiring from [`MarqueeConfig`](marquee_config::MarqueeConfig) to a server
//!
//! # Example
//!
//! ```bash
//! $ marquee --config /etc/marquee/marquee.toml
//! $ MARQUEE__SERVER__HTTP_ADDR=127.0.0.1:9000 marquee --dev
//! ```

#![doc(html_root_url = "https://docs.rs/marquee/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod routes;
pub mod schemas;
pub mod store;

pub use app::{build_route_table, build_server, build_verifier, server_settings, BootstrapError};
pub use routes::movie_routes;
pub use schemas::MovieSchemas;
pub use store::InMemoryMovieService;

/// Marquee version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
