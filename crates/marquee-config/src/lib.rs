//! Typed configuration for Marquee.
//!
//! - TOML and JSON configuration files
//! - `.env` files and `MARQUEE__SECTION__KEY` environment overrides
//! - Strict validation (fails on unknown fields)
//! - Layered loading (defaults → file → `.env` → env)
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! max_body_bytes = 1048576
//!
//! [telemetry]
//! service_name = "marquee"
//! environment = "production"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! [auth]
//! mode = "jwt"
//!
//! [auth.jwt]
//! public_key = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
//! issuer = "https://auth.example.com"
//! leeway_secs = 30
//!
//! [cache]
//! enabled = true
//! list_max_age_secs = 300
//! item_max_age_secs = 3600
//!
//! [routes]
//! guard_replace = false
//! ```
//!
//! Static tokens are configured as an array of tables:
//!
//! ```toml
//! [auth]
//! mode = "static_tokens"
//!
//! [[auth.static_tokens]]
//! token = "dev-token"
//! subject = "developer"
//! scopes = ["read:movies"]
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{MarqueeConfig, DEV_TOKEN};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
