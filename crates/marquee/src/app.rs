//! Wiring from configuration to a runnable server.

use std::sync::Arc;
use std::time::Duration;

use marquee_auth::{JwtVerifier, KeyError, StaticTokenVerifier};
use marquee_config::{AuthConfig, AuthMode, MarqueeConfig, ServerConfig};
use marquee_core::{CredentialVerifier, MovieService};
use marquee_middleware::{RouteError, RouteTable, SchemaError};
use marquee_server::{Server, ServerSettings};
use thiserror::Error;
use tracing::{info, warn};

use crate::routes::movie_routes;
use crate::schemas::MovieSchemas;

/// Errors raised while assembling the application.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// JWT mode was selected without a public key.
    #[error("auth.jwt.public_key is required in jwt mode")]
    MissingPublicKey,

    /// The public key did not decode.
    #[error("invalid JWT public key: {0}")]
    Key(#[from] KeyError),

    /// A movie schema failed to compile.
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),

    /// The route table rejected a descriptor.
    #[error("invalid route table: {0}")]
    Route(#[from] RouteError),
}

/// Builds the credential verifier selected by `auth.mode`.
///
/// # Errors
///
/// Returns an error if JWT mode lacks a usable public key.
pub fn build_verifier(auth: &AuthConfig) -> Result<Arc<dyn CredentialVerifier>, BootstrapError> {
    match auth.mode {
        AuthMode::Jwt => {
            let key = auth
                .jwt
                .public_key
                .as_deref()
                .ok_or(BootstrapError::MissingPublicKey)?;
            let mut verifier = JwtVerifier::from_hex(key)?.with_leeway(auth.jwt.leeway_secs);
            if let Some(issuer) = &auth.jwt.issuer {
                verifier = verifier.with_issuer(issuer.clone());
            }
            if let Some(audience) = &auth.jwt.audience {
                verifier = verifier.with_audience(audience.clone());
            }
            Ok(Arc::new(verifier))
        }
        AuthMode::StaticTokens => {
            let verifier = auth
                .static_tokens
                .iter()
                .fold(StaticTokenVerifier::new(), |verifier, entry| {
                    verifier.with_token(&entry.token, &entry.subject, &entry.scopes)
                });
            Ok(Arc::new(verifier))
        }
    }
}

/// Builds the movie route table around `service`.
///
/// Every route reachable without authentication is logged at `warn`.
///
/// # Errors
///
/// Returns an error if the verifier, a schema, or a route cannot be built.
pub fn build_route_table(
    config: &MarqueeConfig,
    service: Arc<dyn MovieService>,
) -> Result<RouteTable, BootstrapError> {
    let schemas = MovieSchemas::compile()?;
    let table = RouteTable::builder()
        .verifier(build_verifier(&config.auth)?)
        .service(service)
        .routes(movie_routes(config, &schemas))
        .build()?;

    for route in table.unguarded_routes() {
        warn!(
            operation = route.operation().name(),
            http.method = %route.method(),
            http.path = route.path(),
            "route is reachable without authentication"
        );
    }
    info!(routes = table.routes().len(), "route table ready");

    Ok(table)
}

/// Converts the `server` section into transport settings.
#[must_use]
pub fn server_settings(server: &ServerConfig) -> ServerSettings {
    ServerSettings {
        http_addr: server.http_addr.clone(),
        shutdown_timeout: Duration::from_secs(server.shutdown_timeout_secs),
        request_timeout: Duration::from_millis(server.request_timeout_ms),
        max_body_bytes: server.max_body_bytes,
    }
}

/// Builds the HTTP server for `config` around `service`.
///
/// # Errors
///
/// See [`build_route_table`].
pub fn build_server(
    config: &MarqueeConfig,
    service: Arc<dyn MovieService>,
) -> Result<Server, BootstrapError> {
    let table = build_route_table(config, service)?;
    Ok(Server::new(server_settings(&config.server), Arc::new(table)))
}
