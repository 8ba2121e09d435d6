//! # Marquee Server
//!
//! The HTTP transport in front of a [`RouteTable`](marquee_middleware::RouteTable).
//!
//! [`Server`] accepts HTTP/1.1 connections, buffers request bodies up to a
//! configured limit, applies a request deadline, answers `GET /health`, and
//! hands everything else to the route table. Shutdown is cooperative: the
//! accept loop stops on [`ShutdownSignal`] and open connections are given
//! time to finish.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use marquee_server::{Server, ServerSettings};
//!
//! let server = Server::new(ServerSettings::default(), Arc::new(table));
//! server.run().await?;
//! ```

#![doc(html_root_url = "https://docs.rs/marquee-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod server;
mod shutdown;

pub use error::ServerError;
pub use server::{Server, ServerSettings, HEALTH_PATH};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
