//! # dockvisor-client
//!
//! Typed access to a container daemon's HTTP API.
//!
//! - **Transport**: one HTTP exchange per call over loopback TCP or a
//!   local domain socket.
//! - **Response**: status, raw body, and a lazily decoded JSON value whose
//!   mapping keys are all lower case.
//! - **[`DaemonClient`]**: the operation set the driver depends on, with one
//!   HTTP implementation per daemon API version and an in-memory
//!   [`FakeClient`] for tests.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod api;
pub mod client;
pub mod fake;
pub mod models;
pub mod response;
pub mod transport;

use dockvisor_common::config::DriverConfig;
use dockvisor_common::error::Result;
use dockvisor_common::types::ApiVersion;

pub use api::{ApiV13, ApiV14, HttpClient};
pub use client::DaemonClient;
pub use fake::FakeClient;
pub use models::{ContainerConfig, ContainerInspect, CreateOptions};
pub use response::{Response, normalize};

/// Builds the HTTP client matching the configured endpoint and API version.
///
/// No connection is opened here; the first call dials the daemon.
///
/// # Errors
///
/// Returns an error if the endpoint cannot be parsed or the transport
/// cannot be constructed.
pub fn connect(config: &DriverConfig) -> Result<Box<dyn DaemonClient>> {
    let transport = transport::connect(&config.endpoint)?;
    tracing::debug!(
        endpoint = %config.endpoint,
        version = %config.api_version,
        "daemon client configured"
    );
    Ok(match config.api_version {
        ApiVersion::V1_3 => Box::new(HttpClient::<ApiV13>::new(transport)),
        ApiVersion::V1_4 => Box::new(HttpClient::<ApiV14>::new(transport)),
    })
}
