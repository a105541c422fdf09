//! # dockvisor-driver
//!
//! Realizes host-framework instances as daemon containers.
//!
//! The [`Driver`] resolves instance names to container ids on every call,
//! drives the daemon through a [`dockvisor_client::DaemonClient`], splices
//! container networking onto host bridges, and reports host capacity.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod capacity;
pub mod driver;
pub mod instance;

pub use capacity::{AvailableResource, HostStats};
pub use driver::Driver;
pub use instance::{Instance, InstanceInfo, NetworkInfo};
