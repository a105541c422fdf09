//! # dockvisor-host
//!
//! Host-side primitives the driver needs beyond the daemon's API.
//!
//! - **Probe**: memory counters from `/proc/meminfo` and filesystem
//!   capacity of the daemon's data directory.
//! - **Cgroup**: locating a container's init pid through the `devices`
//!   controller.
//! - **Network**: splicing a container's network namespace onto a host
//!   bridge with a veth pair.
//! - **Command**: running the privileged OS tools the splice relies on.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod command;
pub mod network;
pub mod probe;
