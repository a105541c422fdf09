//! Integration tests for instance lifecycle operations.
//!
//! These tests are implemented in:
//! `crates/dockvisor-driver/tests/driver_tests.rs`
//!
//! Covered scenarios:
//! - `caller_fields_override_defaults`: Create options always win over daemon defaults
//! - `find_by_name_tracks_create_and_destroy`: Name resolution across create/destroy
//! - `destroy_without_container_is_noop`: Lifecycle calls on unknown names succeed quietly
//! - `power_off_twice_stays_stopped`: Repeated power-off keeps the container stopped
//! - `spawn_pulls_and_retries_once`: Unknown image is pulled and create retried
//! - `spawn_fails_when_create_fails_after_pull`: Retry exhaustion is a deploy failure
//! - `web1_lifecycle`: List, info, console and destroy of one instance
//! - `spawn_splices_network`: Privileged command sequence of a network splice
