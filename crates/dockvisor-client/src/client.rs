//! The daemon operation set.

use std::sync::Arc;

use dockvisor_common::constants;
use dockvisor_common::error::Result;
use dockvisor_common::types::ContainerId;

use crate::models::{ContainerInspect, ContainerSummary, CreateOptions, ImageInspect};

/// Container and image operations offered by the daemon.
///
/// Implemented once per daemon API version over HTTP, and by the in-memory
/// [`crate::FakeClient`]. Callers hold a `Box<dyn DaemonClient>` and never
/// look at which one they have.
///
/// `Err` is reserved for transport failures. An unexpected status code
/// surfaces as `None`, an empty list, or `false`, and the caller decides
/// what to do next; nothing here retries.
pub trait DaemonClient: Send + Sync {
    /// Lists containers; `all` includes stopped ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>>;

    /// Creates a container from `options` merged over the daemon defaults.
    ///
    /// Returns `None` when the daemon refuses, typically because the image
    /// is not present locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    fn create_container(&self, options: &CreateOptions) -> Result<Option<ContainerId>>;

    /// Starts a created or stopped container.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    fn start_container(&self, id: &ContainerId) -> Result<bool>;

    /// Inspects a container; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    fn inspect_container(&self, id: &ContainerId) -> Result<Option<ContainerInspect>>;

    /// Inspects an image; `None` if it is not present.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    fn inspect_image(&self, name: &str) -> Result<Option<ImageInspect>>;

    /// Stops a container, giving it `timeout_secs` (default 5) to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    fn stop_container(&self, id: &ContainerId, timeout_secs: Option<u32>) -> Result<bool>;

    /// Removes a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    fn destroy_container(&self, id: &ContainerId) -> Result<bool>;

    /// Pulls an image, waiting for the daemon to finish the download.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    fn pull_repository(&self, image: &str) -> Result<bool>;

    /// Returns the container's accumulated stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    fn container_logs(&self, id: &ContainerId) -> Result<Option<String>>;

    /// Checks that the daemon answers.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the daemon is not running.
    fn ping(&self) -> Result<()> {
        let _containers = self.list_containers(true)?;
        Ok(())
    }

    /// Finds the host port published by the local image registry container.
    ///
    /// Scans running containers and inspects each; the first whose process
    /// path mentions the registry wins. Linear, which is fine at the
    /// container counts a single host runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    fn registry_port(&self) -> Result<Option<u16>> {
        for summary in self.list_containers(false)? {
            let Some(info) = self.inspect_container(&summary.container_id())? else {
                continue;
            };
            if !info.path.contains(constants::REGISTRY_PROCESS) {
                continue;
            }
            return Ok(info
                .network_settings
                .host_port(constants::REGISTRY_CONTAINER_PORT));
        }
        Ok(None)
    }
}

impl<T: DaemonClient + ?Sized> DaemonClient for Arc<T> {
    fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        (**self).list_containers(all)
    }

    fn create_container(&self, options: &CreateOptions) -> Result<Option<ContainerId>> {
        (**self).create_container(options)
    }

    fn start_container(&self, id: &ContainerId) -> Result<bool> {
        (**self).start_container(id)
    }

    fn inspect_container(&self, id: &ContainerId) -> Result<Option<ContainerInspect>> {
        (**self).inspect_container(id)
    }

    fn inspect_image(&self, name: &str) -> Result<Option<ImageInspect>> {
        (**self).inspect_image(name)
    }

    fn stop_container(&self, id: &ContainerId, timeout_secs: Option<u32>) -> Result<bool> {
        (**self).stop_container(id, timeout_secs)
    }

    fn destroy_container(&self, id: &ContainerId) -> Result<bool> {
        (**self).destroy_container(id)
    }

    fn pull_repository(&self, image: &str) -> Result<bool> {
        (**self).pull_repository(image)
    }

    fn container_logs(&self, id: &ContainerId) -> Result<Option<String>> {
        (**self).container_logs(id)
    }

    fn ping(&self) -> Result<()> {
        (**self).ping()
    }

    fn registry_port(&self) -> Result<Option<u16>> {
        (**self).registry_port()
    }
}
