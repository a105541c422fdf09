//! The instance lifecycle orchestrator.

use std::fmt;

use dockvisor_client::models::{ContainerInspect, CreateOptions, ImageInspect};
use dockvisor_client::{DaemonClient, FakeClient};
use dockvisor_common::config::DriverConfig;
use dockvisor_common::error::{DockvisorError, Result};
use dockvisor_common::types::{ContainerId, PowerState};
use dockvisor_host::command::HostRunner;
use dockvisor_host::network::NetworkSplicer;
use dockvisor_host::probe::{self, HostProbe};

use crate::capacity::{AvailableResource, HostStats};
use crate::instance::{Instance, InstanceInfo, NetworkInfo};

/// Maps host-framework instances onto daemon containers.
///
/// Holds no per-instance state: every operation resolves the instance
/// name against the daemon's live container list, so containers created
/// or removed out of band are always seen.
pub struct Driver {
    client: Box<dyn DaemonClient>,
    splicer: Option<NetworkSplicer>,
    probe: HostProbe,
    config: DriverConfig,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("splicer", &self.splicer)
            .field("probe", &self.probe)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Driver {
    /// Creates a driver talking to the daemon named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the endpoint
    /// cannot be parsed. The daemon is not contacted.
    pub fn new(config: DriverConfig) -> Result<Self> {
        config.validate()?;
        let client = dockvisor_client::connect(&config)?;
        let runner = HostRunner::new(config.root_helper.clone());
        let splicer = NetworkSplicer::from_config(&config, Box::new(runner));
        Ok(Self::with_parts(client, Some(splicer), config))
    }

    /// Creates a driver over the in-memory daemon double, with no
    /// network splicing.
    #[must_use]
    pub fn fake(config: DriverConfig) -> Self {
        Self::with_parts(Box::new(FakeClient::new()), None, config)
    }

    /// Creates a driver from explicit parts.
    #[must_use]
    pub fn with_parts(
        client: Box<dyn DaemonClient>,
        splicer: Option<NetworkSplicer>,
        config: DriverConfig,
    ) -> Self {
        Self {
            client,
            splicer,
            probe: HostProbe::from_config(&config),
            config,
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Checks that the daemon is running.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the daemon cannot be reached.
    pub fn init_host(&self) -> Result<()> {
        self.client.ping().inspect_err(|e| {
            tracing::error!(endpoint = %self.config.endpoint, error = %e, "daemon is not running");
        })?;
        tracing::info!(endpoint = %self.config.endpoint, "daemon reachable");
        Ok(())
    }

    /// Returns the names of all instances, running or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub fn list_instances(&self) -> Result<Vec<String>> {
        Ok(self
            .list_instances_detailed()?
            .into_iter()
            .map(|info| info.config.hostname)
            .collect())
    }

    /// Returns the inspect record of every container.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub fn list_instances_detailed(&self) -> Result<Vec<ContainerInspect>> {
        let mut out = Vec::new();
        for summary in self.client.list_containers(true)? {
            if let Some(info) = self.client.inspect_container(&summary.container_id())? {
                out.push(info);
            }
        }
        Ok(out)
    }

    /// Finds the container whose hostname is `name`.
    ///
    /// Lists and inspects every container; the first match wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub fn find_container_by_name(&self, name: &str) -> Result<Option<ContainerId>> {
        Ok(self.find_inspected_by_name(name)?.map(|(id, _)| id))
    }

    /// Scans containers like [`Driver::find_container_by_name`] and keeps
    /// the matching inspect record.
    fn find_inspected_by_name(
        &self,
        name: &str,
    ) -> Result<Option<(ContainerId, ContainerInspect)>> {
        for summary in self.client.list_containers(true)? {
            let id = summary.container_id();
            let Some(info) = self.client.inspect_container(&id)? else {
                continue;
            };
            if info.config.hostname == name {
                return Ok(Some((id, info)));
            }
        }
        Ok(None)
    }

    /// Creates and starts a container for `instance`, then splices its
    /// network when `network` is given.
    ///
    /// An unknown image is pulled and creation retried once. A failed
    /// splice leaves the container created and started.
    ///
    /// # Errors
    ///
    /// Returns `DeployFailure` naming the instance if the command or memory
    /// cannot be resolved, the pull fails, creation fails after the pull,
    /// or the splice fails. Transport failures pass through unchanged.
    pub fn spawn(
        &self,
        instance: &Instance,
        image: Option<&str>,
        network: Option<&NetworkInfo>,
    ) -> Result<ContainerId> {
        let name = instance.name.as_str();
        let image = image
            .filter(|i| !i.trim().is_empty())
            .unwrap_or(self.config.default_image.as_str());
        let options = CreateOptions::new()
            .hostname(name)
            .image(image)
            .cmd(instance.resolve_command()?)
            .memory(instance.resolve_memory()?);

        let id = self.create_or_pull(name, image, &options)?;
        tracing::info!(id = %id, instance = %name, image, "container created");

        if self.client.start_container(&id)? {
            tracing::info!(id = %id, instance = %name, "container started");
        } else {
            tracing::warn!(id = %id, instance = %name, "container did not start");
        }

        if let Some(network) = network {
            self.splice(name, &id, network)?;
        }
        Ok(id)
    }

    fn create_or_pull(
        &self,
        name: &str,
        image: &str,
        options: &CreateOptions,
    ) -> Result<ContainerId> {
        if let Some(id) = self.client.create_container(options)? {
            return Ok(id);
        }
        tracing::info!(instance = %name, image, "create failed, pulling image");
        if !self.client.pull_repository(image)? {
            return Err(DockvisorError::deploy_failure(
                name,
                format!("cannot pull image '{image}'"),
            ));
        }
        self.client.create_container(options)?.ok_or_else(|| {
            DockvisorError::deploy_failure(
                name,
                format!("cannot create container from image '{image}'"),
            )
        })
    }

    fn splice(&self, name: &str, id: &ContainerId, network: &NetworkInfo) -> Result<()> {
        let Some(splicer) = &self.splicer else {
            tracing::debug!(id = %id, "network splicing disabled");
            return Ok(());
        };
        let Some(address) = network.ips.first() else {
            tracing::warn!(id = %id, bridge = %network.bridge, "no address assigned, skipping splice");
            return Ok(());
        };
        splicer
            .splice(id, &network.bridge, *address)
            .map(|_| ())
            .map_err(|e| {
                let reason = if e.leftovers.is_empty() {
                    e.to_string()
                } else {
                    format!("{e} (left on host: {})", e.leftovers.join(", "))
                };
                DockvisorError::deploy_failure(name, reason)
            })
    }

    /// Stops and removes the instance's container; absent is success.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub fn destroy(&self, name: &str) -> Result<()> {
        let Some(id) = self.find_container_by_name(name)? else {
            tracing::debug!(instance = %name, "no container to destroy");
            return Ok(());
        };
        if !self.stop(&id)? {
            tracing::warn!(id = %id, instance = %name, "stop before destroy failed");
        }
        if self.client.destroy_container(&id)? {
            tracing::info!(id = %id, instance = %name, "container destroyed");
        } else {
            tracing::warn!(id = %id, instance = %name, "destroy failed");
        }
        Ok(())
    }

    /// Stops then starts the instance's container; absent is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub fn reboot(&self, name: &str) -> Result<()> {
        let Some(id) = self.find_container_by_name(name)? else {
            return Ok(());
        };
        let _stopped = self.stop(&id)?;
        let started = self.client.start_container(&id)?;
        tracing::info!(id = %id, instance = %name, started, "container rebooted");
        Ok(())
    }

    /// Starts the instance's container; absent is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub fn power_on(&self, name: &str) -> Result<()> {
        let Some(id) = self.find_container_by_name(name)? else {
            return Ok(());
        };
        let started = self.client.start_container(&id)?;
        tracing::info!(id = %id, instance = %name, started, "power on");
        Ok(())
    }

    /// Stops the instance's container; absent is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub fn power_off(&self, name: &str) -> Result<()> {
        let Some(id) = self.find_container_by_name(name)? else {
            return Ok(());
        };
        let stopped = self.stop(&id)?;
        tracing::info!(id = %id, instance = %name, stopped, "power off");
        Ok(())
    }

    /// Reports the instance's power state and memory limit.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no container carries the instance name.
    pub fn get_info(&self, name: &str) -> Result<InstanceInfo> {
        let (_, info) = self
            .find_inspected_by_name(name)?
            .ok_or_else(|| DockvisorError::instance_not_found(name))?;
        Ok(InstanceInfo {
            state: PowerState::from_running(info.state.running),
            max_mem: info.config.memory,
            mem: info.config.memory,
            num_cpu: 1,
            cpu_time: 0,
        })
    }

    /// Returns the instance's console log, if it has a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub fn get_console_output(&self, name: &str) -> Result<Option<String>> {
        match self.find_container_by_name(name)? {
            Some(id) => self.client.container_logs(&id),
            None => Ok(None),
        }
    }

    /// Reports schedulable capacity of this host.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory or disk counters cannot be read.
    pub fn get_available_resource(&self, nodename: &str) -> Result<AvailableResource> {
        let memory = self.probe.memory_usage()?;
        let disk = self.probe.disk_usage()?;
        Ok(AvailableResource::from_usage(nodename, &memory, &disk))
    }

    /// Reports current host statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the counters or the host name cannot be read.
    pub fn get_host_stats(&self) -> Result<HostStats> {
        let memory = self.probe.memory_usage()?;
        let disk = self.probe.disk_usage()?;
        Ok(HostStats::from_usage(&probe::hostname()?, &memory, &disk))
    }

    /// Returns the host port of the local image registry, if one runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub fn registry_port(&self) -> Result<Option<u16>> {
        self.client.registry_port()
    }

    /// Looks up image metadata by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub fn inspect_image(&self, name: &str) -> Result<Option<ImageInspect>> {
        self.client.inspect_image(name)
    }

    fn stop(&self, id: &ContainerId) -> Result<bool> {
        self.client.stop_container(id, Some(self.config.stop_timeout_secs))
    }
}
