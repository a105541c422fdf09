//! Typed daemon payloads.
//!
//! Outgoing payloads serialize with the daemon's `PascalCase` keys.
//! Incoming payloads are deserialized from the normalized (all lower-case)
//! form produced by [`crate::response::normalize`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use dockvisor_common::constants;
use dockvisor_common::types::ContainerId;

/// Complete creation payload sent to `POST /containers/create`.
///
/// [`Default`] holds the fixed values the daemon requires; build one from
/// caller input with [`ContainerConfig::with_overrides`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all(serialize = "PascalCase", deserialize = "lowercase"),
    default
)]
pub struct ContainerConfig {
    /// Hostname; carries the instance name.
    pub hostname: String,
    /// User the command runs as.
    pub user: String,
    /// Memory limit in bytes (0 = unlimited).
    pub memory: u64,
    /// Memory plus swap limit in bytes.
    #[serde(rename(deserialize = "memoryswap"))]
    pub memory_swap: i64,
    /// Attach standard input.
    #[serde(rename(deserialize = "attachstdin"))]
    pub attach_stdin: bool,
    /// Attach standard output.
    #[serde(rename(deserialize = "attachstdout"))]
    pub attach_stdout: bool,
    /// Attach standard error.
    #[serde(rename(deserialize = "attachstderr"))]
    pub attach_stderr: bool,
    /// Legacy port specifications.
    #[serde(rename(deserialize = "portspecs"))]
    pub port_specs: Option<Vec<String>>,
    /// Allocate a pseudo-terminal.
    pub tty: bool,
    /// Keep standard input open.
    #[serde(rename(deserialize = "openstdin"))]
    pub open_stdin: bool,
    /// Close standard input after the first client detaches.
    #[serde(rename(deserialize = "stdinonce"))]
    pub stdin_once: bool,
    /// `KEY=value` environment entries.
    pub env: Option<Vec<String>>,
    /// Command vector.
    #[serde(deserialize_with = "null_as_default")]
    pub cmd: Vec<String>,
    /// DNS servers.
    pub dns: Option<Vec<String>>,
    /// Image reference.
    pub image: String,
    /// Volume mount points.
    #[serde(deserialize_with = "null_as_default")]
    pub volumes: BTreeMap<String, Value>,
    /// Container to inherit volumes from.
    #[serde(rename(deserialize = "volumesfrom"), deserialize_with = "null_as_default")]
    pub volumes_from: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            user: String::new(),
            memory: 0,
            memory_swap: 0,
            attach_stdin: false,
            attach_stdout: false,
            attach_stderr: false,
            port_specs: None,
            tty: true,
            open_stdin: true,
            stdin_once: false,
            env: None,
            cmd: Vec::new(),
            dns: None,
            image: constants::DEFAULT_IMAGE.into(),
            volumes: BTreeMap::new(),
            volumes_from: String::new(),
        }
    }
}

impl ContainerConfig {
    /// Merges caller-supplied fields over the daemon defaults.
    ///
    /// Every field set in `overrides` appears unchanged in the result.
    #[must_use]
    pub fn with_overrides(overrides: &CreateOptions) -> Self {
        let defaults = Self::default();
        Self {
            hostname: overrides.hostname.clone().unwrap_or(defaults.hostname),
            user: overrides.user.clone().unwrap_or(defaults.user),
            memory: overrides.memory.unwrap_or(defaults.memory),
            memory_swap: overrides.memory_swap.unwrap_or(defaults.memory_swap),
            tty: overrides.tty.unwrap_or(defaults.tty),
            open_stdin: overrides.open_stdin.unwrap_or(defaults.open_stdin),
            env: overrides.env.clone().or(defaults.env),
            cmd: overrides.cmd.clone().unwrap_or(defaults.cmd),
            dns: overrides.dns.clone().or(defaults.dns),
            image: overrides.image.clone().unwrap_or(defaults.image),
            ..defaults
        }
    }
}

/// Caller-supplied creation fields; anything left `None` takes the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Hostname (the instance name).
    pub hostname: Option<String>,
    /// User the command runs as.
    pub user: Option<String>,
    /// Image reference.
    pub image: Option<String>,
    /// Command vector.
    pub cmd: Option<Vec<String>>,
    /// Environment entries.
    pub env: Option<Vec<String>>,
    /// DNS servers.
    pub dns: Option<Vec<String>>,
    /// Memory limit in bytes.
    pub memory: Option<u64>,
    /// Memory plus swap limit in bytes.
    pub memory_swap: Option<i64>,
    /// Allocate a pseudo-terminal.
    pub tty: Option<bool>,
    /// Keep standard input open.
    pub open_stdin: Option<bool>,
}

impl CreateOptions {
    /// Starts an empty set of overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hostname.
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Sets the image reference.
    #[must_use]
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the command vector.
    #[must_use]
    pub fn cmd(mut self, cmd: Vec<String>) -> Self {
        self.cmd = Some(cmd);
        self
    }

    /// Sets the environment entries.
    #[must_use]
    pub fn env(mut self, env: Vec<String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Sets the memory limit in bytes.
    #[must_use]
    pub const fn memory(mut self, bytes: u64) -> Self {
        self.memory = Some(bytes);
        self
    }

    /// Sets whether a pseudo-terminal is allocated.
    #[must_use]
    pub const fn tty(mut self, tty: bool) -> Self {
        self.tty = Some(tty);
        self
    }
}

/// One row of `GET /containers/ps`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSummary {
    /// Container id.
    pub id: String,
    /// Image the container was created from.
    pub image: String,
    /// Command line summary.
    pub command: String,
    /// Human-readable status (`Up 3 minutes`, `Exit 0`).
    pub status: String,
    /// Creation time, seconds since the epoch.
    pub created: i64,
}

impl ContainerSummary {
    /// Returns the typed container id.
    #[must_use]
    pub fn container_id(&self) -> ContainerId {
        ContainerId::new(self.id.clone())
    }
}

/// Result of `GET /containers/{id}/json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerInspect {
    /// Container id.
    pub id: String,
    /// Path of the container's main process.
    pub path: String,
    /// Arguments of the main process.
    #[serde(deserialize_with = "null_as_default")]
    pub args: Vec<String>,
    /// Creation timestamp.
    pub created: String,
    /// Image id.
    pub image: String,
    /// Configuration the container was created with.
    pub config: ContainerConfig,
    /// Observed runtime state.
    pub state: ContainerStatus,
    /// Network settings assigned by the daemon.
    #[serde(rename = "networksettings")]
    pub network_settings: NetworkSettings,
}

impl ContainerInspect {
    /// Returns the typed container id.
    #[must_use]
    pub fn container_id(&self) -> ContainerId {
        ContainerId::new(self.id.clone())
    }
}

/// `State` block of an inspect record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerStatus {
    /// Whether the main process is running.
    pub running: bool,
    /// Host pid of the main process (0 when stopped).
    pub pid: i64,
    /// Exit code of the last run.
    #[serde(rename(deserialize = "exitcode"))]
    pub exit_code: i64,
    /// Start timestamp of the last run.
    #[serde(rename(deserialize = "startedat"))]
    pub started_at: String,
    /// Whether the daemon lost track of the process.
    pub ghost: bool,
}

/// `NetworkSettings` block of an inspect record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Address on the daemon's own bridge.
    #[serde(rename(deserialize = "ipaddress"))]
    pub ip_address: String,
    /// Prefix length of that address.
    #[serde(rename(deserialize = "ipprefixlen"))]
    pub ip_prefix_len: u32,
    /// Gateway address.
    pub gateway: String,
    /// Daemon bridge name.
    pub bridge: String,
    /// Published ports: container port (`5000/tcp`) to host bindings.
    #[serde(deserialize_with = "null_as_default")]
    pub ports: BTreeMap<String, Option<Vec<PortBinding>>>,
}

impl NetworkSettings {
    /// Returns the first host port bound to `container_port`.
    #[must_use]
    pub fn host_port(&self, container_port: &str) -> Option<u16> {
        self.ports
            .get(container_port)?
            .as_ref()?
            .iter()
            .find_map(|b| b.host_port.trim().parse().ok())
    }
}

/// A single host binding of a published port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortBinding {
    /// Host address.
    #[serde(rename(deserialize = "hostip"))]
    pub host_ip: String,
    /// Host port, as the daemon reports it (a string).
    #[serde(rename(deserialize = "hostport"))]
    pub host_port: String,
}

/// Result of `GET /images/{name}/json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageInspect {
    /// Image id.
    pub id: String,
    /// Parent image id.
    pub parent: String,
    /// Creation timestamp.
    pub created: String,
    /// Configuration of the container the image was committed from.
    pub container_config: Option<ContainerConfig>,
    /// Default run configuration.
    pub config: Option<ContainerConfig>,
    /// Image size in bytes.
    pub size: i64,
}

/// Image reference split into the `fromImage` and `tag` pull parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Repository, including any registry host and port.
    pub repository: String,
    /// Tag, if one was given.
    pub tag: Option<String>,
}

impl ImageRef {
    /// Splits `registry:5000/repo:tag` into repository and tag.
    ///
    /// A colon followed by a `/` belongs to a registry address, not a tag.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        match reference.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') && !repo.is_empty() && !tag.is_empty() => {
                Self {
                    repository: repo.to_string(),
                    tag: Some(tag.to_string()),
                }
            }
            _ => Self {
                repository: reference.to_string(),
                tag: None,
            },
        }
    }
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
