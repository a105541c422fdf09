//! Driver configuration model.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{DockvisorError, Result};
use crate::types::ApiVersion;

/// Root configuration for the Dockvisor driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Daemon endpoint: `tcp://host:port`, `http://host:port` or `unix:///path`.
    pub endpoint: String,
    /// Daemon API version to speak.
    pub api_version: ApiVersion,
    /// Image used when the caller names none.
    pub default_image: String,
    /// Grace period passed to the daemon's stop call.
    pub stop_timeout_secs: u32,
    /// Daemon data directory used for disk accounting.
    pub docker_data_dir: PathBuf,
    /// Directory receiving named network-namespace handles.
    pub netns_dir: PathBuf,
    /// Cgroup directory the daemon nests container cgroups under.
    pub cgroup_parent: String,
    /// Delay between cgroup task-list reads.
    pub pid_poll_interval_ms: u64,
    /// Number of task-list reads before the splice gives up.
    pub pid_poll_attempts: u32,
    /// Privilege-escalation wrapper for network commands (`None` runs them directly).
    pub root_helper: Option<String>,
    /// Mount table used to locate the cgroup hierarchy.
    pub proc_mounts: PathBuf,
    /// Kernel memory counters file.
    pub proc_meminfo: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_ENDPOINT.into(),
            api_version: ApiVersion::default(),
            default_image: constants::DEFAULT_IMAGE.into(),
            stop_timeout_secs: constants::DEFAULT_STOP_TIMEOUT_SECS,
            docker_data_dir: PathBuf::from(constants::DOCKER_DATA_DIR),
            netns_dir: PathBuf::from(constants::NETNS_DIR),
            cgroup_parent: constants::DEFAULT_CGROUP_PARENT.into(),
            pid_poll_interval_ms: constants::PID_POLL_INTERVAL_MS,
            pid_poll_attempts: constants::PID_POLL_ATTEMPTS,
            root_helper: Some("sudo".into()),
            proc_mounts: PathBuf::from(constants::PROC_MOUNTS),
            proc_meminfo: PathBuf::from(constants::PROC_MEMINFO),
        }
    }
}

impl DriverConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON,
    /// or describes an invalid configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DockvisorError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or the pid poll bound is zero.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(DockvisorError::Config {
                message: "daemon endpoint is empty".into(),
            });
        }
        if self.pid_poll_attempts == 0 {
            return Err(DockvisorError::Config {
                message: "pid_poll_attempts must be at least 1".into(),
            });
        }
        Ok(())
    }
}
