//! Container pid discovery through the cgroup `devices` controller.
//!
//! The daemon places each container in `<devices mount>/<parent>/<id>`;
//! the first pid in that cgroup's `tasks` file is the container's init.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dockvisor_common::config::DriverConfig;
use dockvisor_common::error::{DockvisorError, Result};
use dockvisor_common::types::ContainerId;

/// Bounded polling schedule for the tasks file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidPoll {
    /// Delay between reads.
    pub interval: Duration,
    /// Maximum number of reads.
    pub attempts: u32,
}

impl PidPoll {
    /// Builds the schedule from the driver configuration.
    #[must_use]
    pub const fn from_config(config: &DriverConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.pid_poll_interval_ms),
            attempts: config.pid_poll_attempts,
        }
    }
}

/// Locates container cgroups on the host.
#[derive(Debug, Clone)]
pub struct CgroupLocator {
    mounts_path: PathBuf,
    parent: String,
}

impl CgroupLocator {
    /// Creates a locator reading `mounts_path` and nesting under `parent`.
    #[must_use]
    pub fn new(mounts_path: impl Into<PathBuf>, parent: impl Into<String>) -> Self {
        Self {
            mounts_path: mounts_path.into(),
            parent: parent.into(),
        }
    }

    /// Creates a locator from the driver configuration.
    #[must_use]
    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(&config.proc_mounts, &config.cgroup_parent)
    }

    /// Returns the `tasks` file of the container's cgroup.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount table cannot be read or has no
    /// cgroup mount carrying the `devices` controller.
    pub fn tasks_path(&self, id: &ContainerId) -> Result<PathBuf> {
        let mounts = std::fs::read_to_string(&self.mounts_path).map_err(|e| {
            DockvisorError::Io {
                path: self.mounts_path.clone(),
                source: e,
            }
        })?;
        let mount = find_devices_mount(&mounts).ok_or_else(|| DockvisorError::NotFound {
            kind: "cgroup devices mount",
            id: self.mounts_path.display().to_string(),
        })?;
        Ok(mount.join(&self.parent).join(id.as_str()).join("tasks"))
    }

    /// Waits for the container's first pid to appear.
    ///
    /// A missing or empty tasks file counts as "not yet"; reads stop after
    /// `poll.attempts`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no pid appears within the schedule.
    pub fn wait_for_pid(&self, id: &ContainerId, poll: PidPoll) -> Result<u32> {
        let tasks = self.tasks_path(id)?;
        for attempt in 1..=poll.attempts {
            if let Some(pid) = first_pid(&tasks) {
                tracing::debug!(id = %id, pid, attempt, "container pid found");
                return Ok(pid);
            }
            if attempt < poll.attempts {
                std::thread::sleep(poll.interval);
            }
        }
        tracing::warn!(id = %id, path = %tasks.display(), "no pid in cgroup tasks file");
        Err(DockvisorError::NotFound {
            kind: "container pid",
            id: id.to_string(),
        })
    }
}

/// Finds the mount point of the cgroup v1 hierarchy carrying `devices`.
#[must_use]
pub fn find_devices_mount(mounts: &str) -> Option<PathBuf> {
    mounts.lines().find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [_, mount_point, fstype, options, ..] = fields.as_slice() else {
            return None;
        };
        (*fstype == "cgroup" && options.split(',').any(|o| o == "devices"))
            .then(|| PathBuf::from(mount_point))
    })
}

fn first_pid(tasks: &Path) -> Option<u32> {
    let content = std::fs::read_to_string(tasks).ok()?;
    content.lines().find_map(|l| l.trim().parse().ok())
}
