//! Host capacity shapes reported to the host framework.

use dockvisor_common::constants::{HYPERVISOR_TYPE, HYPERVISOR_VERSION};
use dockvisor_host::probe::{DiskUsage, MemoryUsage};
use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Resources this host offers for scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableResource {
    /// Virtual CPUs; fixed at 1, the daemon exposes no CPU accounting.
    pub vcpus: u32,
    /// Virtual CPUs in use.
    pub vcpus_used: u32,
    /// Total memory in MiB.
    pub memory_mb: u64,
    /// Used memory in MiB.
    pub memory_mb_used: u64,
    /// Total disk under the daemon's data directory, in GiB.
    pub local_gb: u64,
    /// Used disk in GiB.
    pub local_gb_used: u64,
    /// Always `docker`.
    pub hypervisor_type: String,
    /// Driver-reported hypervisor version.
    pub hypervisor_version: String,
    /// Node the resource belongs to.
    pub hypervisor_hostname: String,
    /// Unknown, reported as `?`.
    pub cpu_info: String,
}

impl AvailableResource {
    /// Builds the report from probe readings.
    #[must_use]
    pub fn from_usage(nodename: &str, memory: &MemoryUsage, disk: &DiskUsage) -> Self {
        Self {
            vcpus: 1,
            vcpus_used: 0,
            memory_mb: memory.total / MIB,
            memory_mb_used: memory.used / MIB,
            local_gb: disk.total / GIB,
            local_gb_used: disk.used / GIB,
            hypervisor_type: HYPERVISOR_TYPE.to_owned(),
            hypervisor_version: HYPERVISOR_VERSION.to_owned(),
            hypervisor_hostname: nodename.to_owned(),
            cpu_info: "?".to_owned(),
        }
    }
}

/// Point-in-time host statistics, in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStats {
    /// Display label for the host.
    pub host_name_label: String,
    /// Host name.
    pub host_hostname: String,
    /// Hypervisor host name; the same machine.
    pub hypervisor_hostname: String,
    /// Total memory.
    pub host_memory_total: u64,
    /// Free memory, counting cache and buffers.
    pub host_memory_free: u64,
    /// Memory in use.
    pub host_memory_overhead: u64,
    /// Disk size.
    pub disk_total: u64,
    /// Disk in use.
    pub disk_used: u64,
    /// Disk available.
    pub disk_available: u64,
}

impl HostStats {
    /// Builds the stats from probe readings.
    #[must_use]
    pub fn from_usage(hostname: &str, memory: &MemoryUsage, disk: &DiskUsage) -> Self {
        Self {
            host_name_label: hostname.to_owned(),
            host_hostname: hostname.to_owned(),
            hypervisor_hostname: hostname.to_owned(),
            host_memory_total: memory.total,
            host_memory_free: memory.free,
            host_memory_overhead: memory.used,
            disk_total: disk.total,
            disk_used: disk.used,
            disk_available: disk.available,
        }
    }
}
