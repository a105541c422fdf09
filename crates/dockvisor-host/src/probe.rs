//! Read-only host resource counters.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dockvisor_common::config::DriverConfig;
use dockvisor_common::error::{DockvisorError, Result};
use serde::{Deserialize, Serialize};

/// Host memory in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Total physical memory.
    pub total: u64,
    /// Free memory, counting page cache and buffers as free.
    pub free: u64,
    /// `total - free`.
    pub used: u64,
}

/// Filesystem capacity in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskUsage {
    /// Total size.
    pub total: u64,
    /// Space available to unprivileged users.
    pub available: u64,
    /// Space in use.
    pub used: u64,
}

/// Reads host memory and disk counters.
#[derive(Debug, Clone)]
pub struct HostProbe {
    meminfo_path: PathBuf,
    data_dir: PathBuf,
}

impl HostProbe {
    /// Creates a probe over explicit paths.
    #[must_use]
    pub fn new(meminfo_path: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            meminfo_path: meminfo_path.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Creates a probe from the driver configuration.
    #[must_use]
    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(&config.proc_meminfo, &config.docker_data_dir)
    }

    /// Reads current memory usage.
    ///
    /// # Errors
    ///
    /// Returns an error if the meminfo file cannot be read.
    pub fn memory_usage(&self) -> Result<MemoryUsage> {
        let content =
            std::fs::read_to_string(&self.meminfo_path).map_err(|e| DockvisorError::Io {
                path: self.meminfo_path.clone(),
                source: e,
            })?;
        Ok(memory_usage_from(&parse_meminfo(&content)))
    }

    /// Reads capacity of the daemon's data directory, or of `/` if that
    /// directory does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if `statvfs(3)` fails.
    pub fn disk_usage(&self) -> Result<DiskUsage> {
        let path = if self.data_dir.exists() {
            self.data_dir.as_path()
        } else {
            tracing::debug!(path = %self.data_dir.display(), "data dir missing, using /");
            Path::new("/")
        };
        statvfs_usage(path)
    }
}

/// Returns the host's name.
///
/// # Errors
///
/// Returns an error if `gethostname(2)` fails.
pub fn hostname() -> Result<String> {
    nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .map_err(|e| DockvisorError::Io {
            path: "gethostname".into(),
            source: e.into(),
        })
}

#[allow(clippy::useless_conversion)]
fn statvfs_usage(path: &Path) -> Result<DiskUsage> {
    let st = nix::sys::statvfs::statvfs(path).map_err(|e| DockvisorError::Io {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    let frsize = u64::from(st.fragment_size());
    let blocks = u64::from(st.blocks());
    let bfree = u64::from(st.blocks_free());
    let bavail = u64::from(st.blocks_available());
    Ok(DiskUsage {
        total: blocks.saturating_mul(frsize),
        available: bavail.saturating_mul(frsize),
        used: blocks.saturating_sub(bfree).saturating_mul(frsize),
    })
}

/// Parses `/proc/meminfo` into lower-cased keys and byte values.
///
/// Values with a `kB` unit are scaled to bytes; lines whose value is not
/// a number are skipped.
#[must_use]
pub fn parse_meminfo(content: &str) -> HashMap<String, u64> {
    content
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let mut parts = rest.split_whitespace();
            let value = parts.next()?.parse::<u64>().ok()?;
            let value = if parts.next() == Some("kB") {
                value.saturating_mul(1024)
            } else {
                value
            };
            Some((key.trim().to_lowercase(), value))
        })
        .collect()
}

/// Derives usage from parsed meminfo; cached pages and buffers count as free.
#[must_use]
pub fn memory_usage_from(meminfo: &HashMap<String, u64>) -> MemoryUsage {
    let get = |key: &str| meminfo.get(key).copied().unwrap_or(0);
    let total = get("memtotal");
    let free = get("memfree")
        .saturating_add(get("cached"))
        .saturating_add(get("buffers"));
    MemoryUsage {
        total,
        free,
        used: total.saturating_sub(free),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "MemTotal:        8000000 kB\n\
                           MemFree:         1000000 kB\n\
                           Buffers:          500000 kB\n\
                           Cached:          1500000 kB\n\
                           SwapCached:            0 kB\n\
                           HugePages_Total:       0\n\
                           Bogus:           notanumber kB\n";

    #[test]
    fn parse_meminfo_scales_kb_and_lowercases() {
        let info = parse_meminfo(MEMINFO);
        assert_eq!(info["memtotal"], 8_000_000 * 1024);
        assert_eq!(info["hugepages_total"], 0);
        assert!(!info.contains_key("bogus"));
    }

    #[test]
    fn memory_counts_cache_and_buffers_as_free() {
        let usage = memory_usage_from(&parse_meminfo(MEMINFO));
        assert_eq!(usage.total, 8_000_000 * 1024);
        assert_eq!(usage.free, 3_000_000 * 1024);
        assert_eq!(usage.used, 5_000_000 * 1024);
    }

    #[test]
    fn oversized_meminfo_values_saturate() {
        let usage = memory_usage_from(&parse_meminfo(
            "MemTotal: 18014398509481983 kB\n\
             MemFree:  18014398509481983 kB\n\
             Cached:   18014398509481983 kB\n\
             Buffers:  18014398509481983 kB\n",
        ));
        assert_eq!(usage.free, u64::MAX);
        assert_eq!(usage.used, 0);
    }

    #[test]
    fn empty_meminfo_is_all_zero() {
        assert_eq!(memory_usage_from(&parse_meminfo("")), MemoryUsage::default());
    }

    #[test]
    fn probe_reads_meminfo_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("meminfo");
        std::fs::write(&path, MEMINFO).expect("write");
        let probe = HostProbe::new(&path, dir.path());
        assert_eq!(probe.memory_usage().unwrap().free, 3_000_000 * 1024);
    }

    #[test]
    fn probe_missing_meminfo_is_io_error() {
        let probe = HostProbe::new("/nonexistent/meminfo", "/");
        assert!(matches!(
            probe.memory_usage().unwrap_err(),
            DockvisorError::Io { .. }
        ));
    }

    #[test]
    fn disk_usage_falls_back_to_root() {
        let probe = HostProbe::new("/proc/meminfo", "/nonexistent/docker");
        let usage = probe.disk_usage().unwrap();
        assert!(usage.total > 0);
        assert!(usage.used <= usage.total);
    }

    #[test]
    fn disk_usage_of_existing_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let usage = HostProbe::new("/proc/meminfo", dir.path()).disk_usage().unwrap();
        assert!(usage.available <= usage.total);
    }

    #[test]
    fn hostname_is_not_empty() {
        assert!(!hostname().unwrap().is_empty());
    }
}
