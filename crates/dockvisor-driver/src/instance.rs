//! Records exchanged with the host framework.

use std::collections::BTreeMap;

use base64::Engine;
use dockvisor_common::error::{DockvisorError, Result};
use dockvisor_common::types::{InstanceName, PowerState};
use dockvisor_host::network::IpAssignment;
use serde::{Deserialize, Serialize};

const SHELL: &str = "/bin/sh";
const MIB: u64 = 1024 * 1024;

/// An instance handed to the driver for spawning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Host-framework name; becomes the container's hostname.
    pub name: InstanceName,
    /// Base64-encoded shell script run as the container's command.
    #[serde(default)]
    pub user_data: Option<String>,
    /// Explicit command, taking precedence over user data.
    #[serde(default)]
    pub command: Option<Vec<String>>,
    /// Free-form key/value metadata; `memory` sets the memory limit.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Memory limit from the instance flavor, in MiB.
    #[serde(default)]
    pub memory_mb: Option<u64>,
}

impl Instance {
    /// Creates an instance with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: InstanceName::new(name),
            ..Self::default()
        }
    }

    /// Resolves the container command.
    ///
    /// An explicit command wins; otherwise user data is decoded and run
    /// through `/bin/sh -c`; with neither the container runs a bare shell.
    ///
    /// # Errors
    ///
    /// Returns `DeployFailure` if user data is not valid base64 text.
    pub fn resolve_command(&self) -> Result<Vec<String>> {
        if let Some(cmd) = self.command.as_ref().filter(|c| !c.is_empty()) {
            return Ok(cmd.clone());
        }
        let Some(encoded) = self.user_data.as_deref().map(str::trim).filter(|s| !s.is_empty())
        else {
            return Ok(vec![SHELL.to_owned()]);
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| {
                DockvisorError::deploy_failure(self.name.as_str(), format!("user data: {e}"))
            })?;
        let script = String::from_utf8(bytes).map_err(|_| {
            DockvisorError::deploy_failure(self.name.as_str(), "user data is not UTF-8")
        })?;
        Ok(vec![SHELL.to_owned(), "-c".to_owned(), script])
    }

    /// Resolves the memory limit in bytes; zero means unlimited.
    ///
    /// The `memory` metadata key wins over `memory_mb`.
    ///
    /// # Errors
    ///
    /// Returns `DeployFailure` if the metadata value is not a size.
    pub fn resolve_memory(&self) -> Result<u64> {
        if let Some(raw) = self.metadata.get("memory") {
            return parse_memory(raw).ok_or_else(|| {
                DockvisorError::deploy_failure(
                    self.name.as_str(),
                    format!("invalid memory size '{raw}'"),
                )
            });
        }
        Ok(self.memory_mb.map_or(0, |mb| mb.saturating_mul(MIB)))
    }
}

/// Network the host framework allocated for an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Host bridge the instance joins.
    pub bridge: String,
    /// Addresses assigned to the instance; the first is configured.
    pub ips: Vec<IpAssignment>,
}

/// State reported for a running or stopped instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    /// Power state derived from the daemon's running flag.
    pub state: PowerState,
    /// Memory limit in bytes (zero is unlimited).
    pub max_mem: u64,
    /// Memory in bytes; the daemon reports no usage, so this is the limit.
    pub mem: u64,
    /// Virtual CPUs; always 1.
    pub num_cpu: u32,
    /// CPU time in nanoseconds; the daemon exposes none.
    pub cpu_time: u64,
}

/// Parses a memory size such as `512MiB`, `1GB` or `1048576`.
#[must_use]
pub fn parse_memory(s: &str) -> Option<u64> {
    let s = s.trim();
    let (num, multiplier) = [
        ("GiB", 1024 * MIB),
        ("GB", 1_000_000_000),
        ("MiB", MIB),
        ("MB", 1_000_000),
        ("KiB", 1024),
        ("KB", 1000),
    ]
    .into_iter()
    .find_map(|(suffix, m)| s.strip_suffix(suffix).map(|n| (n, m)))
    .unwrap_or((s, 1));
    num.trim().parse::<u64>().ok()?.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(s)
    }

    #[test]
    fn parse_memory_units() {
        assert_eq!(parse_memory("128MiB"), Some(128 * MIB));
        assert_eq!(parse_memory("1GiB"), Some(1024 * MIB));
        assert_eq!(parse_memory("2 GB"), Some(2_000_000_000));
        assert_eq!(parse_memory("1048576"), Some(1_048_576));
        assert_eq!(parse_memory("abc"), None);
        assert_eq!(parse_memory("99999999999999999999GiB"), None);
    }

    #[test]
    fn bare_instance_runs_shell() {
        assert_eq!(Instance::named("a").resolve_command().unwrap(), vec!["/bin/sh"]);
    }

    #[test]
    fn user_data_becomes_shell_script() {
        let mut inst = Instance::named("a");
        inst.user_data = Some(encode("echo hi && sleep 1"));
        assert_eq!(
            inst.resolve_command().unwrap(),
            vec!["/bin/sh", "-c", "echo hi && sleep 1"]
        );
    }

    #[test]
    fn explicit_command_beats_user_data() {
        let mut inst = Instance::named("a");
        inst.user_data = Some(encode("ignored"));
        inst.command = Some(vec!["nginx".into(), "-g".into()]);
        assert_eq!(inst.resolve_command().unwrap(), vec!["nginx", "-g"]);
    }

    #[test]
    fn garbage_user_data_is_deploy_failure() {
        let mut inst = Instance::named("web9");
        inst.user_data = Some("!!not base64!!".into());
        match inst.resolve_command().unwrap_err() {
            DockvisorError::DeployFailure { instance, .. } => assert_eq!(instance, "web9"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn memory_metadata_wins_over_flavor() {
        let mut inst = Instance::named("a");
        inst.memory_mb = Some(256);
        assert_eq!(inst.resolve_memory().unwrap(), 256 * MIB);
        let _ = inst.metadata.insert("memory".into(), "1GiB".into());
        assert_eq!(inst.resolve_memory().unwrap(), 1024 * MIB);
    }

    #[test]
    fn no_memory_is_unlimited() {
        assert_eq!(Instance::named("a").resolve_memory().unwrap(), 0);
    }

    #[test]
    fn bad_memory_metadata_is_deploy_failure() {
        let mut inst = Instance::named("a");
        let _ = inst.metadata.insert("memory".into(), "lots".into());
        assert!(matches!(
            inst.resolve_memory().unwrap_err(),
            DockvisorError::DeployFailure { .. }
        ));
    }

    #[test]
    fn network_info_defaults_prefix() {
        let info: NetworkInfo =
            serde_json::from_str(r#"{"bridge":"br100","ips":[{"address":"10.0.0.2"}]}"#).unwrap();
        assert_eq!(info.ips[0].prefix_len, 24);
    }
}
