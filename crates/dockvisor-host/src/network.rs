//! Network-namespace splice.
//!
//! Gives a running container an interface on a host bridge: the
//! container's network namespace is published under a name, a veth pair
//! is created with one end on the bridge, and the other end is moved into
//! the namespace and addressed there. Every step is an external command
//! run through a [`CommandRunner`].
//!
//! A failed splice is not rolled back. The error lists what was left on
//! the host; the namespace itself disappears with the container.

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use dockvisor_common::config::DriverConfig;
use dockvisor_common::constants::{
    DEFAULT_PREFIX_LEN, VETH_GUEST_PREFIX, VETH_HOST_PREFIX, VETH_SUFFIX_RANGE,
};
use dockvisor_common::error::DockvisorError;
use dockvisor_common::types::ContainerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cgroup::{CgroupLocator, PidPoll};
use crate::command::CommandRunner;

/// An address to configure inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAssignment {
    /// Interface address.
    pub address: IpAddr,
    /// Network prefix length.
    #[serde(default = "default_prefix_len")]
    pub prefix_len: u8,
}

impl IpAssignment {
    /// Creates an assignment with the default prefix length.
    #[must_use]
    pub const fn new(address: IpAddr) -> Self {
        Self {
            address,
            prefix_len: DEFAULT_PREFIX_LEN,
        }
    }
}

impl fmt::Display for IpAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

const fn default_prefix_len() -> u8 {
    DEFAULT_PREFIX_LEN
}

/// Names of a veth pair: host end and container end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VethPair {
    /// End attached to the host bridge.
    pub host: String,
    /// End moved into the container.
    pub guest: String,
}

impl VethPair {
    /// Builds a pair sharing the numeric suffix `n`.
    #[must_use]
    pub fn with_suffix(n: u32) -> Self {
        Self {
            host: format!("{VETH_HOST_PREFIX}{n}"),
            guest: format!("{VETH_GUEST_PREFIX}{n}"),
        }
    }

    /// Builds a pair with a random suffix below the configured range.
    #[must_use]
    pub fn random() -> Self {
        Self::with_suffix(rand::random_range(0..VETH_SUFFIX_RANGE))
    }
}

/// What a successful splice created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    /// Init pid of the container.
    pub pid: u32,
    /// Named handle to the container's network namespace.
    pub netns_link: PathBuf,
    /// The veth pair.
    pub veth: VethPair,
    /// Address configured on the container end.
    pub address: IpAssignment,
}

/// A splice that stopped part-way.
#[derive(Debug, Error)]
#[error("network splice failed at {step}: {source}")]
pub struct SpliceError {
    /// The step that failed.
    pub step: &'static str,
    /// Host artifacts created before the failure.
    pub leftovers: Vec<String>,
    /// Underlying failure.
    #[source]
    pub source: DockvisorError,
}

/// Splices container network namespaces onto host bridges.
pub struct NetworkSplicer {
    runner: Box<dyn CommandRunner>,
    cgroups: CgroupLocator,
    poll: PidPoll,
    netns_dir: PathBuf,
}

impl fmt::Debug for NetworkSplicer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkSplicer")
            .field("cgroups", &self.cgroups)
            .field("poll", &self.poll)
            .field("netns_dir", &self.netns_dir)
            .finish_non_exhaustive()
    }
}

impl NetworkSplicer {
    /// Creates a splicer from its parts.
    #[must_use]
    pub fn new(
        runner: Box<dyn CommandRunner>,
        cgroups: CgroupLocator,
        poll: PidPoll,
        netns_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            cgroups,
            poll,
            netns_dir: netns_dir.into(),
        }
    }

    /// Creates a splicer wired from the driver configuration.
    #[must_use]
    pub fn from_config(config: &DriverConfig, runner: Box<dyn CommandRunner>) -> Self {
        Self::new(
            runner,
            CgroupLocator::from_config(config),
            PidPoll::from_config(config),
            &config.netns_dir,
        )
    }

    /// Connects container `id` to `bridge` and assigns `address` inside it.
    ///
    /// # Errors
    ///
    /// Returns a [`SpliceError`] naming the failed step and any host
    /// artifacts it left behind.
    pub fn splice(
        &self,
        id: &ContainerId,
        bridge: &str,
        address: IpAssignment,
    ) -> Result<Splice, SpliceError> {
        self.splice_with(id, bridge, address, VethPair::random())
    }

    /// Like [`NetworkSplicer::splice`] with explicit veth names.
    ///
    /// # Errors
    ///
    /// See [`NetworkSplicer::splice`].
    pub fn splice_with(
        &self,
        id: &ContainerId,
        bridge: &str,
        address: IpAssignment,
        veth: VethPair,
    ) -> Result<Splice, SpliceError> {
        let mut leftovers = Vec::new();
        let fail = |step: &'static str, leftovers: &[String], source: DockvisorError| {
            tracing::warn!(id = %id, step, leftovers = ?leftovers, error = %source, "network splice failed");
            SpliceError {
                step,
                leftovers: leftovers.to_vec(),
                source,
            }
        };

        let pid = self
            .cgroups
            .wait_for_pid(id, self.poll)
            .map_err(|e| fail("pid lookup", &leftovers, e))?;

        if !self.netns_dir.exists() {
            self.run("mkdir", &["-p".into(), path_arg(&self.netns_dir)])
                .map_err(|e| fail("netns dir", &leftovers, e))?;
        }

        let netns_link = self.netns_dir.join(id.as_str());
        self.run(
            "ln",
            &[
                "-sf".into(),
                format!("/proc/{pid}/ns/net"),
                path_arg(&netns_link),
            ],
        )
        .map_err(|e| fail("netns link", &leftovers, e))?;
        leftovers.push(format!("netns link {}", netns_link.display()));

        self.run(
            "ip",
            &strings(&[
                "link", "add", "name", &veth.host, "type", "veth", "peer", "name", &veth.guest,
            ]),
        )
        .map_err(|e| fail("veth create", &leftovers, e))?;
        leftovers.push(format!("veth pair {}/{}", veth.host, veth.guest));

        let steps: [(&'static str, &str, Vec<String>); 5] = [
            ("bridge attach", "brctl", strings(&["addif", bridge, &veth.host])),
            ("host link up", "ip", strings(&["link", "set", &veth.host, "up"])),
            (
                "guest move",
                "ip",
                strings(&["link", "set", &veth.guest, "netns", &pid.to_string()]),
            ),
            (
                "guest address",
                "ip",
                strings(&[
                    "netns", "exec", id.as_str(), "ip", "addr", "add",
                    &address.to_string(), "dev", &veth.guest,
                ]),
            ),
            (
                "guest link up",
                "ip",
                strings(&[
                    "netns", "exec", id.as_str(), "ip", "link", "set", &veth.guest, "up",
                ]),
            ),
        ];
        for (step, program, args) in &steps {
            self.run(program, args)
                .map_err(|e| fail(*step, &leftovers, e))?;
        }

        tracing::info!(id = %id, pid, bridge, host_if = %veth.host, address = %address, "network spliced");
        Ok(Splice {
            pid,
            netns_link,
            veth,
            address,
        })
    }

    fn run(&self, program: &str, args: &[String]) -> dockvisor_common::error::Result<()> {
        self.runner.run(program, args)
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| (*s).to_owned()).collect()
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::command::RecordingRunner;

    struct Fixture {
        _dir: tempfile::TempDir,
        netns_dir: PathBuf,
        splicer: NetworkSplicer,
        runner: Arc<RecordingRunner>,
        id: ContainerId,
    }

    fn fixture(tasks: &str, netns_exists: bool) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let devices = dir.path().join("devices");
        let id = ContainerId::new("f00dfeed");
        let cg = devices.join("lxc").join(id.as_str());
        std::fs::create_dir_all(&cg).expect("mkdir");
        std::fs::write(cg.join("tasks"), tasks).expect("tasks");
        let mounts = dir.path().join("mounts");
        std::fs::write(
            &mounts,
            format!("cgroup {} cgroup rw,devices 0 0\n", devices.display()),
        )
        .expect("mounts");
        let netns_dir = dir.path().join("netns");
        if netns_exists {
            std::fs::create_dir_all(&netns_dir).expect("netns dir");
        }
        let runner = Arc::new(RecordingRunner::new());
        let splicer = NetworkSplicer::new(
            Box::new(Arc::clone(&runner)),
            CgroupLocator::new(mounts, "lxc"),
            PidPoll {
                interval: Duration::from_millis(1),
                attempts: 2,
            },
            &netns_dir,
        );
        Fixture {
            _dir: dir,
            netns_dir,
            splicer,
            runner,
            id,
        }
    }

    fn addr() -> IpAssignment {
        IpAssignment::new("10.0.0.5".parse().expect("ip"))
    }

    #[test]
    fn veth_pair_names_share_suffix() {
        let pair = VethPair::with_suffix(42);
        assert_eq!(pair.host, "pvnetl42");
        assert_eq!(pair.guest, "pvnetr42");
        let random = VethPair::random();
        assert_eq!(random.host[6..], random.guest[6..]);
    }

    #[test]
    fn random_suffixes_stay_below_range() {
        for _ in 0..1_000 {
            let pair = VethPair::random();
            let suffix: u32 = pair.host["pvnetl".len()..].parse().unwrap();
            assert!(suffix < VETH_SUFFIX_RANGE, "suffix {suffix} out of range");
            assert_eq!(pair.guest, format!("pvnetr{suffix}"));
        }
    }

    #[test]
    fn assignment_displays_as_cidr() {
        assert_eq!(addr().to_string(), "10.0.0.5/24");
    }

    #[test]
    fn splice_runs_full_command_sequence() {
        let fx = fixture("777\n", false);
        let splice = fx
            .splicer
            .splice_with(&fx.id, "br100", addr(), VethPair::with_suffix(7))
            .unwrap();
        assert_eq!(splice.pid, 777);
        let ns = fx.netns_dir.display();
        assert_eq!(
            fx.runner.calls(),
            vec![
                format!("mkdir -p {ns}"),
                format!("ln -sf /proc/777/ns/net {ns}/f00dfeed"),
                "ip link add name pvnetl7 type veth peer name pvnetr7".to_owned(),
                "brctl addif br100 pvnetl7".to_owned(),
                "ip link set pvnetl7 up".to_owned(),
                "ip link set pvnetr7 netns 777".to_owned(),
                "ip netns exec f00dfeed ip addr add 10.0.0.5/24 dev pvnetr7".to_owned(),
                "ip netns exec f00dfeed ip link set pvnetr7 up".to_owned(),
            ]
        );
    }

    #[test]
    fn existing_netns_dir_skips_mkdir() {
        let fx = fixture("777\n", true);
        let _ = fx.splicer.splice(&fx.id, "br100", addr()).unwrap();
        assert!(fx.runner.calls()[0].starts_with("ln -sf"));
    }

    #[test]
    fn missing_pid_fails_before_any_command() {
        let fx = fixture("", true);
        let err = fx.splicer.splice(&fx.id, "br100", addr()).unwrap_err();
        assert_eq!(err.step, "pid lookup");
        assert!(err.leftovers.is_empty());
        assert!(fx.runner.calls().is_empty());
    }

    #[test]
    fn failure_reports_leftovers_without_rollback() {
        let fx = fixture("777\n", true);
        fx.runner.fail_on("brctl");
        let err = fx
            .splicer
            .splice_with(&fx.id, "br100", addr(), VethPair::with_suffix(3))
            .unwrap_err();
        assert_eq!(err.step, "bridge attach");
        assert_eq!(err.leftovers.len(), 2);
        assert!(err.leftovers[1].contains("pvnetl3/pvnetr3"));
        assert_eq!(fx.runner.calls().last().map(String::as_str), Some("brctl addif br100 pvnetl3"));
    }
}
