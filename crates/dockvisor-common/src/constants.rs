//! System-wide constants and default paths.

/// Default daemon endpoint (loopback TCP).
pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:4243";

/// Image used when the caller does not name one.
pub const DEFAULT_IMAGE: &str = "ubuntu";

/// Grace period handed to the daemon's stop endpoint.
pub const DEFAULT_STOP_TIMEOUT_SECS: u32 = 5;

/// Page size used when listing containers.
pub const LIST_LIMIT: u32 = 50;

/// Where the daemon keeps container data; used for disk accounting.
pub const DOCKER_DATA_DIR: &str = "/var/lib/docker";

/// Directory `ip netns` looks in for named namespace handles.
pub const NETNS_DIR: &str = "/var/run/netns";

/// Cgroup directory the daemon places containers under.
pub const DEFAULT_CGROUP_PARENT: &str = "lxc";

/// Mount table used for cgroup discovery.
pub const PROC_MOUNTS: &str = "/proc/mounts";

/// Kernel memory counters.
pub const PROC_MEMINFO: &str = "/proc/meminfo";

/// Delay between reads of a container's cgroup task list.
pub const PID_POLL_INTERVAL_MS: u64 = 1000;

/// Number of reads of the task list before giving up.
pub const PID_POLL_ATTEMPTS: u32 = 10;

/// Prefix for the host-side veth endpoint.
pub const VETH_HOST_PREFIX: &str = "pvnetl";

/// Prefix for the container-side veth endpoint.
pub const VETH_GUEST_PREFIX: &str = "pvnetr";

/// Exclusive upper bound of the random veth suffix.
pub const VETH_SUFFIX_RANGE: u32 = 100_000;

/// Prefix length applied when network info does not carry one.
pub const DEFAULT_PREFIX_LEN: u8 = 24;

/// Process path substring identifying the local image registry container.
pub const REGISTRY_PROCESS: &str = "docker-registry";

/// Container port the registry listens on.
pub const REGISTRY_CONTAINER_PORT: &str = "5000/tcp";

/// Registry port the in-memory double reports.
pub const FAKE_REGISTRY_PORT: u16 = 5042;

/// Length of the ids handed out by the in-memory double.
pub const FAKE_ID_LENGTH: usize = 64;

/// Hypervisor type reported to the host framework.
pub const HYPERVISOR_TYPE: &str = "docker";

/// Hypervisor version reported to the host framework.
pub const HYPERVISOR_VERSION: &str = "1.0";

