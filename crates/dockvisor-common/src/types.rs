//! Domain primitive types used across the Dockvisor workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque container handle assigned by the daemon on creation.
///
/// Only the daemon (or its in-memory double) hands these out; the rest of
/// the workspace just carries them around.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Wraps an id string returned by the daemon.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 12-character short form used in logs and tables.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name the host framework gives an instance.
///
/// Stored as the container's hostname, since the daemon has no name field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceName(String);

impl InstanceName {
    /// Creates an instance name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Two-value power state reported to the host framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    /// The container's process is running.
    Running,
    /// The container exists but is not running.
    Shutdown,
}

impl PowerState {
    /// Derives the power state from the daemon's running flag.
    #[must_use]
    pub const fn from_running(running: bool) -> Self {
        if running { Self::Running } else { Self::Shutdown }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Daemon API version the HTTP client speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiVersion {
    /// `/v1.3` endpoints.
    #[serde(rename = "v1.3")]
    V1_3,
    /// `/v1.4` endpoints.
    #[default]
    #[serde(rename = "v1.4")]
    V1_4,
}

impl ApiVersion {
    /// Parses `v1.3`, `1.3`, `v1.4` or `1.4`.
    ///
    /// # Errors
    ///
    /// Returns an error for any other version string.
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        match s.trim().trim_start_matches('v') {
            "1.3" => Ok(Self::V1_3),
            "1.4" => Ok(Self::V1_4),
            other => Err(crate::error::DockvisorError::Config {
                message: format!("unsupported daemon API version: {other}"),
            }),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1_3 => write!(f, "v1.3"),
            Self::V1_4 => write!(f, "v1.4"),
        }
    }
}
