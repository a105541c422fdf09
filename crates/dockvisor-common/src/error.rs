//! Unified error types for the Dockvisor workspace.
//!
//! Absent data from the daemon is never an error: read operations return
//! `None` or an empty collection, mutating operations return `false`. An
//! `Err` means something the caller cannot recover from locally.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DockvisorError {
    /// The daemon could not be reached at the configured endpoint.
    #[error("cannot connect to daemon at {endpoint}: {source}")]
    Connection {
        /// Endpoint that was dialed.
        endpoint: String,
        /// Underlying socket error.
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// An instance could not be deployed.
    #[error("failed to deploy instance {instance}: {reason}")]
    DeployFailure {
        /// Name of the instance being spawned.
        instance: String,
        /// What went wrong.
        reason: String,
    },

    /// A privileged OS command exited unsuccessfully.
    #[error("command `{program} {}` failed: {message}", args.join(" "))]
    Command {
        /// Program that was invoked.
        program: String,
        /// Arguments passed to the program.
        args: Vec<String>,
        /// Exit status and captured stderr.
        message: String,
    },

    /// The daemon sent a response that is not valid HTTP.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the framing problem.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl DockvisorError {
    /// Builds a `NotFound` error for a host-framework instance.
    #[must_use]
    pub fn instance_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "instance",
            id: name.into(),
        }
    }

    /// Builds a `DeployFailure` error for the named instance.
    #[must_use]
    pub fn deploy_failure(instance: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeployFailure {
            instance: instance.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether this error means the daemon was unreachable.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DockvisorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_failure_names_the_instance() {
        let err = DockvisorError::deploy_failure("web1", "cannot create container");
        assert_eq!(
            err.to_string(),
            "failed to deploy instance web1: cannot create container"
        );
    }

    #[test]
    fn command_error_joins_arguments() {
        let err = DockvisorError::Command {
            program: "ip".into(),
            args: vec!["link".into(), "set".into(), "pvnetl1".into(), "up".into()],
            message: "exit status 2".into(),
        };
        assert_eq!(
            err.to_string(),
            "command `ip link set pvnetl1 up` failed: exit status 2"
        );
    }

    #[test]
    fn connection_error_is_detected() {
        let err = DockvisorError::Connection {
            endpoint: "tcp://127.0.0.1:4243".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert!(err.is_connection());
        assert!(!DockvisorError::instance_not_found("x").is_connection());
    }
}
