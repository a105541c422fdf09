//! Execution of the privileged OS tools used by the network splice.

use std::sync::Mutex;

use dockvisor_common::error::{DockvisorError, Result};

/// Runs an external program to completion.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, failing unless it exits successfully.
    ///
    /// # Errors
    ///
    /// Returns [`DockvisorError::Command`] on a non-zero exit and
    /// [`DockvisorError::Io`] if the program cannot be launched.
    fn run(&self, program: &str, args: &[String]) -> Result<()>;
}

/// Runs commands on the host, optionally behind a root helper such as `sudo`.
#[derive(Debug, Clone, Default)]
pub struct HostRunner {
    root_helper: Option<String>,
}

impl HostRunner {
    /// Creates a runner; `root_helper` is prepended to every invocation.
    #[must_use]
    pub fn new(root_helper: Option<String>) -> Self {
        Self {
            root_helper: root_helper.filter(|h| !h.trim().is_empty()),
        }
    }
}

impl CommandRunner for HostRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<()> {
        let (binary, argv) = match &self.root_helper {
            Some(helper) => {
                let mut argv = Vec::with_capacity(args.len() + 1);
                argv.push(program.to_owned());
                argv.extend_from_slice(args);
                (helper.as_str(), argv)
            }
            None => (program, args.to_vec()),
        };
        let path = which::which(binary).map_err(|_| DockvisorError::NotFound {
            kind: "executable",
            id: binary.to_owned(),
        })?;

        tracing::debug!(program, args = ?args, helper = ?self.root_helper, "running host command");
        let output = std::process::Command::new(&path)
            .args(&argv)
            .output()
            .map_err(|e| DockvisorError::Io { path, source: e })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(DockvisorError::Command {
            program: program.to_owned(),
            args: args.to_vec(),
            message: format!("{}: {}", output.status, stderr.trim()),
        })
    }
}

/// Records invocations instead of executing them.
///
/// A command whose rendered form (`program arg...`) starts with a prefix
/// registered through [`RecordingRunner::fail_on`] fails.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingRunner {
    /// Creates a runner with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every command starting with `prefix` fail.
    pub fn fail_on(&self, prefix: impl Into<String>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(prefix.into());
        }
    }

    /// Returns every command run so far, rendered as `program arg...`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<()> {
        let rendered = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        let fails = self
            .failures
            .lock()
            .map(|f| f.iter().any(|p| rendered.starts_with(p.as_str())))
            .unwrap_or(false);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(rendered);
        }
        if fails {
            return Err(DockvisorError::Command {
                program: program.to_owned(),
                args: args.to_vec(),
                message: "exit status: 1: injected failure".into(),
            });
        }
        Ok(())
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<T> {
    fn run(&self, program: &str, args: &[String]) -> Result<()> {
        (**self).run(program, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn host_runner_succeeds_on_true() {
        HostRunner::new(None).run("true", &[]).unwrap();
    }

    #[test]
    fn host_runner_reports_exit_failure() {
        let err = HostRunner::new(None)
            .run("sh", &args(&["-c", "echo boom >&2; exit 3"]))
            .unwrap_err();
        match err {
            DockvisorError::Command { program, message, .. } => {
                assert_eq!(program, "sh");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn host_runner_missing_binary_is_not_found() {
        let err = HostRunner::new(None)
            .run("definitely-not-a-real-binary-xyz", &[])
            .unwrap_err();
        assert!(matches!(err, DockvisorError::NotFound { .. }));
    }

    #[test]
    fn root_helper_wraps_invocation() {
        // `env` stands in for sudo: it runs its first argument as a program.
        HostRunner::new(Some("env".into()))
            .run("true", &[])
            .unwrap();
    }

    #[test]
    fn blank_root_helper_is_ignored() {
        HostRunner::new(Some("  ".into())).run("true", &[]).unwrap();
    }

    #[test]
    fn recording_runner_renders_and_fails_on_prefix() {
        let runner = RecordingRunner::new();
        runner.fail_on("brctl addif");
        runner.run("mkdir", &args(&["-p", "/x"])).unwrap();
        assert!(runner.run("brctl", &args(&["addif", "br0", "v"])).is_err());
        assert_eq!(runner.calls(), vec!["mkdir -p /x", "brctl addif br0 v"]);
    }
}
