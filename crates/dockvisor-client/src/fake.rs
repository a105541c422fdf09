//! In-memory daemon double.
//!
//! Keeps a map from container id to configuration and running flag, and
//! answers every [`DaemonClient`] call from it. Inspect and list replies
//! are built in the daemon's own key casing and pushed through
//! [`normalize`], so they take the same decoding path as real responses.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use dockvisor_common::constants;
use dockvisor_common::error::{DockvisorError, Result};
use dockvisor_common::types::ContainerId;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::client::DaemonClient;
use crate::models::{
    ContainerConfig, ContainerInspect, ContainerSummary, CreateOptions, ImageInspect,
};
use crate::response::normalize;

const FAKE_LOGS: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n\
                         Vivamus ornare mi sit amet orci feugiat, nec luctus magna vehicula.\n\
                         Quisque diam nisl, dictum vitae pretium id, consequat eget sapien.";

#[derive(Debug, Clone)]
struct FakeContainer {
    config: ContainerConfig,
    running: bool,
    created: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct FakeState {
    containers: BTreeMap<ContainerId, FakeContainer>,
    issued: HashSet<ContainerId>,
    failing_creates: usize,
    failing_pulls: bool,
    pulls: Vec<String>,
    inspections: usize,
}

/// Deterministic stand-in for the daemon, for driver tests.
#[derive(Debug, Default)]
pub struct FakeClient {
    state: Mutex<FakeState>,
}

impl FakeClient {
    /// Creates an empty double.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` create calls fail, as if the image were unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn fail_next_creates(&self, count: usize) -> Result<()> {
        self.lock()?.failing_creates = count;
        Ok(())
    }

    /// Makes every pull fail (or succeed again).
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn fail_pulls(&self, fail: bool) -> Result<()> {
        self.lock()?.failing_pulls = fail;
        Ok(())
    }

    /// Returns every image reference pulled so far, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn pulled_images(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.pulls.clone())
    }

    /// Returns the number of containers currently held.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn container_count(&self) -> Result<usize> {
        Ok(self.lock()?.containers.len())
    }

    /// Returns how many times `inspect_container` has been called.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn inspect_count(&self) -> Result<usize> {
        Ok(self.lock()?.inspections)
    }

    fn lock(&self) -> Result<MutexGuard<'_, FakeState>> {
        self.state.lock().map_err(|_| DockvisorError::Config {
            message: "fake daemon state lock poisoned".into(),
        })
    }
}

impl DaemonClient for FakeClient {
    fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let state = self.lock()?;
        let rows: Vec<Value> = state
            .containers
            .iter()
            .filter(|(_, c)| all || c.running)
            .map(|(id, c)| {
                json!({
                    "Id": id.as_str(),
                    "Image": c.config.image,
                    "Command": c.config.cmd.join(" "),
                    "Status": if c.running { "Up" } else { "Exit 0" },
                    "Created": c.created.timestamp(),
                })
            })
            .collect();
        from_daemon(Value::Array(rows))
    }

    fn create_container(&self, options: &CreateOptions) -> Result<Option<ContainerId>> {
        let mut state = self.lock()?;
        if state.failing_creates > 0 {
            state.failing_creates -= 1;
            tracing::debug!(image = ?options.image, "fake daemon refusing create");
            return Ok(None);
        }
        let id = loop {
            let candidate = fake_id();
            if !state.issued.contains(&candidate) {
                break candidate;
            }
        };
        let _ = state.issued.insert(id.clone());
        let _ = state.containers.insert(
            id.clone(),
            FakeContainer {
                config: ContainerConfig::with_overrides(options),
                running: false,
                created: Utc::now(),
                started_at: None,
            },
        );
        Ok(Some(id))
    }

    fn start_container(&self, id: &ContainerId) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(container) = state.containers.get_mut(id) else {
            return Ok(false);
        };
        container.running = true;
        container.started_at = Some(Utc::now());
        Ok(true)
    }

    fn inspect_container(&self, id: &ContainerId) -> Result<Option<ContainerInspect>> {
        let mut state = self.lock()?;
        state.inspections += 1;
        let Some(container) = state.containers.get(id) else {
            return Ok(None);
        };
        let raw = json!({
            "Args": [],
            "Config": serde_json::to_value(&container.config)?,
            "Created": container.created.to_rfc3339(),
            "ID": id.as_str(),
            "Image": fake_id().as_str(),
            "NetworkSettings": {
                "Bridge": "",
                "Gateway": "",
                "IPAddress": "",
                "IPPrefixLen": 0,
                "PortMapping": null,
            },
            "Path": container.config.cmd.first().map_or("bash", String::as_str),
            "ResolvConfPath": "/etc/resolv.conf",
            "State": {
                "ExitCode": 0,
                "Ghost": false,
                "Pid": 0,
                "Running": container.running,
                "StartedAt": container.started_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            },
            "SysInitPath": "/tmp/docker",
            "Volumes": {},
        });
        from_daemon(raw).map(Some)
    }

    fn inspect_image(&self, name: &str) -> Result<Option<ImageInspect>> {
        if name.is_empty() {
            return Ok(None);
        }
        from_daemon(json!({
            "id": fake_id().as_str(),
            "container_config": {"Cmd": null},
        }))
        .map(Some)
    }

    fn stop_container(&self, id: &ContainerId, _timeout_secs: Option<u32>) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(container) = state.containers.get_mut(id) else {
            return Ok(false);
        };
        container.running = false;
        Ok(true)
    }

    fn destroy_container(&self, id: &ContainerId) -> Result<bool> {
        Ok(self.lock()?.containers.remove(id).is_some())
    }

    fn pull_repository(&self, image: &str) -> Result<bool> {
        let mut state = self.lock()?;
        state.pulls.push(image.to_string());
        Ok(!state.failing_pulls)
    }

    fn container_logs(&self, id: &ContainerId) -> Result<Option<String>> {
        let state = self.lock()?;
        Ok(state
            .containers
            .contains_key(id)
            .then(|| FAKE_LOGS.to_string()))
    }

    fn registry_port(&self) -> Result<Option<u16>> {
        Ok(Some(constants::FAKE_REGISTRY_PORT))
    }
}

/// Generates a 64-character lower-case alphanumeric id.
fn fake_id() -> ContainerId {
    let id = format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    debug_assert_eq!(id.len(), constants::FAKE_ID_LENGTH);
    ContainerId::new(id)
}

/// Runs a daemon-cased value through the same decoding as real replies.
fn from_daemon<T: DeserializeOwned>(raw: Value) -> Result<T> {
    Ok(serde_json::from_value(normalize(raw))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(client: &FakeClient, name: &str) -> ContainerId {
        client
            .create_container(&CreateOptions::new().hostname(name).image("ubuntu"))
            .unwrap()
            .expect("create succeeds")
    }

    #[test]
    fn ids_are_64_lowercase_alphanumerics() {
        let client = FakeClient::new();
        let id = create(&client, "a");
        assert_eq!(id.as_str().len(), 64);
        assert!(
            id.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn create_stores_merged_config() {
        let client = FakeClient::new();
        let id = client
            .create_container(&CreateOptions::new().hostname("web1").cmd(vec!["top".into()]))
            .unwrap()
            .unwrap();
        let info = client.inspect_container(&id).unwrap().unwrap();
        assert_eq!(info.config.hostname, "web1");
        assert_eq!(info.config.cmd, vec!["top"]);
        assert!(info.config.tty);
        assert_eq!(info.config.image, "ubuntu");
        assert_eq!(info.id, id.as_str());
    }

    #[test]
    fn start_and_stop_flip_running_flag() {
        let client = FakeClient::new();
        let id = create(&client, "web1");
        assert!(!client.inspect_container(&id).unwrap().unwrap().state.running);

        assert!(client.start_container(&id).unwrap());
        let info = client.inspect_container(&id).unwrap().unwrap();
        assert!(info.state.running);
        assert!(!info.state.started_at.is_empty());

        assert!(client.stop_container(&id, None).unwrap());
        assert!(!client.inspect_container(&id).unwrap().unwrap().state.running);
    }

    #[test]
    fn list_filters_stopped_unless_all() {
        let client = FakeClient::new();
        let running = create(&client, "a");
        let _stopped = create(&client, "b");
        assert!(client.start_container(&running).unwrap());

        assert_eq!(client.list_containers(true).unwrap().len(), 2);
        let only_running = client.list_containers(false).unwrap();
        assert_eq!(only_running.len(), 1);
        assert_eq!(only_running[0].container_id(), running);
    }

    #[test]
    fn unknown_ids_report_failure() {
        let client = FakeClient::new();
        let ghost = ContainerId::new("missing");
        assert!(!client.start_container(&ghost).unwrap());
        assert!(!client.stop_container(&ghost, None).unwrap());
        assert!(!client.destroy_container(&ghost).unwrap());
        assert!(client.inspect_container(&ghost).unwrap().is_none());
        assert!(client.container_logs(&ghost).unwrap().is_none());
    }

    #[test]
    fn destroy_removes_container() {
        let client = FakeClient::new();
        let id = create(&client, "a");
        assert!(client.destroy_container(&id).unwrap());
        assert_eq!(client.container_count().unwrap(), 0);
        assert!(client.inspect_container(&id).unwrap().is_none());
    }

    #[test]
    fn injected_create_failures_are_consumed() {
        let client = FakeClient::new();
        client.fail_next_creates(1).unwrap();
        assert!(client.create_container(&CreateOptions::new()).unwrap().is_none());
        assert!(client.create_container(&CreateOptions::new()).unwrap().is_some());
    }

    #[test]
    fn pulls_are_recorded_and_can_fail() {
        let client = FakeClient::new();
        assert!(client.pull_repository("busybox").unwrap());
        client.fail_pulls(true).unwrap();
        assert!(!client.pull_repository("nosuch").unwrap());
        assert_eq!(client.pulled_images().unwrap(), vec!["busybox", "nosuch"]);
    }

    #[test]
    fn logs_and_registry_port() {
        let client = FakeClient::new();
        let id = create(&client, "a");
        assert!(client.container_logs(&id).unwrap().unwrap().contains("Lorem ipsum"));
        assert_eq!(client.registry_port().unwrap(), Some(5042));
    }

    #[test]
    fn image_inspect_has_empty_command() {
        let client = FakeClient::new();
        let image = client.inspect_image("ubuntu").unwrap().unwrap();
        assert!(image.container_config.unwrap().cmd.is_empty());
    }

    #[test]
    fn ping_always_answers() {
        assert!(FakeClient::new().ping().is_ok());
    }
}
