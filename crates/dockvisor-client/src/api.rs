//! HTTP implementations of [`DaemonClient`], one per daemon API version.

use std::marker::PhantomData;

use dockvisor_common::constants;
use dockvisor_common::error::Result;
use dockvisor_common::types::{ApiVersion, ContainerId};
use http::{Method, StatusCode};
use serde_json::Value;

use crate::client::DaemonClient;
use crate::models::{
    ContainerConfig, ContainerInspect, ContainerSummary, CreateOptions, ImageInspect, ImageRef,
};
use crate::response::{JSON_MEDIA_TYPE, Response, normalize};
use crate::transport::{self, Transport};

/// Endpoint details that differ between daemon API versions.
pub trait ApiProfile: Send + Sync + 'static {
    /// Version this profile speaks.
    const VERSION: ApiVersion;
    /// Path prefix for every endpoint.
    const PREFIX: &'static str;
    /// Body the start endpoint requires, if any.
    const START_BODY: Option<&'static [u8]>;
}

/// Daemon API v1.3.
#[derive(Debug, Clone, Copy)]
pub struct ApiV13;

impl ApiProfile for ApiV13 {
    const VERSION: ApiVersion = ApiVersion::V1_3;
    const PREFIX: &'static str = "/v1.3";
    const START_BODY: Option<&'static [u8]> = None;
}

/// Daemon API v1.4, whose start endpoint expects a JSON body.
#[derive(Debug, Clone, Copy)]
pub struct ApiV14;

impl ApiProfile for ApiV14 {
    const VERSION: ApiVersion = ApiVersion::V1_4;
    const PREFIX: &'static str = "/v1.4";
    const START_BODY: Option<&'static [u8]> = Some(b"{}".as_slice());
}

/// Daemon client speaking API version `V` over a [`Transport`].
pub struct HttpClient<V: ApiProfile> {
    transport: Box<dyn Transport>,
    _version: PhantomData<fn() -> V>,
}

impl<V: ApiProfile> HttpClient<V> {
    /// Wraps an existing transport.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            _version: PhantomData,
        }
    }

    /// Builds a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid.
    pub fn connect(endpoint: &str) -> Result<Self> {
        Ok(Self::new(transport::connect(endpoint)?))
    }

    /// Returns the API version this client speaks.
    #[must_use]
    pub const fn version(&self) -> ApiVersion {
        V::VERSION
    }

    fn call(&self, method: Method, path: &str, body: Option<&[u8]>) -> Result<Response> {
        let path = format!("{}{path}", V::PREFIX);
        let headers: &[(&str, &str)] = if body.is_some() {
            &[("Content-Type", JSON_MEDIA_TYPE)]
        } else {
            &[]
        };
        let raw = self.transport.request(method, &path, body, headers)?;
        Ok(Response::new(raw))
    }
}

impl<V: ApiProfile> DaemonClient for HttpClient<V> {
    fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let path = format!(
            "/containers/ps?all={}&limit={}",
            u8::from(all),
            constants::LIST_LIMIT
        );
        let resp = self.call(Method::GET, &path, None)?;
        if resp.status() != StatusCode::OK {
            tracing::warn!(status = %resp.status(), "listing containers failed");
            return Ok(Vec::new());
        }
        Ok(resp.decode().unwrap_or_default())
    }

    fn create_container(&self, options: &CreateOptions) -> Result<Option<ContainerId>> {
        let config = ContainerConfig::with_overrides(options);
        let body = serde_json::to_vec(&config)?;
        let resp = self.call(Method::POST, "/containers/create", Some(&body))?;
        if resp.status() != StatusCode::CREATED {
            tracing::debug!(status = %resp.status(), image = %config.image, "create refused");
            return Ok(None);
        }
        // Some daemons answer create with a JSON body but no JSON content type.
        let decoded = resp.json().cloned().or_else(|| {
            serde_json::from_slice::<Value>(resp.body())
                .ok()
                .map(normalize)
        });
        let id = decoded
            .as_ref()
            .and_then(|v| v.get("id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(ContainerId::new);
        if let Some(id) = &id {
            tracing::info!(id = %id.short(), hostname = %config.hostname, "container created");
        }
        Ok(id)
    }

    fn start_container(&self, id: &ContainerId) -> Result<bool> {
        let path = format!("/containers/{id}/start");
        let resp = self.call(Method::POST, &path, V::START_BODY)?;
        Ok(matches!(
            resp.status(),
            StatusCode::OK | StatusCode::NO_CONTENT
        ))
    }

    fn inspect_container(&self, id: &ContainerId) -> Result<Option<ContainerInspect>> {
        if id.as_str().is_empty() {
            return Ok(None);
        }
        let resp = self.call(Method::GET, &format!("/containers/{id}/json"), None)?;
        if resp.status() != StatusCode::OK {
            return Ok(None);
        }
        Ok(resp.decode())
    }

    fn inspect_image(&self, name: &str) -> Result<Option<ImageInspect>> {
        if name.is_empty() {
            return Ok(None);
        }
        let resp = self.call(Method::GET, &format!("/images/{name}/json"), None)?;
        if resp.status() != StatusCode::OK {
            return Ok(None);
        }
        Ok(resp.decode())
    }

    fn stop_container(&self, id: &ContainerId, timeout_secs: Option<u32>) -> Result<bool> {
        let timeout = timeout_secs.unwrap_or(constants::DEFAULT_STOP_TIMEOUT_SECS);
        let path = format!("/containers/{id}/stop?t={timeout}");
        let resp = self.call(Method::POST, &path, None)?;
        Ok(resp.status() == StatusCode::NO_CONTENT)
    }

    fn destroy_container(&self, id: &ContainerId) -> Result<bool> {
        let resp = self.call(Method::DELETE, &format!("/containers/{id}"), None)?;
        Ok(resp.status() == StatusCode::NO_CONTENT)
    }

    fn pull_repository(&self, image: &str) -> Result<bool> {
        let image = ImageRef::parse(image);
        let mut path = format!(
            "/images/create?fromImage={}",
            urlencoding::encode(&image.repository)
        );
        if let Some(tag) = &image.tag {
            path.push_str("&tag=");
            path.push_str(&urlencoding::encode(tag));
        }
        tracing::info!(repository = %image.repository, tag = ?image.tag, "pulling image");
        // The transport has already drained the progress stream, so the
        // daemon has finished the pull by the time the status is read.
        let resp = self.call(Method::POST, &path, None)?;
        if resp.status() != StatusCode::OK {
            tracing::warn!(status = %resp.status(), repository = %image.repository, "pull failed");
            return Ok(false);
        }
        if let Some(message) = progress_error(resp.body()) {
            tracing::warn!(repository = %image.repository, error = %message, "pull reported an error");
            return Ok(false);
        }
        Ok(true)
    }

    fn container_logs(&self, id: &ContainerId) -> Result<Option<String>> {
        let path = format!("/containers/{id}/attach?logs=1&stream=0&stdout=1&stderr=1");
        let resp = self.call(Method::POST, &path, None)?;
        if resp.status() != StatusCode::OK {
            return Ok(None);
        }
        Ok(Some(resp.text()))
    }
}

/// Returns the first `error` message in a stream of pull progress events.
fn progress_error(body: &[u8]) -> Option<String> {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<Value>()
        .map_while(std::result::Result::ok)
        .map(normalize)
        .find_map(|event| {
            event
                .get("error")
                .map(|e| e.as_str().map_or_else(|| e.to_string(), str::to_owned))
        })
}
