//! Connections to the daemon.
//!
//! A transport performs exactly one HTTP exchange per call and never keeps
//! a connection around afterwards. The endpoint scheme picks the
//! implementation: `tcp://` and `http://` go over loopback TCP, `unix://`
//! (or a bare absolute path) over a local domain socket.

use std::path::PathBuf;

use dockvisor_common::error::{DockvisorError, Result};
use http::{Method, StatusCode};

/// Port the daemon listens on when the endpoint omits one.
const DEFAULT_TCP_PORT: u16 = 4243;

/// An undecoded daemon response with its body fully drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Value of the `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Complete response body.
    pub body: Vec<u8>,
}

/// One request/response exchange with the daemon.
pub trait Transport: Send + Sync {
    /// Sends a request and blocks until the whole response body has arrived.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the daemon cannot be reached and `Protocol`
    /// if the reply is not well-framed HTTP.
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
        headers: &[(&str, &str)],
    ) -> Result<RawResponse>;

    /// Returns the endpoint string this transport dials.
    fn endpoint(&self) -> &str;
}

/// Parsed daemon endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Loopback (or other) TCP address.
    Tcp {
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// Local domain socket path.
    Unix(PathBuf),
}

impl Endpoint {
    /// Parses an endpoint string.
    ///
    /// # Errors
    ///
    /// Returns `Config` for unknown schemes, empty hosts, or invalid ports.
    pub fn parse(endpoint: &str) -> Result<Self> {
        let endpoint = endpoint.trim();
        if let Some(path) = endpoint.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(config_error(format!("empty socket path in {endpoint}")));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if endpoint.starts_with('/') {
            return Ok(Self::Unix(PathBuf::from(endpoint)));
        }
        let rest = endpoint
            .strip_prefix("tcp://")
            .or_else(|| endpoint.strip_prefix("http://"))
            .ok_or_else(|| config_error(format!("unsupported endpoint scheme: {endpoint}")))?;
        let authority = rest.trim_end_matches('/');
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| config_error(format!("invalid port in endpoint {endpoint}")))?;
                (host, port)
            }
            None => (authority, DEFAULT_TCP_PORT),
        };
        if host.is_empty() {
            return Err(config_error(format!("empty host in endpoint {endpoint}")));
        }
        Ok(Self::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

/// Builds the transport selected by the endpoint's scheme.
///
/// # Errors
///
/// Returns an error if the endpoint is invalid or the HTTP client cannot
/// be constructed.
pub fn connect(endpoint: &str) -> Result<Box<dyn Transport>> {
    match Endpoint::parse(endpoint)? {
        Endpoint::Tcp { host, port } => Ok(Box::new(TcpTransport::new(endpoint, &host, port)?)),
        #[cfg(unix)]
        Endpoint::Unix(path) => Ok(Box::new(UnixTransport::new(endpoint, path)?)),
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(config_error(
            "domain socket endpoints require a Unix host".into(),
        )),
    }
}

/// HTTP over TCP using a blocking `reqwest` client with pooling disabled.
pub struct TcpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
    endpoint: String,
}

impl TcpTransport {
    /// Creates a transport for `host:port`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the underlying HTTP client cannot be built.
    pub fn new(endpoint: &str, host: &str, port: u16) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| config_error(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: format!("http://{host}:{port}"),
            endpoint: endpoint.to_string(),
        })
    }

    fn map_error(&self, err: reqwest::Error) -> DockvisorError {
        if err.is_connect() || err.is_timeout() {
            DockvisorError::Connection {
                endpoint: self.endpoint.clone(),
                source: std::io::Error::other(err),
            }
        } else {
            DockvisorError::Protocol {
                message: err.to_string(),
            }
        }
    }
}

impl Transport for TcpTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
        headers: &[(&str, &str)],
    ) -> Result<RawResponse> {
        tracing::debug!(%method, path, endpoint = %self.endpoint, "daemon request");
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header(http::header::CONNECTION, "close");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = request.send().map_err(|e| self.map_error(e))?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().map_err(|e| self.map_error(e))?.to_vec();
        tracing::debug!(%status, bytes = body.len(), "daemon response");

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// HTTP/1.1 over a local domain socket, one connection per request.
///
/// The exchange runs on a private single-threaded runtime so callers keep
/// the blocking [`Transport`] contract.
#[cfg(unix)]
pub struct UnixTransport {
    socket_path: PathBuf,
    endpoint: String,
    runtime: tokio::runtime::Runtime,
}

#[cfg(unix)]
impl UnixTransport {
    /// Creates a transport for the socket at `socket_path`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the runtime backing the connection cannot be built.
    pub fn new(endpoint: &str, socket_path: PathBuf) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
            .map_err(|e| DockvisorError::Io {
                path: socket_path.clone(),
                source: e,
            })?;
        Ok(Self {
            socket_path,
            endpoint: endpoint.to_string(),
            runtime,
        })
    }

    async fn exchange(
        &self,
        request: http::Request<http_body_util::Full<hyper::body::Bytes>>,
    ) -> Result<RawResponse> {
        use http_body_util::BodyExt;
        use hyper_util::rt::TokioIo;

        let stream = tokio::net::UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| DockvisorError::Connection {
                endpoint: self.endpoint.clone(),
                source: e,
            })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(protocol_error)?;
        let connection = tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "daemon connection closed with error");
            }
        });

        let response = sender.send_request(request).await.map_err(protocol_error)?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(protocol_error)?
            .to_bytes()
            .to_vec();
        connection.abort();

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(unix)]
impl Transport for UnixTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
        headers: &[(&str, &str)],
    ) -> Result<RawResponse> {
        tracing::debug!(%method, path, socket = %self.socket_path.display(), "daemon request");
        let mut builder = http::Request::builder()
            .method(method)
            .uri(path)
            .header(http::header::HOST, "localhost")
            .header(http::header::CONNECTION, "close");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(http_body_util::Full::new(hyper::body::Bytes::copy_from_slice(
                body.unwrap_or_default(),
            )))
            .map_err(protocol_error)?;

        let response = self.runtime.block_on(self.exchange(request))?;
        tracing::debug!(status = %response.status, bytes = response.body.len(), "daemon response");
        Ok(response)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(unix)]
fn protocol_error(err: impl std::fmt::Display) -> DockvisorError {
    DockvisorError::Protocol {
        message: err.to_string(),
    }
}

fn config_error(message: String) -> DockvisorError {
    DockvisorError::Config { message }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::thread::JoinHandle;

    use super::*;

    /// Reads one request off `stream` and answers with `reply`.
    fn serve_once<S: Read + Write>(stream: S, reply: &str) -> String {
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            let _ = reader.read_line(&mut line).expect("read request line");
            if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = v.trim().parse().expect("length");
            }
            head.push_str(&line);
            if line == "\r\n" || line.is_empty() {
                break;
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).expect("read body");
        head.push_str(&String::from_utf8_lossy(&body));
        reader.get_mut().write_all(reply.as_bytes()).expect("write reply");
        head
    }

    fn tcp_server(reply: &'static str) -> (u16, JoinHandle<String>) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            serve_once(stream, reply)
        });
        (port, handle)
    }

    #[test]
    fn parse_tcp_endpoint() {
        assert_eq!(
            Endpoint::parse("tcp://127.0.0.1:4243").unwrap(),
            Endpoint::Tcp {
                host: "127.0.0.1".into(),
                port: 4243
            }
        );
    }

    #[test]
    fn parse_http_endpoint_without_port_uses_default() {
        assert_eq!(
            Endpoint::parse("http://localhost").unwrap(),
            Endpoint::Tcp {
                host: "localhost".into(),
                port: DEFAULT_TCP_PORT
            }
        );
    }

    #[test]
    fn parse_unix_endpoints() {
        assert_eq!(
            Endpoint::parse("unix:///var/run/docker.sock").unwrap(),
            Endpoint::Unix(PathBuf::from("/var/run/docker.sock"))
        );
        assert_eq!(
            Endpoint::parse("/run/docker.sock").unwrap(),
            Endpoint::Unix(PathBuf::from("/run/docker.sock"))
        );
    }

    #[test]
    fn parse_rejects_unknown_scheme_and_bad_port() {
        assert!(Endpoint::parse("https://example.com").is_err());
        assert!(Endpoint::parse("tcp://127.0.0.1:notaport").is_err());
        assert!(Endpoint::parse("unix://").is_err());
    }

    #[test]
    fn tcp_transport_round_trip() {
        let (port, server) = tcp_server(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n[]",
        );
        let endpoint = format!("tcp://127.0.0.1:{port}");
        let transport = connect(&endpoint).expect("connect");

        let resp = transport
            .request(Method::GET, "/v1.4/containers/ps?all=1&limit=50", None, &[])
            .expect("request");
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.content_type.as_deref(), Some("application/json"));
        assert_eq!(resp.body, b"[]");

        let request = server.join().expect("server thread");
        assert!(request.starts_with("GET /v1.4/containers/ps?all=1&limit=50 HTTP/1.1"));
    }

    #[test]
    fn tcp_transport_refused_is_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let transport = connect(&format!("tcp://127.0.0.1:{port}")).expect("connect");
        let err = transport
            .request(Method::GET, "/v1.4/containers/ps", None, &[])
            .unwrap_err();
        assert!(err.is_connection(), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn unix_transport_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("daemon.sock");
        let listener = std::os::unix::net::UnixListener::bind(&socket).expect("bind");
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            serve_once(
                stream,
                "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\n\r\n{\"Id\":\"abc\"}",
            )
        });

        let transport = connect(&format!("unix://{}", socket.display())).expect("connect");
        let resp = transport
            .request(
                Method::POST,
                "/v1.4/containers/create",
                Some(br#"{"Image":"ubuntu"}"#),
                &[("Content-Type", "application/json")],
            )
            .expect("request");
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.body, br#"{"Id":"abc"}"#);

        let request = server.join().expect("server thread");
        assert!(request.starts_with("POST /v1.4/containers/create HTTP/1.1"));
        assert!(request.ends_with(r#"{"Image":"ubuntu"}"#));
    }

    /// Serves `reply` on a fresh socket and returns the transport's result.
    #[cfg(unix)]
    fn unix_exchange(reply: &'static str) -> Result<RawResponse> {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("daemon.sock");
        let listener = std::os::unix::net::UnixListener::bind(&socket).expect("bind");
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let _ = serve_once(stream, reply);
        });
        let transport = connect(&format!("unix://{}", socket.display())).expect("connect");
        let result = transport.request(Method::GET, "/v1.4/containers/abc/json", None, &[]);
        server.join().expect("server thread");
        result
    }

    #[cfg(unix)]
    #[test]
    fn unix_transport_decodes_chunked_body() {
        let resp = unix_exchange(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\n[{\"a\r\n3\r\n\":1\r\n2\r\n}]\r\n0\r\n\r\n",
        )
        .expect("request");
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, br#"[{"a":1}]"#);
    }

    #[cfg(unix)]
    #[test]
    fn unix_transport_honours_content_length() {
        let resp = unix_exchange("HTTP/1.1 404 Not Found\r\nContent-Length: 5\r\n\r\nnope!")
            .expect("request");
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.body, b"nope!");
    }

    #[cfg(unix)]
    #[test]
    fn unix_transport_rejects_overflowing_chunk_size() {
        let err = unix_exchange(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1\r\na\r\nffffffffffffffff\r\n",
        )
        .unwrap_err();
        assert!(!err.is_connection(), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn unix_transport_rejects_oversized_content_length() {
        let err = unix_exchange(
            "HTTP/1.1 200 OK\r\nContent-Length: 18446744073709551615\r\n\r\nshort",
        )
        .unwrap_err();
        assert!(!err.is_connection(), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn unix_transport_rejects_non_http_reply() {
        assert!(unix_exchange("SSH-2.0-OpenSSH\r\n\r\n").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn unix_transport_missing_socket_is_connection_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport =
            connect(&format!("unix://{}", dir.path().join("absent.sock").display())).expect("connect");
        let err = transport
            .request(Method::GET, "/v1.4/containers/ps", None, &[])
            .unwrap_err();
        assert!(err.is_connection());
    }
}
