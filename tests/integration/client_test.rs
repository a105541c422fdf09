//! Integration tests for the daemon client.
//!
//! These tests are implemented next to the code in `crates/dockvisor-client/src/`:
//!
//! Covered scenarios:
//! - `transport`: HTTP exchanges over a loopback `TcpListener` and a `UnixListener`,
//!   refused connections, missing sockets, Content-Length, chunked and
//!   read-to-EOF bodies, malformed framing
//! - `response`: JSON decoding gated on the exact media type, key normalization
//! - `api`: Per-version paths, status handling, pull progress errors
//! - `fake`: The in-memory double's id format and inspect shape
