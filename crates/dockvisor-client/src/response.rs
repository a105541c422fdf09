//! Response decoding and key normalization.
//!
//! Daemon API versions disagree on key capitalization (`Id` vs `ID` vs
//! `id`), so every decoded mapping has its keys lower-cased once, here,
//! and callers rely on that single convention.

use std::cell::OnceCell;

use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::transport::RawResponse;

/// The only media type the decoder will attempt to parse.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A daemon response with lazily decoded, key-normalized JSON.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    content_type: Option<String>,
    body: Vec<u8>,
    decoded: OnceCell<Option<Value>>,
}

impl Response {
    /// Wraps a raw transport response.
    #[must_use]
    pub fn new(raw: RawResponse) -> Self {
        Self {
            status: raw.status,
            content_type: raw.content_type,
            body: raw.body,
            decoded: OnceCell::new(),
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns whether the response declared the JSON media type.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().map(str::trim) == Some(JSON_MEDIA_TYPE)
    }

    /// Returns the decoded body, or `None` when the content type is not
    /// JSON or the body does not parse.
    ///
    /// Decoding happens on first access only.
    pub fn json(&self) -> Option<&Value> {
        self.decoded
            .get_or_init(|| {
                if !self.is_json() {
                    return None;
                }
                match serde_json::from_slice::<Value>(&self.body) {
                    Ok(value) => Some(normalize(value)),
                    Err(e) => {
                        tracing::debug!(status = %self.status, error = %e, "undecodable JSON body");
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Decodes the normalized body into `T`, or `None` if any step fails.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.json()?.clone();
        serde_json::from_value(value)
            .map_err(|e| tracing::debug!(error = %e, "response does not match expected shape"))
            .ok()
    }
}

/// Lower-cases every mapping key, recursively.
///
/// Values and non-mapping structures pass through unchanged; lists are
/// walked element by element. Applying it twice gives the same result as
/// applying it once.
#[must_use]
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), normalize(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(content_type: Option<&str>, body: &str) -> Response {
        Response::new(RawResponse {
            status: StatusCode::OK,
            content_type: content_type.map(str::to_owned),
            body: body.as_bytes().to_vec(),
        })
    }

    #[test]
    fn json_body_keys_are_lowercased() {
        let resp = response(Some("application/json"), r#"{"Id": "ABCDEF"}"#);
        assert_eq!(resp.json(), Some(&json!({"id": "ABCDEF"})));
    }

    #[test]
    fn non_json_content_type_is_not_decoded() {
        let resp = response(Some("text/plain"), r#"{"Id": "ABCDEF"}"#);
        assert!(resp.json().is_none());
        assert_eq!(resp.text(), r#"{"Id": "ABCDEF"}"#);
    }

    #[test]
    fn missing_content_type_is_not_decoded() {
        assert!(response(None, "[]").json().is_none());
    }

    #[test]
    fn garbled_json_is_absent_not_an_error() {
        let resp = response(Some("application/json"), "{\"Id\": ");
        assert!(resp.json().is_none());
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn empty_json_body_is_absent() {
        assert!(response(Some("application/json"), "").json().is_none());
    }

    #[test]
    fn normalize_walks_nested_maps_and_lists() {
        let input = json!({
            "Config": {"Hostname": "web1", "Cmd": ["/bin/sh", "-C"]},
            "Items": [{"ID": 1}, {"Name": "X"}],
            "State": {"Running": true}
        });
        let expected = json!({
            "config": {"hostname": "web1", "cmd": ["/bin/sh", "-C"]},
            "items": [{"id": 1}, {"name": "X"}],
            "state": {"running": true}
        });
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn normalize_leaves_values_untouched() {
        let input = json!({"Image": "Ubuntu:Latest", "Env": ["PATH=/USR/bin"]});
        let out = normalize(input);
        assert_eq!(out["image"], "Ubuntu:Latest");
        assert_eq!(out["env"][0], "PATH=/USR/bin");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            json!({"A": {"B": [{"C": null}]}}),
            json!([{"Id": "x"}, 3, "Str", [{"K": true}]]),
            json!("PlainString"),
            json!({}),
        ];
        for input in inputs {
            let once = normalize(input);
            let twice = normalize(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn decode_into_typed_value() {
        #[derive(serde::Deserialize)]
        struct Created {
            id: String,
        }
        let resp = response(Some("application/json"), r#"{"ID": "c0ffee"}"#);
        let created: Created = resp.decode().expect("decodes");
        assert_eq!(created.id, "c0ffee");
    }
}
