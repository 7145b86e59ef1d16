//! The client seam and its default blocking implementation.
//!
//! # Design
//! `Transport` is the only thing the request executor knows about the
//! network. `UreqTransport` is built once from the resolved option map and
//! keeps those options as per-client defaults; every request's options are
//! merged over them before the request is assembled. Non-2xx statuses are
//! turned into errors here (controlled by `http_errors`), so the executor
//! itself never branches on status codes.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::RequestBuilder;
use url::Url;

use crate::error::{Error, Result, TransportError};
use crate::http::{HttpMethod, HttpResponse, Options, OutboundRequest};

/// Options `UreqTransport` acts on. Anything else is carried but ignored.
const KNOWN_OPTIONS: &[&str] = &[
    "base_uri",
    "timeout",
    "connect_timeout",
    "headers",
    "query",
    "body",
    "form_params",
    "json",
    "http_errors",
    "max_body_size",
];

/// Response bodies larger than this fail unless `max_body_size` says otherwise.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 64 * 1024 * 1024;

/// Executes outbound requests.
///
/// Implementations block until the full response body has been read.
pub trait Transport: Send + Sync + fmt::Debug {
    fn send(&self, request: &OutboundRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a `ureq::Agent`.
pub struct UreqTransport {
    agent: ureq::Agent,
    defaults: Options,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    /// Build an agent from `defaults`.
    ///
    /// `timeout` and `connect_timeout` are read as seconds; a missing,
    /// non-numeric or non-positive value means no deadline.
    pub fn new(defaults: Options) -> Self {
        let timeout = seconds(defaults.get("timeout"));
        let connect_timeout = seconds(defaults.get("connect_timeout"));
        tracing::debug!(?timeout, ?connect_timeout, "building HTTP agent");

        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .timeout_connect(connect_timeout)
            .build()
            .new_agent();

        Self { agent, defaults }
    }

    pub fn defaults(&self) -> &Options {
        &self.defaults
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &OutboundRequest) -> Result<HttpResponse> {
        let options = merge_options(&self.defaults, &request.options);
        for key in options.keys().filter(|k| !KNOWN_OPTIONS.contains(&k.as_str())) {
            tracing::trace!(option = %key, "ignoring unsupported transport option");
        }

        let base_uri = options.get("base_uri").and_then(Value::as_str).unwrap_or("");
        let url = resolve_url(base_uri, &request.endpoint)?;
        let headers = options.get("headers").map(header_pairs).unwrap_or_default();
        let query = options.get("query").map(value_pairs).unwrap_or_default();
        let body = RequestBody::from_options(&options)?;

        tracing::debug!(method = %request.method, %url, "sending request");

        let agent = &self.agent;
        let uri = url.as_str();
        let result = match request.method {
            HttpMethod::Get => send_without_body(agent.get(uri), &headers, &query, body),
            HttpMethod::Delete => send_without_body(agent.delete(uri), &headers, &query, body),
            HttpMethod::Head => send_without_body(agent.head(uri), &headers, &query, body),
            HttpMethod::Options => send_without_body(agent.options(uri), &headers, &query, body),
            HttpMethod::Post => send_with_body(agent.post(uri), &headers, &query, body),
            HttpMethod::Put => send_with_body(agent.put(uri), &headers, &query, body),
            HttpMethod::Patch => send_with_body(agent.patch(uri), &headers, &query, body),
        };
        let mut response = result?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let limit = options
            .get("max_body_size")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_MAX_BODY_SIZE);
        let body = response.body_mut().with_config().limit(limit).read_to_vec()?;
        tracing::debug!(status, bytes = body.len(), "received response");

        let response = HttpResponse {
            status,
            headers,
            body,
        };

        let http_errors = options
            .get("http_errors")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        if http_errors && !response.is_success() {
            return Err(TransportError::Status {
                status: response.status,
                body: response.text().into_owned(),
            }
            .into());
        }
        Ok(response)
    }
}

/// At most one body source per request.
#[derive(Debug, Clone, PartialEq)]
enum RequestBody {
    None,
    Raw(String),
    Form(Vec<(String, String)>),
    Json(Vec<u8>),
}

impl RequestBody {
    fn from_options(options: &Options) -> Result<Self> {
        let present: Vec<&str> = ["body", "form_params", "json"]
            .into_iter()
            .filter(|key| options.contains_key(*key))
            .collect();
        if present.len() > 1 {
            return Err(Error::Configuration(format!(
                "conflicting body options: {}",
                present.join(", ")
            )));
        }

        if let Some(body) = options.get("body") {
            let raw = match body {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            return Ok(RequestBody::Raw(raw));
        }
        if let Some(form) = options.get("form_params") {
            return Ok(RequestBody::Form(value_pairs(form)));
        }
        if let Some(json) = options.get("json") {
            let bytes = serde_json::to_vec(json)
                .map_err(|e| Error::Serialization(format!("unserializable json option: {e}")))?;
            return Ok(RequestBody::Json(bytes));
        }
        Ok(RequestBody::None)
    }
}

fn send_without_body(
    builder: RequestBuilder<WithoutBody>,
    headers: &[(String, String)],
    query: &[(String, String)],
    body: RequestBody,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = prepare(builder, headers, query);
    match body {
        RequestBody::None => builder.call(),
        body => finish_body(builder.force_send_body(), headers, body),
    }
}

fn send_with_body(
    builder: RequestBuilder<WithBody>,
    headers: &[(String, String)],
    query: &[(String, String)],
    body: RequestBody,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = prepare(builder, headers, query);
    finish_body(builder, headers, body)
}

fn prepare<B>(
    mut builder: RequestBuilder<B>,
    headers: &[(String, String)],
    query: &[(String, String)],
) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (key, value) in query {
        builder = builder.query(key, value);
    }
    builder
}

fn finish_body(
    builder: RequestBuilder<WithBody>,
    headers: &[(String, String)],
    body: RequestBody,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        RequestBody::None => builder.send_empty(),
        RequestBody::Raw(raw) => builder.send(raw.as_bytes()),
        RequestBody::Form(pairs) => {
            builder.send_form(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        }
        RequestBody::Json(bytes) => {
            let has_content_type = headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
            if has_content_type {
                builder.send(&bytes[..])
            } else {
                builder.content_type("application/json").send(&bytes[..])
            }
        }
    }
}

fn seconds(value: Option<&Value>) -> Option<Duration> {
    value
        .and_then(Value::as_f64)
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(Duration::from_secs_f64)
}

/// Request options over client defaults. Top-level keys are replaced, except
/// `headers`, which are merged name by name. Header names compare
/// case-insensitively and the request's spelling is kept.
pub fn merge_options(defaults: &Options, request: &Options) -> Options {
    let mut merged = defaults.clone();
    for (key, value) in request {
        if key == "headers" {
            if let (Some(Value::Object(current)), Value::Object(extra)) =
                (merged.get_mut(key), value)
            {
                for (name, header) in extra {
                    let shadowed: Vec<String> = current
                        .keys()
                        .filter(|k| k.eq_ignore_ascii_case(name))
                        .cloned()
                        .collect();
                    for k in shadowed {
                        current.remove(&k);
                    }
                    current.insert(name.clone(), header.clone());
                }
                continue;
            }
        }
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Resolve `endpoint` against `base_uri` using RFC 3986 reference resolution.
pub fn resolve_url(base_uri: &str, endpoint: &str) -> Result<Url> {
    match Url::parse(endpoint) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            if base_uri.is_empty() {
                return Err(Error::Configuration(format!(
                    "relative endpoint {endpoint:?} requires a base URI"
                )));
            }
            let base = Url::parse(base_uri)
                .map_err(|e| Error::Configuration(format!("invalid base URI {base_uri:?}: {e}")))?;
            base.join(endpoint)
                .map_err(|e| Error::Configuration(format!("invalid endpoint {endpoint:?}: {e}")))
        }
        Err(e) => Err(Error::Configuration(format!(
            "invalid endpoint {endpoint:?}: {e}"
        ))),
    }
}

/// Header option to name/value pairs. A list value sends the header once per
/// element.
fn header_pairs(headers: &Value) -> Vec<(String, String)> {
    let Value::Object(headers) = headers else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    for (name, value) in headers {
        match value {
            Value::Array(values) => {
                for v in values {
                    pairs.push((name.clone(), scalar_to_string(v)));
                }
            }
            Value::Null => {}
            v => pairs.push((name.clone(), scalar_to_string(v))),
        }
    }
    pairs
}

/// Flatten a query or form mapping into key/value pairs, nesting with
/// brackets: `{"a": {"b": 1}, "c": [x, y]}` gives `a[b]=1&c[0]=x&c[1]=y`.
/// A string value is read as an already encoded query string.
pub fn value_pairs(value: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                flatten_into(key.clone(), v, &mut pairs);
            }
        }
        Value::String(encoded) => {
            pairs.extend(
                url::form_urlencoded::parse(encoded.trim_start_matches('?').as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned())),
            );
        }
        _ => {}
    }
    pairs
}

fn flatten_into(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(format!("{prefix}[{i}]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_into(format!("{prefix}[{key}]"), item, pairs);
            }
        }
        scalar => pairs.push((prefix, scalar_to_string(scalar))),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
