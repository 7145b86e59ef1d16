//! HTTP request and response values passed between the executor and a
//! [`crate::Transport`].
//!
//! # Design
//! Requests and responses are plain data. The executor builds an
//! `OutboundRequest` per call and never keeps it; the transport turns it into
//! network I/O and reports back an `HttpResponse` with the body already read
//! into memory. Options are a JSON object so arbitrary transport options can
//! ride along next to the well-known ones.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Free-form option mapping. Insertion order is preserved.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    /// Case-insensitive, so `"get"` and `"GET"` are the same verb.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(Error::Configuration(format!("unsupported HTTP method: {other}"))),
        }
    }
}

/// A single request handed to a transport.
///
/// `endpoint` is either absolute or relative to the client's `base_uri`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub endpoint: String,
    pub options: Options,
}

/// An HTTP response with its body fully read.
///
/// The body is kept as received; it need not be valid UTF-8.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// The body as text, with invalid UTF-8 sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Values of every header named `name`, joined with `", "`.
    ///
    /// Header names compare case-insensitively. Returns an empty string when
    /// the header is absent.
    pub fn header_line(&self, name: &str) -> String {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
