//! Error types for the HTTP capability.
//!
//! # Design
//! Failures are split by the stage that produced them. `Transport` covers
//! everything between handing a request to the client and receiving a full
//! response. `Decode` covers a body that does not parse as the format its
//! `Content-Type` declares. `Configuration` covers inputs that can never
//! produce a valid request, such as a base address without a host.
//! `Serialization` covers values that cannot be turned into a mapping or a
//! JSON document.
//!
//! Nothing here is recovered locally; every variant reaches the caller.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the request executor and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be completed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body does not match its declared content type.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The configured options cannot produce a valid request.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A value could not be serialized into the requested shape.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Failures raised while talking to the remote end.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS resolution or the TCP/TLS connect failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// The connect or total deadline expired.
    #[error("request timeout")]
    Timeout,

    /// The server answered with a non-2xx status and `http_errors` is on.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(String),
}

/// Failures raised while turning a body into a [`crate::DecodedResponse`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML body: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for DecodeError {
    fn from(err: quick_xml::Error) -> Self {
        DecodeError::Xml(err.to_string())
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => TransportError::Timeout.into(),
            ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
                TransportError::Connection(err.to_string()).into()
            }
            ureq::Error::StatusCode(status) => TransportError::Status {
                status,
                body: String::new(),
            }
            .into(),
            ureq::Error::BadUri(msg) => Error::Configuration(msg),
            ureq::Error::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::TimedOut => TransportError::Timeout.into(),
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::NotConnected => {
                    TransportError::Connection(io_err.to_string()).into()
                }
                _ => TransportError::Other(io_err.to_string()).into(),
            },
            other => TransportError::Other(other.to_string()).into(),
        }
    }
}
