//! Outbound HTTP capability for arbitrary owning types.
//!
//! # Overview
//! A type that stores an [`HttpState`] and implements the two accessors of
//! [`HasHttpRequest`] gains `get`, `post` and `request`. The client is built
//! lazily from the owner's configuration, requests go out through a blocking
//! [`Transport`], and response bodies are decoded by `Content-Type` into a
//! [`DecodedResponse`].
//!
//! # Design
//! - [`ClientConfig`] fields are declared per owner; undeclared fields fall
//!   back to fixed defaults instead of failing.
//! - Extra transport options merge last and override the base fields.
//! - JSON and XML bodies both decode into an ordered `serde_json::Value`.
//! - Every failure is returned to the caller as [`Error`]; nothing is retried
//!   or logged on the failure path.
//!
//! ```no_run
//! use http_support::{ClientConfig, HasHttpRequest, HttpState, Options};
//!
//! struct Weather {
//!     http: HttpState,
//! }
//!
//! impl HasHttpRequest for Weather {
//!     fn http_state(&self) -> &HttpState {
//!         &self.http
//!     }
//!
//!     fn http_state_mut(&mut self) -> &mut HttpState {
//!         &mut self.http
//!     }
//! }
//!
//! # fn main() -> http_support::Result<()> {
//! let mut weather = Weather { http: HttpState::new(ClientConfig::full()) };
//! weather.set_base_uri("https://api.weather.test/v1")?.set_timeout(2.0);
//! let forecast = weather.get("/forecast", Options::new(), Options::new())?;
//! println!("{:?}", forecast.into_value());
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod log;
pub mod mapping;
pub mod transport;

pub use capability::{HasHttpRequest, HttpState, Payload};
pub use config::ClientConfig;
pub use decode::{unwrap_response, DecodedResponse};
pub use error::{DecodeError, Error, Result, TransportError};
pub use http::{HttpMethod, HttpResponse, Options, OutboundRequest};
pub use log::{Level, Logger, TracingLogger};
pub use mapping::ToMapping;
pub use transport::{Transport, UreqTransport};
