//! The `HasHttpRequest` capability.
//!
//! # Design
//! An owning type stores one [`HttpState`] and implements the two accessor
//! methods of [`HasHttpRequest`]; every other method is provided. The client
//! handle is built lazily inside a `OnceLock`, so concurrent first requests
//! still produce a single client. A client built from configuration is
//! dropped whenever the configuration changes and rebuilt on the next
//! request; a client injected with `set_http_client` stays until replaced.

use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::config::ClientConfig;
use crate::decode::{self, DecodedResponse};
use crate::error::Result;
use crate::http::{HttpMethod, HttpResponse, Options, OutboundRequest};
use crate::transport::{Transport, UreqTransport};

/// Per-owner configuration and client handle.
#[derive(Debug, Default)]
pub struct HttpState {
    config: ClientConfig,
    client: OnceLock<Arc<dyn Transport>>,
    injected: bool,
}

impl HttpState {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            client: OnceLock::new(),
            injected: false,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Drop a client that was built from the previous configuration.
    fn invalidate(&mut self) {
        if !self.injected && self.client.take().is_some() {
            tracing::debug!("configuration changed, default HTTP client will be rebuilt");
        }
    }
}

/// A POST payload. A mapping or a list is form encoded; anything else is
/// sent raw.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Form(Options),
    Raw(String),
}

impl From<Options> for Payload {
    fn from(form: Options) -> Self {
        Payload::Form(form)
    }
}

impl From<String> for Payload {
    fn from(raw: String) -> Self {
        Payload::Raw(raw)
    }
}

impl From<&str> for Payload {
    fn from(raw: &str) -> Self {
        Payload::Raw(raw.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(form) => Payload::Form(form),
            Value::Array(items) => Payload::Form(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), item))
                    .collect(),
            ),
            Value::String(raw) => Payload::Raw(raw),
            Value::Null => Payload::Raw(String::new()),
            other => Payload::Raw(other.to_string()),
        }
    }
}

/// Outbound HTTP behavior for any type that owns an [`HttpState`].
pub trait HasHttpRequest {
    fn http_state(&self) -> &HttpState;

    fn http_state_mut(&mut self) -> &mut HttpState;

    /// GET `endpoint` with the given query parameters and headers.
    fn get(&self, endpoint: &str, query: Options, headers: Options) -> Result<DecodedResponse> {
        let mut options = Options::new();
        options.insert("headers".to_string(), Value::Object(headers));
        options.insert("query".to_string(), Value::Object(query));
        self.request(HttpMethod::Get, endpoint, options)
    }

    /// POST `data` to `endpoint`. A form payload goes under `form_params`, a
    /// raw payload under `body`; the other key is removed from `options`.
    fn post(
        &self,
        endpoint: &str,
        data: impl Into<Payload>,
        mut options: Options,
    ) -> Result<DecodedResponse> {
        match data.into() {
            Payload::Form(form) => {
                options.remove("body");
                options.insert("form_params".to_string(), Value::Object(form));
            }
            Payload::Raw(raw) => {
                options.remove("form_params");
                options.insert("body".to_string(), Value::String(raw));
            }
        }
        self.request(HttpMethod::Post, endpoint, options)
    }

    /// Send one request through the current client and decode the response.
    ///
    /// Transport failures are returned as they are; nothing is retried.
    fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        options: Options,
    ) -> Result<DecodedResponse> {
        let request = OutboundRequest {
            method,
            endpoint: endpoint.to_string(),
            options,
        };
        let response = self.get_http_client().send(&request)?;
        self.unwrap_response(response)
    }

    fn set_http_client(&mut self, client: Arc<dyn Transport>) -> &mut Self {
        let state = self.http_state_mut();
        state.client = OnceLock::from(client);
        state.injected = true;
        self
    }

    /// The current client, built with [`get_default_http_client`] on first
    /// use. Repeated calls return the same instance.
    ///
    /// [`get_default_http_client`]: HasHttpRequest::get_default_http_client
    fn get_http_client(&self) -> Arc<dyn Transport> {
        let client = self
            .http_state()
            .client
            .get_or_init(|| self.get_default_http_client());
        Arc::clone(client)
    }

    /// Build a fresh client from [`get_options`](HasHttpRequest::get_options).
    fn get_default_http_client(&self) -> Arc<dyn Transport> {
        Arc::new(UreqTransport::new(self.get_options()))
    }

    /// Keep only `scheme://host[:port]` of `url`. Ignored when the owner does
    /// not declare a base URI.
    fn set_base_uri(&mut self, url: &str) -> Result<&mut Self> {
        let state = self.http_state_mut();
        if state.config.set_base_uri(url)? {
            state.invalidate();
        }
        Ok(self)
    }

    fn get_base_uri(&self) -> &str {
        self.http_state().config.base_uri()
    }

    fn set_timeout(&mut self, timeout: f64) -> &mut Self {
        let state = self.http_state_mut();
        if state.config.set_timeout(timeout) {
            state.invalidate();
        }
        self
    }

    fn get_timeout(&self) -> f64 {
        self.http_state().config.timeout()
    }

    fn set_connect_timeout(&mut self, connect_timeout: f64) -> &mut Self {
        let state = self.http_state_mut();
        if state.config.set_connect_timeout(connect_timeout) {
            state.invalidate();
        }
        self
    }

    fn get_connect_timeout(&self) -> f64 {
        self.http_state().config.connect_timeout()
    }

    fn get_options(&self) -> Options {
        self.http_state().config.options()
    }

    fn set_options(&mut self, options: Options) -> &mut Self {
        self.set_http_options(options)
    }

    fn get_http_options(&self) -> &Options {
        self.http_state().config.http_options()
    }

    /// Replace the extra-options bag.
    fn set_http_options(&mut self, options: Options) -> &mut Self {
        let state = self.http_state_mut();
        state.config.set_http_options(options);
        state.invalidate();
        self
    }

    fn unwrap_response(&self, response: HttpResponse) -> Result<DecodedResponse> {
        decode::unwrap_response(response)
    }
}
