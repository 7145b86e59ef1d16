//! Client configuration and option resolution.
//!
//! # Design
//! An owning type decides which configuration fields it cares about. Each of
//! `base_uri`, `timeout` and `connect_timeout` is either declared (`Some`) or
//! absent (`None`). Setters on an absent field are no-ops and getters fall
//! back to fixed defaults, so the same capability works for owners that never
//! talk to a fixed host as well as for owners with a full configuration.

use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::http::Options;

/// Total request deadline, in seconds, when the owner declares none.
pub const DEFAULT_TIMEOUT: f64 = 5.0;

/// Connect deadline, in seconds, when the owner declares none.
pub const DEFAULT_CONNECT_TIMEOUT: f64 = 3.0;

/// Declared configuration fields plus the extra-options bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    base_uri: Option<String>,
    timeout: Option<f64>,
    connect_timeout: Option<f64>,
    extra: Options,
}

impl ClientConfig {
    /// A configuration that declares no fields. Every getter returns its
    /// default and every field setter is ignored.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// A configuration that declares all three fields, starting from the
    /// defaults.
    pub fn full() -> Self {
        Self::minimal()
            .declare_base_uri()
            .declare_timeout(DEFAULT_TIMEOUT)
            .declare_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn declare_base_uri(mut self) -> Self {
        self.base_uri.get_or_insert_with(String::new);
        self
    }

    pub fn declare_timeout(mut self, initial: f64) -> Self {
        self.timeout = Some(initial);
        self
    }

    pub fn declare_connect_timeout(mut self, initial: f64) -> Self {
        self.connect_timeout = Some(initial);
        self
    }

    pub fn base_uri(&self) -> &str {
        self.base_uri.as_deref().unwrap_or("")
    }

    pub fn timeout(&self) -> f64 {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn connect_timeout(&self) -> f64 {
        self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Store `url` reduced to `scheme://host[:port]`.
    ///
    /// Returns `Ok(false)` without parsing when the field is not declared.
    pub fn set_base_uri(&mut self, url: &str) -> Result<bool> {
        let Some(slot) = self.base_uri.as_mut() else {
            return Ok(false);
        };
        *slot = normalize_base_uri(url)?;
        Ok(true)
    }

    /// Returns whether the field is declared and was updated.
    pub fn set_timeout(&mut self, timeout: f64) -> bool {
        match self.timeout.as_mut() {
            Some(slot) => {
                *slot = timeout;
                true
            }
            None => false,
        }
    }

    /// Returns whether the field is declared and was updated.
    pub fn set_connect_timeout(&mut self, connect_timeout: f64) -> bool {
        match self.connect_timeout.as_mut() {
            Some(slot) => {
                *slot = connect_timeout;
                true
            }
            None => false,
        }
    }

    pub fn http_options(&self) -> &Options {
        &self.extra
    }

    /// Replace the extra-options bag wholesale.
    pub fn set_http_options(&mut self, options: Options) {
        self.extra = options;
    }

    /// Effective options: the three base fields, then the extra bag merged
    /// over them. On a key collision the extra option wins.
    pub fn options(&self) -> Options {
        let mut options = Options::new();
        options.insert("base_uri".to_string(), Value::from(self.base_uri()));
        options.insert("timeout".to_string(), Value::from(self.timeout()));
        options.insert(
            "connect_timeout".to_string(),
            Value::from(self.connect_timeout()),
        );
        for (key, value) in &self.extra {
            options.insert(key.clone(), value.clone());
        }
        options
    }
}

/// Reduce an absolute URL to `scheme://host[:port]`.
///
/// A scheme-relative input such as `//example.com/x` is read as `http`.
/// Default ports are elided by URL normalization.
pub fn normalize_base_uri(url: &str) -> Result<String> {
    let trimmed = url.trim();
    let parsed = if trimmed.starts_with("//") {
        Url::parse(&format!("http:{trimmed}"))
    } else {
        Url::parse(trimmed)
    }
    .map_err(|e| Error::Configuration(format!("invalid base URI {url:?}: {e}")))?;

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::Configuration(format!("base URI {url:?} has no host")))?;

    Ok(match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_uri_strips_path_query_and_fragment() {
        let mut config = ClientConfig::full();
        config
            .set_base_uri("https://api.example.com:8443/v1/users?page=2#top")
            .unwrap();
        assert_eq!(config.base_uri(), "https://api.example.com:8443");
    }

    #[test]
    fn base_uri_without_port() {
        let mut config = ClientConfig::full();
        config.set_base_uri("http://example.com/path/").unwrap();
        assert_eq!(config.base_uri(), "http://example.com");
    }

    #[test]
    fn scheme_relative_defaults_to_http() {
        assert_eq!(
            normalize_base_uri("//example.com/a").unwrap(),
            "http://example.com"
        );
    }

    #[test]
    fn default_port_is_elided() {
        assert_eq!(
            normalize_base_uri("https://example.com:443/x").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn hostless_uri_is_rejected() {
        let mut config = ClientConfig::full();
        let err = config.set_base_uri("not a url").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(config.base_uri(), "");
    }

    #[test]
    fn undeclared_base_uri_is_noop() {
        let mut config = ClientConfig::minimal();
        assert!(!config.set_base_uri("https://example.com/x").unwrap());
        assert_eq!(config.base_uri(), "");
    }

    #[test]
    fn undeclared_base_uri_ignores_malformed_input() {
        let mut config = ClientConfig::minimal();
        assert!(!config.set_base_uri("::::").unwrap());
    }

    #[test]
    fn undeclared_timeouts_fall_back_to_defaults() {
        let mut config = ClientConfig::minimal();
        assert!(!config.set_timeout(10.0));
        assert!(!config.set_connect_timeout(10.0));
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn declared_timeouts_are_stored() {
        let mut config = ClientConfig::minimal().declare_timeout(1.0);
        assert_eq!(config.timeout(), 1.0);
        assert!(config.set_timeout(7.5));
        assert_eq!(config.timeout(), 7.5);
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn options_contain_base_fields() {
        let options = ClientConfig::minimal().options();
        assert_eq!(options["base_uri"], json!(""));
        assert_eq!(options["timeout"], json!(5.0));
        assert_eq!(options["connect_timeout"], json!(3.0));
    }

    #[test]
    fn extra_options_override_base_fields() {
        let mut config = ClientConfig::full();
        config.set_timeout(5.0);
        let mut extra = Options::new();
        extra.insert("timeout".to_string(), json!(99));
        extra.insert("verify".to_string(), json!(false));
        config.set_http_options(extra);

        let options = config.options();
        assert_eq!(options["timeout"], json!(99));
        assert_eq!(options["verify"], json!(false));
        assert_eq!(options["connect_timeout"], json!(3.0));
    }

    #[test]
    fn set_http_options_replaces_bag() {
        let mut config = ClientConfig::minimal();
        let mut first = Options::new();
        first.insert("a".to_string(), json!(1));
        config.set_http_options(first);
        let mut second = Options::new();
        second.insert("b".to_string(), json!(2));
        config.set_http_options(second);

        assert!(config.http_options().get("a").is_none());
        assert_eq!(config.http_options()["b"], json!(2));
    }
}
