//! Canonical mapping representation for domain types.
//!
//! Any `Serialize` type gets [`ToMapping`] for free. Key names are whatever
//! the type's serde attributes declare, normally
//! `#[serde(rename_all = "snake_case")]`; a computed value is exposed through
//! `#[serde(serialize_with = ...)]` or a custom `Serialize` impl.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::Options;

pub trait ToMapping {
    /// The value as an ordered key/value mapping.
    fn to_mapping(&self) -> Result<Options>;
}

impl<T: Serialize + ?Sized> ToMapping for T {
    fn to_mapping(&self) -> Result<Options> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(Error::Serialization(format!(
                "expected a mapping, got {}",
                kind(&other)
            ))),
            Err(e) => Err(Error::Serialization(format!("cannot serialize to mapping: {e}"))),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
