//! Content-type driven response decoding.
//!
//! # Design
//! The `Content-Type` header alone decides how a body is read. JSON and
//! JavaScript media types are parsed with `serde_json`. XML media types are
//! parsed with `quick-xml` and folded into the same `serde_json::Value` shape,
//! so callers handle one structured type no matter which format the server
//! chose. Everything else, including a response with no `Content-Type`, is
//! returned as the raw body: text when it is valid UTF-8, bytes otherwise.
//!
//! XML folding rules:
//! - the root element becomes the returned object and its name is dropped;
//! - attributes live under `@attributes`, except `xmlns` declarations;
//! - child elements are keyed by name, and repeated siblings become an array;
//! - a bare leaf becomes its text, or `{}` when it has no text;
//! - a leaf with attributes keeps its text under `"0"`;
//! - text that sits between child elements is dropped.

use serde_json::Value;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{DecodeError, Result};
use crate::http::{HttpResponse, Options};

const ATTRIBUTES_KEY: &str = "@attributes";
const TEXT_KEY: &str = "0";

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedResponse {
    /// Parsed JSON, or XML folded into the JSON shape.
    Structured(Value),
    /// The body as received.
    Raw(String),
    /// A body without a structured type that is not valid UTF-8.
    Binary(Vec<u8>),
}

impl DecodedResponse {
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            DecodedResponse::Structured(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            DecodedResponse::Raw(body) => Some(body),
            _ => None,
        }
    }

    /// The unstructured body as bytes, whether or not it was valid UTF-8.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DecodedResponse::Structured(_) => None,
            DecodedResponse::Raw(body) => Some(body.as_bytes()),
            DecodedResponse::Binary(body) => Some(body),
        }
    }

    /// Collapse into a single `Value`; raw bodies become `Value::String`,
    /// binary ones lossily.
    pub fn into_value(self) -> Value {
        match self {
            DecodedResponse::Structured(value) => value,
            DecodedResponse::Raw(body) => Value::String(body),
            DecodedResponse::Binary(body) => {
                Value::String(String::from_utf8_lossy(&body).into_owned())
            }
        }
    }
}

/// Which decoder a content type selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Xml,
    Text,
}

impl BodyFormat {
    pub fn from_content_type(content_type: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("json") || content_type.contains("javascript") {
            BodyFormat::Json
        } else if content_type.contains("xml") {
            BodyFormat::Xml
        } else {
            BodyFormat::Text
        }
    }
}

/// Decode `response` according to its `Content-Type` header.
pub fn unwrap_response(response: HttpResponse) -> Result<DecodedResponse> {
    let content_type = response.header_line("Content-Type");
    let format = BodyFormat::from_content_type(&content_type);
    tracing::trace!(%content_type, ?format, "decoding response body");

    let decoded = match format {
        BodyFormat::Json => DecodedResponse::Structured(
            serde_json::from_slice(&response.body).map_err(DecodeError::from)?,
        ),
        BodyFormat::Xml => DecodedResponse::Structured(xml_to_value(utf8(&response.body)?)?),
        BodyFormat::Text => match String::from_utf8(response.body) {
            Ok(text) => DecodedResponse::Raw(text),
            Err(e) => DecodedResponse::Binary(e.into_bytes()),
        },
    };
    Ok(decoded)
}

/// An element whose end tag has not been seen yet.
struct OpenElement {
    name: String,
    attributes: Options,
    children: Options,
    text: String,
}

impl OpenElement {
    fn start(tag: &BytesStart<'_>) -> Result<Self, DecodeError> {
        let name = utf8(tag.name().as_ref())?.to_string();
        let mut attributes = Options::new();
        for attr in tag.attributes() {
            let attr = attr.map_err(|e| DecodeError::Xml(e.to_string()))?;
            let key = utf8(attr.key.as_ref())?.to_string();
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let value = attr.unescape_value()?.into_owned();
            attributes.insert(key, Value::String(value));
        }
        Ok(Self {
            name,
            attributes,
            children: Options::new(),
            text: String::new(),
        })
    }

    fn push_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn finish(self, is_root: bool) -> Value {
        let has_text = !self.text.trim().is_empty();

        if self.attributes.is_empty() && self.children.is_empty() && !is_root {
            return if has_text {
                Value::String(self.text)
            } else {
                Value::Object(Options::new())
            };
        }

        let mut object = Options::new();
        if !self.attributes.is_empty() {
            object.insert(ATTRIBUTES_KEY.to_string(), Value::Object(self.attributes));
        }
        let leaf = self.children.is_empty();
        object.extend(self.children);
        if leaf && has_text {
            object.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }
        Value::Object(object)
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, DecodeError> {
    std::str::from_utf8(bytes).map_err(|e| DecodeError::Xml(e.to_string()))
}

/// Parse an XML document and fold it into a `Value`.
pub fn xml_to_value(document: &str) -> Result<Value, DecodeError> {
    let mut reader = Reader::from_str(document);
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event()? {
            Event::Start(tag) => {
                if root.is_some() {
                    return Err(DecodeError::Xml("content after root element".to_string()));
                }
                stack.push(OpenElement::start(&tag)?);
            }
            Event::Empty(tag) => {
                if root.is_some() {
                    return Err(DecodeError::Xml("content after root element".to_string()));
                }
                let element = OpenElement::start(&tag)?;
                close(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| DecodeError::Xml("unexpected end tag".to_string()))?;
                close(element, &mut stack, &mut root);
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                match stack.last_mut() {
                    Some(open) => open.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(DecodeError::Xml(
                            "text outside root element".to_string(),
                        ))
                    }
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                match stack.last_mut() {
                    Some(open) => open.text.push_str(utf8(&data)?),
                    None => {
                        return Err(DecodeError::Xml(
                            "CDATA outside root element".to_string(),
                        ))
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(DecodeError::Xml(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| DecodeError::Xml("document has no root element".to_string()))
}

fn close(element: OpenElement, stack: &mut [OpenElement], root: &mut Option<Value>) {
    let name = element.name.clone();
    match stack.last_mut() {
        Some(parent) => {
            let value = element.finish(false);
            parent.push_child(name, value);
        }
        None => *root = Some(element.finish(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn response(content_type: Option<&str>, body: &str) -> HttpResponse {
        bytes_response(content_type, body.as_bytes())
    }

    fn bytes_response(content_type: Option<&str>, body: &[u8]) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: content_type
                .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
                .unwrap_or_default(),
            body: body.to_vec(),
        }
    }

    #[test]
    fn json_body_is_structured() {
        let decoded = unwrap_response(response(Some("application/json"), r#"{"x":1}"#)).unwrap();
        assert_eq!(decoded, DecodedResponse::Structured(json!({"x": 1})));
    }

    #[test]
    fn json_keys_keep_document_order() {
        let decoded =
            unwrap_response(response(Some("application/json"), r#"{"b":1,"a":2,"c":3}"#)).unwrap();
        let keys: Vec<_> = decoded.as_structured().unwrap().as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn content_type_match_is_case_insensitive() {
        let decoded = unwrap_response(response(Some("Application/JSON; charset=UTF-8"), "[1,2]")).unwrap();
        assert_eq!(decoded.into_value(), json!([1, 2]));
    }

    #[test]
    fn javascript_is_treated_as_json() {
        let decoded = unwrap_response(response(Some("text/javascript"), r#"{"ok":true}"#)).unwrap();
        assert_eq!(decoded.into_value(), json!({"ok": true}));
    }

    #[test]
    fn vendor_json_suffix_is_json() {
        assert_eq!(
            BodyFormat::from_content_type("application/problem+json"),
            BodyFormat::Json
        );
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = unwrap_response(response(Some("application/json"), "{not json")).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Json(_))));
    }

    #[test]
    fn empty_json_body_is_decode_error() {
        let err = unwrap_response(response(Some("application/json"), "")).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Json(_))));
    }

    #[test]
    fn plain_text_passes_through() {
        let decoded = unwrap_response(response(Some("text/plain"), "hello")).unwrap();
        assert_eq!(decoded.as_raw(), Some("hello"));
    }

    #[test]
    fn missing_content_type_passes_through() {
        let decoded = unwrap_response(response(None, "{\"x\":1}")).unwrap();
        assert_eq!(decoded, DecodedResponse::Raw("{\"x\":1}".to_string()));
    }

    #[test]
    fn binary_body_is_returned_unmodified() {
        let body = [0xff, 0xfe, 0x00, 0x81];
        let decoded =
            unwrap_response(bytes_response(Some("application/octet-stream"), &body)).unwrap();
        assert_eq!(decoded, DecodedResponse::Binary(body.to_vec()));
        assert_eq!(decoded.as_bytes(), Some(&body[..]));
        assert_eq!(decoded.as_raw(), None);
    }

    #[test]
    fn latin1_text_is_not_an_error() {
        let body = b"caf\xe9";
        let decoded = unwrap_response(bytes_response(Some("text/plain; charset=iso-8859-1"), body))
            .unwrap();
        assert_eq!(decoded.as_bytes(), Some(&body[..]));
    }

    #[test]
    fn non_utf8_xml_is_decode_error() {
        let err = unwrap_response(bytes_response(Some("text/xml"), b"<r>caf\xe9</r>")).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Xml(_))));
    }

    #[test]
    fn xml_leaf_becomes_string() {
        let decoded = unwrap_response(response(Some("application/xml"), "<r><x>1</x></r>")).unwrap();
        assert_eq!(decoded.into_value(), json!({"x": "1"}));
    }

    #[test]
    fn xml_namespace_declarations_are_not_attributes() {
        let value = xml_to_value(
            r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/"><title>t</title></feed>"#,
        )
        .unwrap();
        assert_eq!(value, json!({"title": "t"}));
    }

    #[test]
    fn xml_namespace_declarations_leave_other_attributes() {
        let value = xml_to_value(r#"<r xmlns="urn:x" lang="en"><a>1</a></r>"#).unwrap();
        assert_eq!(value, json!({"@attributes": {"lang": "en"}, "a": "1"}));
    }

    #[test]
    fn xml_repeated_siblings_become_array() {
        let value = xml_to_value("<r><item>a</item><other>o</other><item>b</item><item>c</item></r>").unwrap();
        assert_eq!(value, json!({"item": ["a", "b", "c"], "other": "o"}));
    }

    #[test]
    fn xml_attributes_are_grouped() {
        let value = xml_to_value(r#"<r version="2"><user id="7"><name>Ann</name></user></r>"#).unwrap();
        assert_eq!(
            value,
            json!({
                "@attributes": {"version": "2"},
                "user": {"@attributes": {"id": "7"}, "name": "Ann"}
            })
        );
    }

    #[test]
    fn xml_attribute_with_text_keeps_text_under_zero() {
        let value = xml_to_value(r#"<r><price currency="EUR">9.50</price></r>"#).unwrap();
        assert_eq!(value, json!({"price": {"@attributes": {"currency": "EUR"}, "0": "9.50"}}));
    }

    #[test]
    fn xml_empty_elements_become_empty_objects() {
        let value = xml_to_value("<r><a/><b></b></r>").unwrap();
        assert_eq!(value, json!({"a": {}, "b": {}}));
    }

    #[test]
    fn xml_cdata_is_merged_into_text() {
        let value = xml_to_value("<r><msg><![CDATA[<b>bold</b>]]></msg></r>").unwrap();
        assert_eq!(value, json!({"msg": "<b>bold</b>"}));
    }

    #[test]
    fn xml_entities_are_unescaped() {
        let value = xml_to_value("<r><q>a &amp; b &lt; c</q></r>").unwrap();
        assert_eq!(value, json!({"q": "a & b < c"}));
    }

    #[test]
    fn xml_declaration_and_comments_are_ignored() {
        let value = xml_to_value(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- note -->\n<r>\n  <x>1</x>\n</r>\n",
        )
        .unwrap();
        assert_eq!(value, json!({"x": "1"}));
    }

    #[test]
    fn xml_mixed_text_is_dropped() {
        let value = xml_to_value("<r>lead<x>1</x>tail</r>").unwrap();
        assert_eq!(value, json!({"x": "1"}));
    }

    #[test]
    fn xml_text_only_root() {
        let value = xml_to_value("<r>hello</r>").unwrap();
        assert_eq!(value, json!({"0": "hello"}));
    }

    #[test]
    fn xml_mismatched_tags_fail() {
        let err = unwrap_response(response(Some("text/xml"), "<r><x>1</y></r>")).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Xml(_))));
    }

    #[test]
    fn xml_unclosed_root_fails() {
        assert!(matches!(xml_to_value("<r><x>1</x>"), Err(DecodeError::Xml(_))));
    }

    #[test]
    fn xml_empty_document_fails() {
        assert!(matches!(xml_to_value(""), Err(DecodeError::Xml(_))));
    }

    #[test]
    fn xml_second_root_fails() {
        assert!(matches!(xml_to_value("<a/><b/>"), Err(DecodeError::Xml(_))));
    }
}
