use std::{collections::BTreeMap, time::Duration};

use axum::{
    body::Body,
    extract::Path,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub const XML_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<response version="1">
  <status>ok</status>
  <item>first</item>
  <item>second</item>
  <note><![CDATA[a & b]]></note>
</response>"#;

/// Served by `/binary`; not valid UTF-8.
pub const BINARY_DOCUMENT: &[u8] = &[0xff, 0xfe, 0x00, 0x81];

/// Size of the `/large` body, above ureq's default 10 MB string cap.
pub const LARGE_DOCUMENT_LEN: usize = 11 * 1024 * 1024;

/// What the server saw, returned by `/echo`. Repeated headers are joined
/// with `", "`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/json", get(json_document))
        .route("/javascript", get(javascript_document))
        .route("/xml", get(xml_document))
        .route("/text", get(text_document))
        .route("/untyped", get(untyped_document))
        .route("/broken-json", get(broken_json))
        .route("/binary", get(binary_document))
        .route("/large", get(large_document))
        .route("/echo", any(echo))
        .route("/status/{code}", get(status))
        .route("/slow", get(slow))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn json_document() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"message":"hello","count":2,"tags":["a","b"]}"#,
    )
}

async fn javascript_document() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        r#"{"callback":false}"#,
    )
}

async fn xml_document() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml")], XML_DOCUMENT)
}

async fn text_document() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "hello")
}

async fn untyped_document() -> Body {
    Body::from("no content type")
}

async fn broken_json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{\"message\":")
}

async fn binary_document() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], BINARY_DOCUMENT)
}

async fn large_document() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "a".repeat(LARGE_DOCUMENT_LEN))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        seen.entry(name.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    tracing::debug!(%method, %uri, "echo");
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: seen,
        body,
    })
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "text/plain")],
        format!("status {code}"),
    )
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(3)).await;
    ([(header::CONTENT_TYPE, "text/plain")], "finally")
}
