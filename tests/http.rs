#![cfg(unix)]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{FakeEngine, HANGS, WRITES_PDF};
use docmill::handlers::{router, AppState};
use docmill::LibreOfficeEngine;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "docmill-test-boundary";

fn app(engine: LibreOfficeEngine) -> axum::Router {
    router(Arc::new(AppState::new(engine)))
}

fn multipart(fields: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, filename, data) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let fake = FakeEngine::new(WRITES_PDF);
    let response = app(fake.engine())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_info_lists_formats_and_policies() {
    let fake = FakeEngine::new(WRITES_PDF);
    let response = app(fake.engine())
        .oneshot(Request::get("/info").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let info = json_body(response).await;
    let formats = &info["supported_formats"];
    assert_eq!(formats["document"]["filter"], "writer_pdf_Export");
    assert!(formats["spreadsheet"]["extensions"]
        .as_array()
        .unwrap()
        .contains(&Value::from("xlsb")));
    assert_eq!(formats["presentation"]["extensions"].as_array().unwrap().len(), 3);
    assert_eq!(info["engine"]["worker_name"], fake.name.as_str());
    assert_eq!(info["engine"]["deadline"]["kind"], "requested");
    assert_eq!(info["engine"]["kill_after_success"], true);
}

#[tokio::test]
async fn test_convert_returns_pdf() {
    let fake = FakeEngine::new(WRITES_PDF);
    let response = app(fake.engine())
        .oneshot(multipart(&[("file", Some("quarterly report.docx"), "PK\x03\x04")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"quarterly report.pdf\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_convert_rejects_unsupported_format() {
    let fake = FakeEngine::new(WRITES_PDF);
    let response = app(fake.engine())
        .oneshot(multipart(&[("file", Some("setup.exe"), "MZ")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("Unsupported file format"));
}

#[tokio::test]
async fn test_convert_without_file() {
    let fake = FakeEngine::new(WRITES_PDF);
    let response = app(fake.engine())
        .oneshot(multipart(&[("timeoutSecs", None, "5")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file provided");
}

#[tokio::test]
async fn test_convert_invalid_timeout() {
    let fake = FakeEngine::new(WRITES_PDF);
    let response = app(fake.engine())
        .oneshot(multipart(&[
            ("timeoutSecs", None, "soon"),
            ("file", Some("a.txt"), "hello"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_convert_timeout_maps_to_gateway_timeout() {
    let fake = FakeEngine::new(HANGS);
    let response = app(fake.engine())
        .oneshot(multipart(&[
            ("timeoutSecs", None, "1"),
            ("file", Some("notes.txt"), "hello"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(response).await["error"], "Conversion timed out after 1s");
}

#[tokio::test]
async fn test_requested_timeout_capped_at_default() {
    let fake = FakeEngine::new(HANGS);
    let engine =
        LibreOfficeEngine::new(fake.config().with_default_timeout(Duration::from_secs(1))).unwrap();
    let response = app(engine)
        .oneshot(multipart(&[
            ("timeoutSecs", None, "3600"),
            ("file", Some("notes.txt"), "hello"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(response).await["error"], "Conversion timed out after 1s");
}
