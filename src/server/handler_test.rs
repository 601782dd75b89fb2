//! Tests for the flag endpoint

use super::handler::*;
use crate::flags::StaticFlags;
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    response::Response,
};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tower::ServiceExt;

async fn send(provider: Arc<StaticFlags>, method: Method, path: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("valid request");
    router(provider)
        .oneshot(request)
        .await
        .expect("router is infallible")
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn test_root_returns_enabled_flag() {
    let provider = Arc::new(StaticFlags::new().with("user-metadata", true));

    let response = send(provider, Method::GET, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "Application/JSON");
    assert_eq!(
        body_text(response).await,
        "{\n    \"user\": {\n        \"metadata\": true\n    }\n}"
    );
}

#[tokio::test]
async fn test_root_returns_disabled_flag() {
    let provider = Arc::new(StaticFlags::new().with("user-metadata", false));

    let response = send(provider, Method::GET, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let value: serde_json::Value =
        serde_json::from_str(&body_text(response).await).expect("valid JSON");
    assert_eq!(value, serde_json::json!({"user": {"metadata": false}}));
}

#[tokio::test]
async fn test_root_accepts_any_method() {
    for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
        let provider = Arc::new(StaticFlags::new().with("user-metadata", true));
        let response = send(provider, method.clone(), "/").await;
        assert_eq!(response.status(), StatusCode::OK, "{} / should succeed", method);
    }
}

#[tokio::test]
async fn test_consecutive_requests_are_identical() {
    let provider = Arc::new(StaticFlags::new().with("user-metadata", true));

    let first = body_text(send(provider.clone(), Method::GET, "/").await).await;
    let second = body_text(send(provider, Method::GET, "/").await).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_flags_evaluated_per_request() {
    let provider = Arc::new(StaticFlags::new().with("user-metadata", false));
    let app = router(provider.clone());

    let request = || Request::get("/").body(Body::empty()).expect("valid request");

    let before = app.clone().oneshot(request()).await.expect("infallible");
    assert!(body_text(before).await.contains("false"));

    provider.set("user-metadata", true);
    let after = app.oneshot(request()).await.expect("infallible");
    assert!(body_text(after).await.contains("true"));
}

#[tokio::test]
async fn test_unknown_path_returns_404() {
    let provider = Arc::new(StaticFlags::new().with("user-metadata", true));

    let response = send(provider, Method::GET, "/flags").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("secret detail"))
    }
}

#[tokio::test]
async fn test_serialization_failure_returns_generic_500() {
    let response = json_response(&Unserializable);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    let body = body_text(response).await;
    assert_eq!(body, "Internal Server Error\n");
    assert!(!body.contains("secret detail"));
}
