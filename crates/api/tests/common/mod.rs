#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use procforge_api::config::{ServerConfig, StoreBackend};
use procforge_api::router::build_app_router;
use procforge_api::state::AppState;
use procforge_core::deployment::{DeploymentGateway, LocalDeploymentGateway};
use procforge_db::InMemoryCatalogStore;

pub const TENANT: &str = "tenant-1";

/// Build a test `ServerConfig` with safe defaults and the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        store_backend: StoreBackend::Memory,
        database_url: None,
        db_max_connections: 1,
        gateway_url: None,
        gateway_timeout_secs: 5,
    }
}

/// The full application router over a fresh in-memory store and the
/// in-process engine.
pub fn build_test_app() -> Router {
    build_test_app_with_gateway(Arc::new(LocalDeploymentGateway::new()))
}

pub fn build_test_app_with_gateway(gateway: Arc<dyn DeploymentGateway>) -> Router {
    let config = test_config();
    let state = AppState::new(Arc::new(InMemoryCatalogStore::new()), gateway, config.clone());
    build_app_router(state, &config)
}

fn request(method: Method, uri: &str, body: Option<&Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-tenant-id", TENANT)
        .header("x-user-id", "alice");
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a scoped request without a body.
pub async fn send(app: &Router, method: Method, uri: &str) -> Response<Body> {
    app.clone().oneshot(request(method, uri, None)).await.unwrap()
}

/// Send a scoped request with a JSON body.
pub async fn send_json(app: &Router, method: Method, uri: &str, body: Value) -> Response<Body> {
    app.clone()
        .oneshot(request(method, uri, Some(&body)))
        .await
        .unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send_json(app, Method::POST, uri, body).await
}

pub async fn put_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send_json(app, Method::PUT, uri, body).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the `data` member of the envelope.
pub async fn expect_data(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    let mut json = body_json(response).await;
    json["data"].take()
}

/// Assert the status and return the error `code`.
pub async fn expect_error(response: Response<Body>, status: StatusCode) -> String {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    json["code"].as_str().unwrap().to_string()
}

/// A minimal valid process document whose main process id is `process_id`.
pub fn bpmn(process_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="defs">
  <process id="{process_id}" isExecutable="true">
    <startEvent id="start"/>
    <endEvent id="end"/>
    <sequenceFlow id="flow" sourceRef="start" targetRef="end"/>
  </process>
</definitions>"#
    )
}

/// Create a category and return its id.
pub async fn create_category(app: &Router, code: &str, parent_id: Option<&str>) -> String {
    let response = post_json(
        app,
        "/api/v1/categories",
        serde_json::json!({ "name": format!("Category {code}"), "code": code, "parentId": parent_id }),
    )
    .await;
    let data = expect_data(response, StatusCode::CREATED).await;
    data["id"].as_str().unwrap().to_string()
}

/// Create a draft and return its id.
pub async fn create_draft(app: &Router, key: &str, process_id: &str, category_id: &str) -> String {
    let response = post_json(
        app,
        "/api/v1/templates/drafts",
        serde_json::json!({
            "templateKey": key,
            "name": format!("Template {key}"),
            "content": bpmn(process_id),
            "categoryId": category_id,
            "tags": ["hr"],
        }),
    )
    .await;
    let data = expect_data(response, StatusCode::CREATED).await;
    data["id"].as_str().unwrap().to_string()
}
