//! Tests for the REST deployment gateway against a fake engine served on a
//! local port.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use procforge_api::engine::HttpDeploymentGateway;
use procforge_core::deployment::{DeploymentGateway, DeploymentRequest, GatewayError};

/// Requests the fake engine has seen.
#[derive(Clone, Default)]
struct Seen {
    deployments: Arc<Mutex<Vec<Value>>>,
    state_changes: Arc<Mutex<Vec<(String, String)>>>,
}

async fn accept_deployment(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    seen.deployments.lock().await.push(body);
    Json(json!({
        "definitionKey": "realLeave",
        "deploymentId": "dep-1",
        "definitionId": "realLeave:1:abc",
    }))
}

async fn change_state(
    State(seen): State<Seen>,
    Path((id, action)): Path<(String, String)>,
) -> StatusCode {
    seen.state_changes.lock().await.push((id, action));
    StatusCode::NO_CONTENT
}

/// Serve `router` on an ephemeral port and return the engine base URL.
async fn spawn_engine(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/engine-rest/")
}

fn request<'a>(content: &'a str) -> DeploymentRequest<'a> {
    DeploymentRequest {
        name: "Leave request",
        requested_key: "leave",
        content,
    }
}

fn gateway(base: &str, timeout: Duration) -> HttpDeploymentGateway {
    HttpDeploymentGateway::new(base, timeout).unwrap()
}

#[tokio::test]
async fn deploy_posts_document_and_parses_receipt() {
    let seen = Seen::default();
    let base = spawn_engine(
        Router::new()
            .route("/engine-rest/deployments", post(accept_deployment))
            .with_state(seen.clone()),
    )
    .await;

    let receipt = gateway(&base, Duration::from_secs(5))
        .deploy(&request("<definitions/>"))
        .await
        .unwrap();
    assert_eq!(receipt.definition_key, "realLeave");
    assert_eq!(receipt.deployment_id, "dep-1");
    assert_eq!(receipt.definition_id, "realLeave:1:abc");

    let bodies = seen.deployments.lock().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["name"], "Leave request");
    assert_eq!(bodies[0]["resourceName"], "leave.bpmn20.xml");
    assert_eq!(bodies[0]["content"], "<definitions/>");
}

#[tokio::test]
async fn suspend_and_activate_address_the_definition() {
    let seen = Seen::default();
    let base = spawn_engine(
        Router::new()
            .route("/engine-rest/definitions/{id}/{action}", put(change_state))
            .with_state(seen.clone()),
    )
    .await;
    let gateway = gateway(&base, Duration::from_secs(5));

    gateway.suspend("realLeave:1:abc").await.unwrap();
    gateway.activate("realLeave:1:abc").await.unwrap();

    let calls = seen.state_changes.lock().await;
    assert_eq!(
        *calls,
        vec![
            ("realLeave:1:abc".to_string(), "suspend".to_string()),
            ("realLeave:1:abc".to_string(), "activate".to_string()),
        ]
    );
}

#[tokio::test]
async fn error_status_is_rejected_with_body() {
    let base = spawn_engine(Router::new().route(
        "/engine-rest/deployments",
        post(|| async { (StatusCode::BAD_REQUEST, "unparseable process") }),
    ))
    .await;

    let err = gateway(&base, Duration::from_secs(5))
        .deploy(&request("garbage"))
        .await
        .unwrap_err();
    assert_matches!(err, GatewayError::Rejected(msg) if msg.contains("400") && msg.contains("unparseable process"));
}

#[tokio::test]
async fn unknown_definition_is_rejected() {
    // No routes: every call is answered with 404.
    let base = spawn_engine(Router::new()).await;

    let err = gateway(&base, Duration::from_secs(5))
        .suspend("missing:1:x")
        .await
        .unwrap_err();
    assert_matches!(err, GatewayError::Rejected(msg) if msg.contains("404"));
}

#[tokio::test]
async fn malformed_receipt_is_rejected() {
    let base = spawn_engine(Router::new().route(
        "/engine-rest/deployments",
        post(|| async { Json(json!({ "unexpected": true })) }),
    ))
    .await;

    let err = gateway(&base, Duration::from_secs(5))
        .deploy(&request("<definitions/>"))
        .await
        .unwrap_err();
    assert_matches!(err, GatewayError::Rejected(msg) if msg.starts_with("Malformed engine response"));
}

#[tokio::test]
async fn closed_port_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway(&format!("http://{addr}/"), Duration::from_secs(5))
        .activate("realLeave:1:abc")
        .await
        .unwrap_err();
    assert_matches!(err, GatewayError::Unavailable(_));
}

#[tokio::test]
async fn slow_engine_times_out() {
    let base = spawn_engine(Router::new().route(
        "/engine-rest/deployments",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    ))
    .await;

    let err = gateway(&base, Duration::from_millis(200))
        .deploy(&request("<definitions/>"))
        .await
        .unwrap_err();
    assert_matches!(err, GatewayError::Timeout);
}
