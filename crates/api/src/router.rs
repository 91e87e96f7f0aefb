//! HTTP surface of the process template catalog.
//!
//! `/health` reports the store backend; everything else lives under
//! `/api/v1` and is tenant-scoped by the `x-tenant-id`, `x-app-id` and
//! `x-context-id` headers. Calls into the workflow engine happen inside the
//! publish and status handlers, so the request timeout has to outlast the
//! engine client's own timeout.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::middleware::tenant::{APP_HEADER, CONTEXT_HEADER, TENANT_HEADER, USER_HEADER};
use crate::routes;
use crate::state::AppState;

/// Header carrying the per-request UUID, set when the caller sends none.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Catalog routes wrapped in the service middleware.
///
/// Outermost first: CORS (so preflights for the tenant headers are answered
/// before anything else), request id assignment, request tracing, request id
/// echo, the request timeout, then panic recovery around the handlers.
/// `main.rs` and the integration tests both build the app through here.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// CORS for the configured browser origins. Allows the tenant and actor
/// headers every catalog call carries.
///
/// Panics at startup if any configured origin is invalid.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(TENANT_HEADER),
            HeaderName::from_static(APP_HEADER),
            HeaderName::from_static(CONTEXT_HEADER),
            HeaderName::from_static(USER_HEADER),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
