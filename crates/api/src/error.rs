use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use procforge_catalog::CatalogError;
use procforge_core::error::CoreError;
use procforge_db::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for persistence
/// failures, and adds HTTP-specific variants. Implements [`IntoResponse`]
/// to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `procforge_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A persistence error from the catalog store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Core(core) => AppError::Core(core),
            CatalogError::Store(store) => AppError::Store(store),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Core(CoreError::InvalidContent(details)) = &self {
            let body = json!({
                "error": "Process content is invalid",
                "code": "INVALID_CONTENT",
                "details": details,
            });
            return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
        }

        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Store(StoreError::UniqueViolation(constraint)) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("Duplicate value violates unique constraint: {constraint}"),
            ),
            AppError::Store(StoreError::Database(err)) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Map a domain error to an HTTP status, error code, and message.
fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::ParentNotFound(_) => (StatusCode::NOT_FOUND, "PARENT_NOT_FOUND", message),
        CoreError::CategoryNotFound(_) => (StatusCode::NOT_FOUND, "CATEGORY_NOT_FOUND", message),

        CoreError::DuplicateCode(_) => (StatusCode::CONFLICT, "DUPLICATE_CODE", message),
        CoreError::DuplicateKey(_) => (StatusCode::CONFLICT, "DUPLICATE_KEY", message),
        CoreError::CyclicMove { .. } => (StatusCode::CONFLICT, "CYCLIC_MOVE", message),
        CoreError::HasChildren { .. } => (StatusCode::CONFLICT, "HAS_CHILDREN", message),
        CoreError::HasTemplates { .. } => (StatusCode::CONFLICT, "HAS_TEMPLATES", message),
        CoreError::NotActive(_) => (StatusCode::CONFLICT, "NOT_ACTIVE", message),
        CoreError::NotInactive(_) => (StatusCode::CONFLICT, "NOT_INACTIVE", message),
        CoreError::HasRunningInstances { .. } => {
            (StatusCode::CONFLICT, "HAS_RUNNING_INSTANCES", message)
        }
        CoreError::ConcurrentModification { .. } => {
            (StatusCode::CONFLICT, "CONCURRENT_MODIFICATION", message)
        }

        CoreError::InvalidContent(_) => (StatusCode::BAD_REQUEST, "INVALID_CONTENT", message),
        CoreError::InvalidSourceKind(_) => {
            (StatusCode::BAD_REQUEST, "INVALID_SOURCE_KIND", message)
        }
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),

        CoreError::DeploymentFailed(_) => (StatusCode::BAD_GATEWAY, "DEPLOYMENT_FAILED", message),

        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
