//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no router is
//! involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;

use procforge_api::error::AppError;
use procforge_core::error::CoreError;
use procforge_core::types::new_id;
use procforge_db::StoreError;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

async fn core(err: CoreError) -> (StatusCode, String) {
    let (status, json) = error_to_response(AppError::Core(err)).await;
    (status, json["code"].as_str().unwrap().to_string())
}

// ---------------------------------------------------------------------------
// Not found family -> 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_errors_return_404() {
    let id = new_id();
    let (status, json) = error_to_response(AppError::Core(CoreError::NotFound {
        entity: "Category",
        id,
    }))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], format!("Category with id {id} not found"));

    assert_eq!(
        core(CoreError::ParentNotFound(id)).await,
        (StatusCode::NOT_FOUND, "PARENT_NOT_FOUND".to_string())
    );
    assert_eq!(
        core(CoreError::CategoryNotFound(id)).await,
        (StatusCode::NOT_FOUND, "CATEGORY_NOT_FOUND".to_string())
    );
}

// ---------------------------------------------------------------------------
// Conflict family -> 409
// ---------------------------------------------------------------------------

#[tokio::test]
async fn state_conflicts_return_409() {
    let id = new_id();
    let cases = [
        (CoreError::DuplicateCode("HR".into()), "DUPLICATE_CODE"),
        (CoreError::DuplicateKey("leave".into()), "DUPLICATE_KEY"),
        (CoreError::CyclicMove { id }, "CYCLIC_MOVE"),
        (CoreError::HasChildren { count: 2 }, "HAS_CHILDREN"),
        (CoreError::HasTemplates { count: 1 }, "HAS_TEMPLATES"),
        (CoreError::NotActive(id), "NOT_ACTIVE"),
        (CoreError::NotInactive(id), "NOT_INACTIVE"),
        (CoreError::HasRunningInstances { count: 3 }, "HAS_RUNNING_INSTANCES"),
        (
            CoreError::ConcurrentModification {
                entity: "TemplateDraft",
                id,
            },
            "CONCURRENT_MODIFICATION",
        ),
    ];
    for (err, code) in cases {
        assert_eq!(core(err).await, (StatusCode::CONFLICT, code.to_string()));
    }
}

#[tokio::test]
async fn unique_violation_from_store_returns_409() {
    let (status, json) = error_to_response(AppError::Store(StoreError::UniqueViolation(
        "uq_process_categories_scope_code".into(),
    )))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

// ---------------------------------------------------------------------------
// Bad input -> 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_content_lists_every_problem() {
    let (status, json) = error_to_response(AppError::Core(CoreError::InvalidContent(vec![
        "Document defines no process".into(),
        "Duplicate element id 'a'".into(),
    ])))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_CONTENT");
    assert_eq!(json["details"].as_array().unwrap().len(), 2);
    assert_eq!(json["details"][0], "Document defines no process");
}

#[tokio::test]
async fn validation_errors_return_400() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Validation("name is required".into()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "name is required");

    assert_eq!(
        core(CoreError::InvalidSourceKind("archived".into())).await,
        (StatusCode::BAD_REQUEST, "INVALID_SOURCE_KIND".to_string())
    );

    let (status, json) = error_to_response(AppError::BadRequest("bad header".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Engine and internal failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deployment_failure_returns_502() {
    assert_eq!(
        core(CoreError::DeploymentFailed("Engine call timed out".into())).await,
        (StatusCode::BAD_GATEWAY, "DEPLOYMENT_FAILED".to_string())
    );
}

#[tokio::test]
async fn internal_errors_are_sanitized() {
    let (status, json) =
        error_to_response(AppError::InternalError("secret connection string".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert!(!json.to_string().contains("secret"));

    let (status, json) =
        error_to_response(AppError::Core(CoreError::Internal("secret key space".into()))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn row_not_found_returns_404() {
    let (status, _) =
        error_to_response(AppError::Store(StoreError::Database(sqlx::Error::RowNotFound))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
