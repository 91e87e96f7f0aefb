//! Handlers for template snapshots.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use procforge_core::types::DbId;
use procforge_db::models::template_snapshot::{CreateSnapshot, RestoreSnapshot};

use crate::error::AppResult;
use crate::middleware::tenant::RequestContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/templates/snapshots
///
/// `sourceKind` is `DRAFT` or `PUBLISHED`.
pub async fn create_snapshot(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(input): Json<CreateSnapshot>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state
        .snapshots
        .create_snapshot(&ctx.scope, &ctx.actor, input)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: snapshot })))
}

/// GET /api/v1/templates/snapshots/by-key/{template_key}
pub async fn list_snapshots(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(template_key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let snapshots = state
        .snapshots
        .list_snapshots(&ctx.scope, &template_key)
        .await?;
    Ok(Json(DataResponse { data: snapshots }))
}

/// GET /api/v1/templates/snapshots/{id}
pub async fn get_snapshot(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state.snapshots.get_snapshot(&ctx.scope, id).await?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// DELETE /api/v1/templates/snapshots/{id}
pub async fn delete_snapshot(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.snapshots.delete_snapshot(&ctx.scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/snapshots/{id}/restore
///
/// Creates a new draft under a fresh key; the snapshot is unchanged.
pub async fn restore_snapshot(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RestoreSnapshot>,
) -> AppResult<impl IntoResponse> {
    let draft = state
        .snapshots
        .restore_snapshot(&ctx.scope, &ctx.actor, id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: draft })))
}
