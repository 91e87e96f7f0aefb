//! Handlers for template drafts and published templates.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use procforge_catalog::PublishedQuery;
use procforge_core::types::DbId;
use procforge_db::models::template_draft::{CreateDraft, UpdateDraft};
use procforge_db::models::template_published::InstanceCounts;

use crate::error::AppResult;
use crate::middleware::tenant::RequestContext;
use crate::query::{DraftListParams, PublishedListParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// POST /api/v1/templates/drafts
pub async fn create_draft(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(input): Json<CreateDraft>,
) -> AppResult<impl IntoResponse> {
    let draft = state
        .lifecycle
        .create_draft(&ctx.scope, &ctx.actor, input)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: draft })))
}

/// GET /api/v1/templates/drafts
pub async fn list_drafts(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(params): Query<DraftListParams>,
) -> AppResult<impl IntoResponse> {
    let page = state
        .lifecycle
        .list_drafts(&ctx.scope, params.into())
        .await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/templates/drafts/{id}
pub async fn get_draft(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let draft = state.lifecycle.get_draft(&ctx.scope, id).await?;
    Ok(Json(DataResponse { data: draft }))
}

/// PUT /api/v1/templates/drafts/{id}
///
/// Pass `version` to reject the edit when the draft changed since it was read.
pub async fn update_draft(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDraft>,
) -> AppResult<impl IntoResponse> {
    let draft = state
        .lifecycle
        .update_draft(&ctx.scope, &ctx.actor, id, input)
        .await?;
    Ok(Json(DataResponse { data: draft }))
}

/// DELETE /api/v1/templates/drafts/{id}
pub async fn delete_draft(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.lifecycle.delete_draft(&ctx.scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/drafts/{id}/publish
///
/// Deploys the draft and replaces it with a published template.
pub async fn publish_draft(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let published = state.lifecycle.publish(&ctx.scope, &ctx.actor, id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: published })))
}

// ---------------------------------------------------------------------------
// Published
// ---------------------------------------------------------------------------

/// GET /api/v1/templates/published
pub async fn list_published(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(params): Query<PublishedListParams>,
) -> AppResult<impl IntoResponse> {
    let query = PublishedQuery::try_from(params)?;
    let page = state.lifecycle.list_published(&ctx.scope, query).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/templates/published/{id}
pub async fn get_published(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let published = state.lifecycle.get_published(&ctx.scope, id).await?;
    Ok(Json(DataResponse { data: published }))
}

/// POST /api/v1/templates/published/{id}/suspend
pub async fn suspend_published(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let published = state.lifecycle.suspend(&ctx.scope, id).await?;
    Ok(Json(DataResponse { data: published }))
}

/// POST /api/v1/templates/published/{id}/activate
pub async fn activate_published(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let published = state.lifecycle.activate(&ctx.scope, id).await?;
    Ok(Json(DataResponse { data: published }))
}

/// PUT /api/v1/templates/published/{id}/instance-counts
pub async fn record_instance_counts(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(counts): Json<InstanceCounts>,
) -> AppResult<impl IntoResponse> {
    let published = state
        .lifecycle
        .record_instance_counts(&ctx.scope, id, counts)
        .await?;
    Ok(Json(DataResponse { data: published }))
}
