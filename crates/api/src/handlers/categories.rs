//! Handlers for the category tree.
//!
//! All endpoints are scoped by [`RequestContext`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use procforge_core::types::DbId;
use procforge_db::models::category::{
    CreateCategory, MoveCategory, SortOrderUpdate, UpdateCategory,
};

use crate::error::AppResult;
use crate::middleware::tenant::RequestContext;
use crate::query::KeywordParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `PUT /categories/{id}/sort`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOrderBody {
    pub sort_order: i32,
}

/// Result of a batch reorder.
#[derive(Debug, Serialize)]
pub struct BatchSortResult {
    pub updated: usize,
}

/// GET /api/v1/categories/tree
pub async fn get_tree(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let tree = state.categories.build_tree(&ctx.scope).await?;
    Ok(Json(DataResponse { data: tree }))
}

/// GET /api/v1/categories/search?keyword=
///
/// A blank keyword lists every category in the scope.
pub async fn search_categories(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(params): Query<KeywordParams>,
) -> AppResult<impl IntoResponse> {
    let matches = state
        .categories
        .search_categories(&ctx.scope, params.keyword.as_deref())
        .await?;
    Ok(Json(DataResponse { data: matches }))
}

/// POST /api/v1/categories
pub async fn create_category(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(input): Json<CreateCategory>,
) -> AppResult<impl IntoResponse> {
    let category = state
        .categories
        .create_category(&ctx.scope, &ctx.actor, input)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: category })))
}

/// GET /api/v1/categories/{id}
pub async fn get_category(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let category = state.categories.get_category(&ctx.scope, id).await?;
    Ok(Json(DataResponse { data: category }))
}

/// PUT /api/v1/categories/{id}
pub async fn update_category(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCategory>,
) -> AppResult<impl IntoResponse> {
    let category = state
        .categories
        .update_category(&ctx.scope, &ctx.actor, id, input)
        .await?;
    Ok(Json(DataResponse { data: category }))
}

/// DELETE /api/v1/categories/{id}
///
/// Refused while the category has children or linked templates.
pub async fn delete_category(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state
        .categories
        .delete_category(&ctx.scope, &ctx.actor, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/categories/{id}/move
///
/// A missing or null `parentId` moves the category to the root.
pub async fn move_category(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<MoveCategory>,
) -> AppResult<impl IntoResponse> {
    let category = state
        .categories
        .move_category(&ctx.scope, &ctx.actor, id, input)
        .await?;
    Ok(Json(DataResponse { data: category }))
}

/// PUT /api/v1/categories/{id}/sort
pub async fn update_sort_order(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SortOrderBody>,
) -> AppResult<impl IntoResponse> {
    let category = state
        .categories
        .update_sort_order(&ctx.scope, &ctx.actor, id, input.sort_order)
        .await?;
    Ok(Json(DataResponse { data: category }))
}

/// PUT /api/v1/categories/sort/batch
pub async fn batch_update_sort_order(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(updates): Json<Vec<SortOrderUpdate>>,
) -> AppResult<impl IntoResponse> {
    let updated = state
        .categories
        .batch_update_sort_order(&ctx.scope, &ctx.actor, updates)
        .await?;
    Ok(Json(DataResponse {
        data: BatchSortResult { updated },
    }))
}
