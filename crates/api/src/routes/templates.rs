//! Route definitions for drafts, published templates and snapshots.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{snapshots, templates};
use crate::state::AppState;

/// Template routes mounted at `/templates`.
///
/// ```text
/// GET    /drafts                          -> list_drafts
/// POST   /drafts                          -> create_draft
/// GET    /drafts/{id}                     -> get_draft
/// PUT    /drafts/{id}                     -> update_draft
/// DELETE /drafts/{id}                     -> delete_draft
/// POST   /drafts/{id}/publish             -> publish_draft
///
/// GET    /published                       -> list_published
/// GET    /published/{id}                  -> get_published
/// POST   /published/{id}/suspend          -> suspend_published
/// POST   /published/{id}/activate         -> activate_published
/// PUT    /published/{id}/instance-counts  -> record_instance_counts
///
/// POST   /snapshots                       -> create_snapshot
/// GET    /snapshots/by-key/{template_key} -> list_snapshots
/// GET    /snapshots/{id}                  -> get_snapshot
/// DELETE /snapshots/{id}                  -> delete_snapshot
/// POST   /snapshots/{id}/restore          -> restore_snapshot
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        // Drafts
        .route(
            "/drafts",
            get(templates::list_drafts).post(templates::create_draft),
        )
        .route(
            "/drafts/{id}",
            get(templates::get_draft)
                .put(templates::update_draft)
                .delete(templates::delete_draft),
        )
        .route("/drafts/{id}/publish", post(templates::publish_draft))
        // Published
        .route("/published", get(templates::list_published))
        .route("/published/{id}", get(templates::get_published))
        .route(
            "/published/{id}/suspend",
            post(templates::suspend_published),
        )
        .route(
            "/published/{id}/activate",
            post(templates::activate_published),
        )
        .route(
            "/published/{id}/instance-counts",
            put(templates::record_instance_counts),
        )
        // Snapshots
        .route("/snapshots", post(snapshots::create_snapshot))
        .route(
            "/snapshots/by-key/{template_key}",
            get(snapshots::list_snapshots),
        )
        .route(
            "/snapshots/{id}",
            get(snapshots::get_snapshot).delete(snapshots::delete_snapshot),
        )
        .route("/snapshots/{id}/restore", post(snapshots::restore_snapshot))
}
