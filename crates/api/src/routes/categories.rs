//! Route definitions for the category tree.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::categories;
use crate::state::AppState;

/// Category routes mounted at `/categories`.
///
/// ```text
/// GET    /tree              -> get_tree
/// GET    /search            -> search_categories
/// POST   /                  -> create_category
/// PUT    /sort/batch        -> batch_update_sort_order
/// GET    /{id}              -> get_category
/// PUT    /{id}              -> update_category
/// DELETE /{id}              -> delete_category
/// PUT    /{id}/move         -> move_category
/// PUT    /{id}/sort         -> update_sort_order
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(categories::create_category))
        .route("/tree", get(categories::get_tree))
        .route("/search", get(categories::search_categories))
        .route("/sort/batch", put(categories::batch_update_sort_order))
        .route(
            "/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/{id}/move", put(categories::move_category))
        .route("/{id}/sort", put(categories::update_sort_order))
}
