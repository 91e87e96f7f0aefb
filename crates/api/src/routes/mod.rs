pub mod categories;
pub mod health;
pub mod templates;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /categories/tree                                  category forest
/// /categories/search                                keyword search
/// /categories                                       create
/// /categories/sort/batch                            batch reorder (PUT)
/// /categories/{id}                                  get, update, delete
/// /categories/{id}/move                             move (PUT)
/// /categories/{id}/sort                             reorder one (PUT)
///
/// /templates/drafts                                 list, create
/// /templates/drafts/{id}                            get, update, delete
/// /templates/drafts/{id}/publish                    publish (POST)
///
/// /templates/published                              list
/// /templates/published/{id}                         get
/// /templates/published/{id}/suspend                 suspend (POST)
/// /templates/published/{id}/activate                activate (POST)
/// /templates/published/{id}/instance-counts         record counters (PUT)
///
/// /templates/snapshots                              create
/// /templates/snapshots/by-key/{template_key}        list for a key
/// /templates/snapshots/{id}                         get, delete
/// /templates/snapshots/{id}/restore                 restore (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/categories", categories::router())
        .nest("/templates", templates::router())
}
