//! Unit-of-work contract over the catalog tables.
//!
//! Managers open a [`CatalogTx`] per command, read and write through it,
//! then commit. Dropping a transaction without committing rolls it back.
//! Both the Postgres and in-memory backends enforce the same unique
//! constraints and report violations as [`StoreError::UniqueViolation`].

use std::collections::HashMap;

use async_trait::async_trait;

use procforge_core::types::{DbId, TenantScope};

use crate::models::category::Category;
use crate::models::template_draft::{DraftFilter, TemplateDraft};
use crate::models::template_published::{PublishedFilter, TemplatePublished};
use crate::models::template_snapshot::TemplateSnapshot;

pub use sqlx::Error as DatabaseError;

/// Postgres SQLSTATE for `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(DatabaseError),

    /// A unique index rejected the write. Carries the constraint name.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entry point to a catalog backend.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Open a unit of work.
    async fn begin(&self) -> StoreResult<Box<dyn CatalogTx>>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> StoreResult<()>;

    /// Short backend name for logs and the health endpoint.
    fn backend_name(&self) -> &'static str;
}

/// One all-or-nothing unit of work.
///
/// Every lookup is restricted to the given tenant scope; soft-deleted
/// categories are never returned. Conditional updates take the version the
/// caller read and return `None` when the row changed in the meantime.
#[async_trait]
pub trait CatalogTx: Send {
    // -- categories ---------------------------------------------------------

    async fn find_category(&mut self, scope: &TenantScope, id: DbId)
        -> StoreResult<Option<Category>>;

    /// Non-deleted categories using `code` in scope, ignoring `exclude`.
    async fn count_categories_by_code(
        &mut self,
        scope: &TenantScope,
        code: &str,
        exclude: Option<DbId>,
    ) -> StoreResult<i64>;

    async fn insert_category(&mut self, category: &Category) -> StoreResult<Category>;

    /// Write placement and own fields; bumps the version.
    async fn update_category(
        &mut self,
        category: &Category,
        expected_version: i32,
    ) -> StoreResult<Option<Category>>;

    async fn soft_delete_category(
        &mut self,
        scope: &TenantScope,
        id: DbId,
        expected_version: i32,
        actor: &str,
    ) -> StoreResult<bool>;

    /// All non-deleted categories in scope, ordered by `(sort_order, id)`.
    async fn list_categories(&mut self, scope: &TenantScope) -> StoreResult<Vec<Category>>;

    /// Name or code contains `keyword`, case-insensitively.
    async fn search_categories(
        &mut self,
        scope: &TenantScope,
        keyword: &str,
    ) -> StoreResult<Vec<Category>>;

    /// Strict descendants of the node at `path`, located by path prefix.
    async fn find_descendants(
        &mut self,
        scope: &TenantScope,
        path: &str,
    ) -> StoreResult<Vec<Category>>;

    async fn count_child_categories(&mut self, scope: &TenantScope, id: DbId) -> StoreResult<i64>;

    /// Drafts plus published templates filed under the category.
    async fn count_linked_templates(
        &mut self,
        scope: &TenantScope,
        category_id: DbId,
    ) -> StoreResult<i64>;

    /// Per-category linked template counts for the whole scope.
    async fn linked_template_counts(
        &mut self,
        scope: &TenantScope,
    ) -> StoreResult<HashMap<DbId, i64>>;

    // -- drafts -------------------------------------------------------------

    async fn find_draft(&mut self, scope: &TenantScope, id: DbId)
        -> StoreResult<Option<TemplateDraft>>;

    async fn count_drafts_by_key(&mut self, scope: &TenantScope, key: &str) -> StoreResult<i64>;

    async fn insert_draft(&mut self, draft: &TemplateDraft) -> StoreResult<TemplateDraft>;

    async fn update_draft(
        &mut self,
        draft: &TemplateDraft,
        expected_version: i32,
    ) -> StoreResult<Option<TemplateDraft>>;

    /// Delete a draft. With `expected_version`, only if it is unchanged.
    async fn delete_draft(
        &mut self,
        scope: &TenantScope,
        id: DbId,
        expected_version: Option<i32>,
    ) -> StoreResult<bool>;

    /// Page of drafts ordered by `updated_at` desc, then id.
    async fn list_drafts(&mut self, filter: &DraftFilter) -> StoreResult<Vec<TemplateDraft>>;

    async fn count_drafts(&mut self, filter: &DraftFilter) -> StoreResult<i64>;

    // -- published ----------------------------------------------------------

    async fn find_published(
        &mut self,
        scope: &TenantScope,
        id: DbId,
    ) -> StoreResult<Option<TemplatePublished>>;

    async fn max_flow_version(&mut self, scope: &TenantScope, key: &str)
        -> StoreResult<Option<i32>>;

    async fn count_published_by_key(&mut self, scope: &TenantScope, key: &str)
        -> StoreResult<i64>;

    async fn insert_published(
        &mut self,
        published: &TemplatePublished,
    ) -> StoreResult<TemplatePublished>;

    /// Write status and counters; bumps the version.
    async fn update_published(
        &mut self,
        published: &TemplatePublished,
        expected_version: i32,
    ) -> StoreResult<Option<TemplatePublished>>;

    /// Page of published templates ordered by `published_at` desc, then id.
    async fn list_published(
        &mut self,
        filter: &PublishedFilter,
    ) -> StoreResult<Vec<TemplatePublished>>;

    async fn count_published(&mut self, filter: &PublishedFilter) -> StoreResult<i64>;

    // -- snapshots ----------------------------------------------------------

    async fn find_snapshot(
        &mut self,
        scope: &TenantScope,
        id: DbId,
    ) -> StoreResult<Option<TemplateSnapshot>>;

    async fn max_snapshot_version(
        &mut self,
        scope: &TenantScope,
        key: &str,
    ) -> StoreResult<Option<i32>>;

    async fn insert_snapshot(&mut self, snapshot: &TemplateSnapshot)
        -> StoreResult<TemplateSnapshot>;

    async fn delete_snapshot(&mut self, scope: &TenantScope, id: DbId) -> StoreResult<bool>;

    /// Snapshots of `key` ordered by `snapshot_version` desc.
    async fn list_snapshots(
        &mut self,
        scope: &TenantScope,
        key: &str,
    ) -> StoreResult<Vec<TemplateSnapshot>>;

    // -- completion ---------------------------------------------------------

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
