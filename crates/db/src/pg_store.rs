//! Postgres-backed [`CatalogStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use procforge_core::types::{DbId, TenantScope};

use crate::models::category::Category;
use crate::models::template_draft::{DraftFilter, TemplateDraft};
use crate::models::template_published::{PublishedFilter, TemplatePublished};
use crate::models::template_snapshot::TemplateSnapshot;
use crate::repositories::{
    CategoryRepo, TemplateDraftRepo, TemplatePublishedRepo, TemplateSnapshotRepo,
};
use crate::store::{CatalogStore, CatalogTx, StoreResult};
use crate::DbPool;

/// Catalog store over a Postgres pool. Each unit of work is one database
/// transaction.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: DbPool,
}

impl PgCatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn begin(&self) -> StoreResult<Box<dyn CatalogTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCatalogTx { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// A live Postgres transaction. Rolled back on drop unless committed.
pub struct PgCatalogTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogTx for PgCatalogTx {
    async fn find_category(
        &mut self,
        scope: &TenantScope,
        id: DbId,
    ) -> StoreResult<Option<Category>> {
        Ok(CategoryRepo::find_by_id(&mut self.tx, scope, id).await?)
    }

    async fn count_categories_by_code(
        &mut self,
        scope: &TenantScope,
        code: &str,
        exclude: Option<DbId>,
    ) -> StoreResult<i64> {
        Ok(CategoryRepo::count_by_code(&mut self.tx, scope, code, exclude).await?)
    }

    async fn insert_category(&mut self, category: &Category) -> StoreResult<Category> {
        Ok(CategoryRepo::create(&mut self.tx, category).await?)
    }

    async fn update_category(
        &mut self,
        category: &Category,
        expected_version: i32,
    ) -> StoreResult<Option<Category>> {
        Ok(CategoryRepo::update(&mut self.tx, category, expected_version).await?)
    }

    async fn soft_delete_category(
        &mut self,
        scope: &TenantScope,
        id: DbId,
        expected_version: i32,
        actor: &str,
    ) -> StoreResult<bool> {
        Ok(CategoryRepo::soft_delete(&mut self.tx, scope, id, expected_version, actor).await?)
    }

    async fn list_categories(&mut self, scope: &TenantScope) -> StoreResult<Vec<Category>> {
        Ok(CategoryRepo::list(&mut self.tx, scope).await?)
    }

    async fn search_categories(
        &mut self,
        scope: &TenantScope,
        keyword: &str,
    ) -> StoreResult<Vec<Category>> {
        Ok(CategoryRepo::search(&mut self.tx, scope, keyword).await?)
    }

    async fn find_descendants(
        &mut self,
        scope: &TenantScope,
        path: &str,
    ) -> StoreResult<Vec<Category>> {
        Ok(CategoryRepo::find_descendants(&mut self.tx, scope, path).await?)
    }

    async fn count_child_categories(&mut self, scope: &TenantScope, id: DbId) -> StoreResult<i64> {
        Ok(CategoryRepo::count_children(&mut self.tx, scope, id).await?)
    }

    async fn count_linked_templates(
        &mut self,
        scope: &TenantScope,
        category_id: DbId,
    ) -> StoreResult<i64> {
        Ok(CategoryRepo::count_linked_templates(&mut self.tx, scope, category_id).await?)
    }

    async fn linked_template_counts(
        &mut self,
        scope: &TenantScope,
    ) -> StoreResult<HashMap<DbId, i64>> {
        Ok(CategoryRepo::linked_template_counts(&mut self.tx, scope).await?)
    }

    async fn find_draft(
        &mut self,
        scope: &TenantScope,
        id: DbId,
    ) -> StoreResult<Option<TemplateDraft>> {
        Ok(TemplateDraftRepo::find_by_id(&mut self.tx, scope, id).await?)
    }

    async fn count_drafts_by_key(&mut self, scope: &TenantScope, key: &str) -> StoreResult<i64> {
        Ok(TemplateDraftRepo::count_by_key(&mut self.tx, scope, key).await?)
    }

    async fn insert_draft(&mut self, draft: &TemplateDraft) -> StoreResult<TemplateDraft> {
        Ok(TemplateDraftRepo::create(&mut self.tx, draft).await?)
    }

    async fn update_draft(
        &mut self,
        draft: &TemplateDraft,
        expected_version: i32,
    ) -> StoreResult<Option<TemplateDraft>> {
        Ok(TemplateDraftRepo::update(&mut self.tx, draft, expected_version).await?)
    }

    async fn delete_draft(
        &mut self,
        scope: &TenantScope,
        id: DbId,
        expected_version: Option<i32>,
    ) -> StoreResult<bool> {
        Ok(TemplateDraftRepo::delete(&mut self.tx, scope, id, expected_version).await?)
    }

    async fn list_drafts(&mut self, filter: &DraftFilter) -> StoreResult<Vec<TemplateDraft>> {
        Ok(TemplateDraftRepo::list(&mut self.tx, filter).await?)
    }

    async fn count_drafts(&mut self, filter: &DraftFilter) -> StoreResult<i64> {
        Ok(TemplateDraftRepo::count(&mut self.tx, filter).await?)
    }

    async fn find_published(
        &mut self,
        scope: &TenantScope,
        id: DbId,
    ) -> StoreResult<Option<TemplatePublished>> {
        Ok(TemplatePublishedRepo::find_by_id(&mut self.tx, scope, id).await?)
    }

    async fn max_flow_version(
        &mut self,
        scope: &TenantScope,
        key: &str,
    ) -> StoreResult<Option<i32>> {
        Ok(TemplatePublishedRepo::max_flow_version(&mut self.tx, scope, key).await?)
    }

    async fn count_published_by_key(
        &mut self,
        scope: &TenantScope,
        key: &str,
    ) -> StoreResult<i64> {
        Ok(TemplatePublishedRepo::count_by_key(&mut self.tx, scope, key).await?)
    }

    async fn insert_published(
        &mut self,
        published: &TemplatePublished,
    ) -> StoreResult<TemplatePublished> {
        Ok(TemplatePublishedRepo::create(&mut self.tx, published).await?)
    }

    async fn update_published(
        &mut self,
        published: &TemplatePublished,
        expected_version: i32,
    ) -> StoreResult<Option<TemplatePublished>> {
        Ok(TemplatePublishedRepo::update(&mut self.tx, published, expected_version).await?)
    }

    async fn list_published(
        &mut self,
        filter: &PublishedFilter,
    ) -> StoreResult<Vec<TemplatePublished>> {
        Ok(TemplatePublishedRepo::list(&mut self.tx, filter).await?)
    }

    async fn count_published(&mut self, filter: &PublishedFilter) -> StoreResult<i64> {
        Ok(TemplatePublishedRepo::count(&mut self.tx, filter).await?)
    }

    async fn find_snapshot(
        &mut self,
        scope: &TenantScope,
        id: DbId,
    ) -> StoreResult<Option<TemplateSnapshot>> {
        Ok(TemplateSnapshotRepo::find_by_id(&mut self.tx, scope, id).await?)
    }

    async fn max_snapshot_version(
        &mut self,
        scope: &TenantScope,
        key: &str,
    ) -> StoreResult<Option<i32>> {
        Ok(TemplateSnapshotRepo::max_snapshot_version(&mut self.tx, scope, key).await?)
    }

    async fn insert_snapshot(
        &mut self,
        snapshot: &TemplateSnapshot,
    ) -> StoreResult<TemplateSnapshot> {
        Ok(TemplateSnapshotRepo::create(&mut self.tx, snapshot).await?)
    }

    async fn delete_snapshot(&mut self, scope: &TenantScope, id: DbId) -> StoreResult<bool> {
        Ok(TemplateSnapshotRepo::delete(&mut self.tx, scope, id).await?)
    }

    async fn list_snapshots(
        &mut self,
        scope: &TenantScope,
        key: &str,
    ) -> StoreResult<Vec<TemplateSnapshot>> {
        Ok(TemplateSnapshotRepo::list_by_key(&mut self.tx, scope, key).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
