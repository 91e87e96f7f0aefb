//! In-memory [`CatalogStore`] for tests and `STORE_BACKEND=memory`.
//!
//! A unit of work holds the state lock for its whole lifetime and edits a
//! private copy, which replaces the shared state on commit. Units of work
//! are therefore serialized; a dropped one leaves the state untouched.
//! The same unique indexes as the migrations are enforced on every write.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use procforge_core::category_tree::{is_strict_descendant, sibling_order};
use procforge_core::search::matches_keyword;
use procforge_core::types::{DbId, TenantScope};

use crate::models::category::Category;
use crate::models::template_draft::{DraftFilter, TemplateDraft};
use crate::models::template_published::{PublishedFilter, TemplatePublished};
use crate::models::template_snapshot::TemplateSnapshot;
use crate::store::{CatalogStore, CatalogTx, StoreError, StoreResult};

/// Constraint names, shared with the SQL migrations.
pub const UQ_CATEGORY_CODE: &str = "uq_process_categories_scope_code";
pub const UQ_DRAFT_KEY: &str = "uq_process_template_drafts_scope_key";
pub const UQ_PUBLISHED_VERSION: &str = "uq_process_template_published_scope_key_version";
pub const UQ_SNAPSHOT_VERSION: &str = "uq_process_template_snapshots_scope_key_version";

#[derive(Debug, Clone, Default)]
struct MemoryState {
    categories: HashMap<DbId, Category>,
    drafts: HashMap<DbId, TemplateDraft>,
    published: HashMap<DbId, TemplatePublished>,
    snapshots: HashMap<DbId, TemplateSnapshot>,
}

/// Process-local catalog store.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn begin(&self) -> StoreResult<Box<dyn CatalogTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn same_scope(
    tenant_id: &str,
    app_id: &Option<String>,
    context_id: &Option<String>,
    scope: &TenantScope,
) -> bool {
    tenant_id == scope.tenant_id && *app_id == scope.app_id && *context_id == scope.context_id
}

fn unique_violation(constraint: &str) -> StoreError {
    StoreError::UniqueViolation(constraint.to_string())
}

/// Apply `offset`/`limit` to an already ordered list.
fn page<T>(items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

impl MemoryTx {
    fn live_categories<'a>(&'a self, scope: &'a TenantScope) -> impl Iterator<Item = &'a Category> {
        self.working
            .categories
            .values()
            .filter(move |c| !c.is_deleted() && c.in_scope(scope))
    }

    fn check_category_code(&self, category: &Category) -> StoreResult<()> {
        let scope = category.scope();
        let taken = self
            .live_categories(&scope)
            .any(|c| c.id != category.id && c.code == category.code);
        if taken {
            return Err(unique_violation(UQ_CATEGORY_CODE));
        }
        Ok(())
    }

    fn draft_matches(draft: &TemplateDraft, filter: &DraftFilter) -> bool {
        same_scope(&draft.tenant_id, &draft.app_id, &draft.context_id, &filter.scope)
            && filter.category_id.map_or(true, |id| draft.category_id == id)
            && filter.keyword.as_deref().map_or(true, |k| {
                matches_keyword(&draft.name, k) || matches_keyword(&draft.template_key, k)
            })
    }

    fn published_matches(published: &TemplatePublished, filter: &PublishedFilter) -> bool {
        same_scope(
            &published.tenant_id,
            &published.app_id,
            &published.context_id,
            &filter.scope,
        ) && filter.category_id.map_or(true, |id| published.category_id == id)
            && filter.status.map_or(true, |s| published.status == s)
            && filter.keyword.as_deref().map_or(true, |k| {
                matches_keyword(&published.name, k) || matches_keyword(&published.template_key, k)
            })
    }

    fn sorted_drafts(&self, filter: &DraftFilter) -> Vec<TemplateDraft> {
        let mut drafts: Vec<TemplateDraft> = self
            .working
            .drafts
            .values()
            .filter(|d| Self::draft_matches(d, filter))
            .cloned()
            .collect();
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        drafts
    }

    fn sorted_published(&self, filter: &PublishedFilter) -> Vec<TemplatePublished> {
        let mut rows: Vec<TemplatePublished> = self
            .working
            .published
            .values()
            .filter(|p| Self::published_matches(p, filter))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        rows
    }
}

#[async_trait]
impl CatalogTx for MemoryTx {
    async fn find_category(
        &mut self,
        scope: &TenantScope,
        id: DbId,
    ) -> StoreResult<Option<Category>> {
        Ok(self
            .working
            .categories
            .get(&id)
            .filter(|c| !c.is_deleted() && c.in_scope(scope))
            .cloned())
    }

    async fn count_categories_by_code(
        &mut self,
        scope: &TenantScope,
        code: &str,
        exclude: Option<DbId>,
    ) -> StoreResult<i64> {
        Ok(self
            .live_categories(scope)
            .filter(|c| c.code == code && Some(c.id) != exclude)
            .count() as i64)
    }

    async fn insert_category(&mut self, category: &Category) -> StoreResult<Category> {
        if self.working.categories.contains_key(&category.id) {
            return Err(unique_violation("process_categories_pkey"));
        }
        self.check_category_code(category)?;
        self.working
            .categories
            .insert(category.id, category.clone());
        Ok(category.clone())
    }

    async fn update_category(
        &mut self,
        category: &Category,
        expected_version: i32,
    ) -> StoreResult<Option<Category>> {
        let current = match self.working.categories.get(&category.id) {
            Some(c) if !c.is_deleted() && c.version == expected_version => c.clone(),
            _ => return Ok(None),
        };
        self.check_category_code(category)?;

        let updated = Category {
            name: category.name.clone(),
            code: category.code.clone(),
            parent_id: category.parent_id,
            path: category.path.clone(),
            level: category.level,
            sort_order: category.sort_order,
            description: category.description.clone(),
            icon: category.icon.clone(),
            updated_by: category.updated_by.clone(),
            updated_at: Utc::now(),
            version: current.version + 1,
            ..current
        };
        self.working.categories.insert(updated.id, updated.clone());
        Ok(Some(updated))
    }

    async fn soft_delete_category(
        &mut self,
        scope: &TenantScope,
        id: DbId,
        expected_version: i32,
        actor: &str,
    ) -> StoreResult<bool> {
        match self.working.categories.get_mut(&id) {
            Some(c) if !c.is_deleted() && c.in_scope(scope) && c.version == expected_version => {
                let now = Utc::now();
                c.deleted_at = Some(now);
                c.updated_at = now;
                c.updated_by = actor.to_string();
                c.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_categories(&mut self, scope: &TenantScope) -> StoreResult<Vec<Category>> {
        let mut items: Vec<Category> = self.live_categories(scope).cloned().collect();
        items.sort_by(sibling_order);
        Ok(items)
    }

    async fn search_categories(
        &mut self,
        scope: &TenantScope,
        keyword: &str,
    ) -> StoreResult<Vec<Category>> {
        let mut items: Vec<Category> = self
            .live_categories(scope)
            .filter(|c| matches_keyword(&c.name, keyword) || matches_keyword(&c.code, keyword))
            .cloned()
            .collect();
        items.sort_by(sibling_order);
        Ok(items)
    }

    async fn find_descendants(
        &mut self,
        scope: &TenantScope,
        path: &str,
    ) -> StoreResult<Vec<Category>> {
        let mut items: Vec<Category> = self
            .live_categories(scope)
            .filter(|c| is_strict_descendant(&c.path, path))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| sibling_order(a, b)));
        Ok(items)
    }

    async fn count_child_categories(&mut self, scope: &TenantScope, id: DbId) -> StoreResult<i64> {
        Ok(self
            .live_categories(scope)
            .filter(|c| c.parent_id == Some(id))
            .count() as i64)
    }

    async fn count_linked_templates(
        &mut self,
        scope: &TenantScope,
        category_id: DbId,
    ) -> StoreResult<i64> {
        let drafts = self
            .working
            .drafts
            .values()
            .filter(|d| d.category_id == category_id && d.scope() == *scope)
            .count();
        let published = self
            .working
            .published
            .values()
            .filter(|p| p.category_id == category_id && p.scope() == *scope)
            .count();
        Ok((drafts + published) as i64)
    }

    async fn linked_template_counts(
        &mut self,
        scope: &TenantScope,
    ) -> StoreResult<HashMap<DbId, i64>> {
        let mut counts: HashMap<DbId, i64> = HashMap::new();
        let drafts = self
            .working
            .drafts
            .values()
            .filter(|d| d.scope() == *scope)
            .map(|d| d.category_id);
        let published = self
            .working
            .published
            .values()
            .filter(|p| p.scope() == *scope)
            .map(|p| p.category_id);
        for category_id in drafts.chain(published) {
            *counts.entry(category_id).or_default() += 1;
        }
        Ok(counts)
    }

    async fn find_draft(
        &mut self,
        scope: &TenantScope,
        id: DbId,
    ) -> StoreResult<Option<TemplateDraft>> {
        Ok(self
            .working
            .drafts
            .get(&id)
            .filter(|d| d.scope() == *scope)
            .cloned())
    }

    async fn count_drafts_by_key(&mut self, scope: &TenantScope, key: &str) -> StoreResult<i64> {
        Ok(self
            .working
            .drafts
            .values()
            .filter(|d| d.template_key == key && d.scope() == *scope)
            .count() as i64)
    }

    async fn insert_draft(&mut self, draft: &TemplateDraft) -> StoreResult<TemplateDraft> {
        if self.working.drafts.contains_key(&draft.id) {
            return Err(unique_violation("process_template_drafts_pkey"));
        }
        let scope = draft.scope();
        let taken = self
            .working
            .drafts
            .values()
            .any(|d| d.template_key == draft.template_key && d.scope() == scope);
        if taken {
            return Err(unique_violation(UQ_DRAFT_KEY));
        }
        self.working.drafts.insert(draft.id, draft.clone());
        Ok(draft.clone())
    }

    async fn update_draft(
        &mut self,
        draft: &TemplateDraft,
        expected_version: i32,
    ) -> StoreResult<Option<TemplateDraft>> {
        let current = match self.working.drafts.get(&draft.id) {
            Some(d) if d.version == expected_version => d.clone(),
            _ => return Ok(None),
        };
        let updated = TemplateDraft {
            name: draft.name.clone(),
            description: draft.description.clone(),
            content: draft.content.clone(),
            category_id: draft.category_id,
            category_name: draft.category_name.clone(),
            category_code: draft.category_code.clone(),
            tags: draft.tags.clone(),
            form_config: draft.form_config.clone(),
            updated_by: draft.updated_by.clone(),
            updated_at: Utc::now(),
            version: current.version + 1,
            ..current
        };
        self.working.drafts.insert(updated.id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_draft(
        &mut self,
        scope: &TenantScope,
        id: DbId,
        expected_version: Option<i32>,
    ) -> StoreResult<bool> {
        let matches = self.working.drafts.get(&id).is_some_and(|d| {
            d.scope() == *scope && expected_version.map_or(true, |v| d.version == v)
        });
        if matches {
            self.working.drafts.remove(&id);
        }
        Ok(matches)
    }

    async fn list_drafts(&mut self, filter: &DraftFilter) -> StoreResult<Vec<TemplateDraft>> {
        Ok(page(self.sorted_drafts(filter), filter.offset, filter.limit))
    }

    async fn count_drafts(&mut self, filter: &DraftFilter) -> StoreResult<i64> {
        Ok(self
            .working
            .drafts
            .values()
            .filter(|d| Self::draft_matches(d, filter))
            .count() as i64)
    }

    async fn find_published(
        &mut self,
        scope: &TenantScope,
        id: DbId,
    ) -> StoreResult<Option<TemplatePublished>> {
        Ok(self
            .working
            .published
            .get(&id)
            .filter(|p| p.scope() == *scope)
            .cloned())
    }

    async fn max_flow_version(
        &mut self,
        scope: &TenantScope,
        key: &str,
    ) -> StoreResult<Option<i32>> {
        Ok(self
            .working
            .published
            .values()
            .filter(|p| p.template_key == key && p.scope() == *scope)
            .map(|p| p.flow_version)
            .max())
    }

    async fn count_published_by_key(
        &mut self,
        scope: &TenantScope,
        key: &str,
    ) -> StoreResult<i64> {
        Ok(self
            .working
            .published
            .values()
            .filter(|p| p.template_key == key && p.scope() == *scope)
            .count() as i64)
    }

    async fn insert_published(
        &mut self,
        published: &TemplatePublished,
    ) -> StoreResult<TemplatePublished> {
        if self.working.published.contains_key(&published.id) {
            return Err(unique_violation("process_template_published_pkey"));
        }
        let scope = published.scope();
        let taken = self.working.published.values().any(|p| {
            p.template_key == published.template_key
                && p.flow_version == published.flow_version
                && p.scope() == scope
        });
        if taken {
            return Err(unique_violation(UQ_PUBLISHED_VERSION));
        }
        self.working
            .published
            .insert(published.id, published.clone());
        Ok(published.clone())
    }

    async fn update_published(
        &mut self,
        published: &TemplatePublished,
        expected_version: i32,
    ) -> StoreResult<Option<TemplatePublished>> {
        let current = match self.working.published.get(&published.id) {
            Some(p) if p.version == expected_version => p.clone(),
            _ => return Ok(None),
        };
        let updated = TemplatePublished {
            status: published.status,
            suspended_at: published.suspended_at,
            instance_count: published.instance_count,
            running_instance_count: published.running_instance_count,
            updated_at: Utc::now(),
            version: current.version + 1,
            ..current
        };
        self.working.published.insert(updated.id, updated.clone());
        Ok(Some(updated))
    }

    async fn list_published(
        &mut self,
        filter: &PublishedFilter,
    ) -> StoreResult<Vec<TemplatePublished>> {
        Ok(page(self.sorted_published(filter), filter.offset, filter.limit))
    }

    async fn count_published(&mut self, filter: &PublishedFilter) -> StoreResult<i64> {
        Ok(self
            .working
            .published
            .values()
            .filter(|p| Self::published_matches(p, filter))
            .count() as i64)
    }

    async fn find_snapshot(
        &mut self,
        scope: &TenantScope,
        id: DbId,
    ) -> StoreResult<Option<TemplateSnapshot>> {
        Ok(self
            .working
            .snapshots
            .get(&id)
            .filter(|s| s.scope() == *scope)
            .cloned())
    }

    async fn max_snapshot_version(
        &mut self,
        scope: &TenantScope,
        key: &str,
    ) -> StoreResult<Option<i32>> {
        Ok(self
            .working
            .snapshots
            .values()
            .filter(|s| s.template_key == key && s.scope() == *scope)
            .map(|s| s.snapshot_version)
            .max())
    }

    async fn insert_snapshot(
        &mut self,
        snapshot: &TemplateSnapshot,
    ) -> StoreResult<TemplateSnapshot> {
        if self.working.snapshots.contains_key(&snapshot.id) {
            return Err(unique_violation("process_template_snapshots_pkey"));
        }
        let scope = snapshot.scope();
        let taken = self.working.snapshots.values().any(|s| {
            s.template_key == snapshot.template_key
                && s.snapshot_version == snapshot.snapshot_version
                && s.scope() == scope
        });
        if taken {
            return Err(unique_violation(UQ_SNAPSHOT_VERSION));
        }
        self.working
            .snapshots
            .insert(snapshot.id, snapshot.clone());
        Ok(snapshot.clone())
    }

    async fn delete_snapshot(&mut self, scope: &TenantScope, id: DbId) -> StoreResult<bool> {
        let matches = self
            .working
            .snapshots
            .get(&id)
            .is_some_and(|s| s.scope() == *scope);
        if matches {
            self.working.snapshots.remove(&id);
        }
        Ok(matches)
    }

    async fn list_snapshots(
        &mut self,
        scope: &TenantScope,
        key: &str,
    ) -> StoreResult<Vec<TemplateSnapshot>> {
        let mut items: Vec<TemplateSnapshot> = self
            .working
            .snapshots
            .values()
            .filter(|s| s.template_key == key && s.scope() == *scope)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.snapshot_version.cmp(&a.snapshot_version));
        Ok(items)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use procforge_core::category_tree::root_path;
    use procforge_core::types::new_id;

    fn category(scope: &TenantScope, code: &str) -> Category {
        let id = new_id();
        let now = Utc::now();
        Category {
            id,
            name: code.to_string(),
            code: code.to_string(),
            parent_id: None,
            path: root_path(id),
            level: 0,
            sort_order: 0,
            description: None,
            icon: None,
            tenant_id: scope.tenant_id.clone(),
            app_id: scope.app_id.clone(),
            context_id: scope.context_id.clone(),
            version: 1,
            created_by: "test".to_string(),
            updated_by: "test".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn uncommitted_work_is_discarded() {
        let store = InMemoryCatalogStore::new();
        let scope = TenantScope::tenant("t1");
        let cat = category(&scope, "A");

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_category(&cat).await.unwrap();
            // dropped without commit
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_category(&scope, cat.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_work_is_visible() {
        let store = InMemoryCatalogStore::new();
        let scope = TenantScope::tenant("t1");
        let cat = category(&scope, "A");

        let mut tx = store.begin().await.unwrap();
        tx.insert_category(&cat).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_category(&scope, cat.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_code_in_scope_is_rejected() {
        let store = InMemoryCatalogStore::new();
        let scope = TenantScope::tenant("t1");
        let other = TenantScope::new("t1", Some("app".to_string()), None);

        let mut tx = store.begin().await.unwrap();
        tx.insert_category(&category(&scope, "A")).await.unwrap();
        tx.insert_category(&category(&other, "A")).await.unwrap();
        assert_matches!(
            tx.insert_category(&category(&scope, "A")).await,
            Err(StoreError::UniqueViolation(name)) if name == UQ_CATEGORY_CODE
        );
    }

    #[tokio::test]
    async fn stale_version_updates_nothing() {
        let store = InMemoryCatalogStore::new();
        let scope = TenantScope::tenant("t1");
        let cat = category(&scope, "A");

        let mut tx = store.begin().await.unwrap();
        tx.insert_category(&cat).await.unwrap();
        let renamed = Category {
            name: "Renamed".to_string(),
            ..cat.clone()
        };
        let first = tx.update_category(&renamed, 1).await.unwrap();
        assert_eq!(first.map(|c| c.version), Some(2));
        assert!(tx.update_category(&renamed, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn soft_deleted_categories_are_hidden_and_free_their_code() {
        let store = InMemoryCatalogStore::new();
        let scope = TenantScope::tenant("t1");
        let cat = category(&scope, "A");

        let mut tx = store.begin().await.unwrap();
        tx.insert_category(&cat).await.unwrap();
        assert!(tx
            .soft_delete_category(&scope, cat.id, 1, "test")
            .await
            .unwrap());
        assert!(tx.find_category(&scope, cat.id).await.unwrap().is_none());
        assert_eq!(tx.list_categories(&scope).await.unwrap().len(), 0);
        tx.insert_category(&category(&scope, "A")).await.unwrap();
    }

    #[test]
    fn page_applies_offset_then_limit() {
        assert_eq!(page(vec![1, 2, 3, 4, 5], 1, 2), vec![2, 3]);
        assert_eq!(page(vec![1, 2], 5, 2), Vec::<i32>::new());
    }
}
