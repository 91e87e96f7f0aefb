//! Template Lifecycle Manager: drafts, publication, suspension and
//! re-activation, coordinated with the deployment gateway.
//!
//! No unit of work is held open across a gateway call. Publish reads the
//! draft, deploys, then re-checks the draft in a second unit of work before
//! creating the published row and consuming the draft; a draft that was
//! changed or consumed in between aborts with `ConcurrentModification`.

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use procforge_core::content::ContentValidator;
use procforge_core::deployment::{DeploymentGateway, DeploymentReceipt, DeploymentRequest};
use procforge_core::error::CoreError;
use procforge_core::search::{
    clamp_limit, clamp_offset, normalize_keyword, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use procforge_core::template::{
    ensure_activatable, ensure_suspendable, next_version, validate_instance_counts,
    validate_template_key, validate_template_name, TemplateStatus,
};
use procforge_core::types::{new_id, DbId, TenantScope};
use procforge_db::models::category::Category;
use procforge_db::models::template_draft::{CreateDraft, DraftFilter, TemplateDraft, UpdateDraft};
use procforge_db::models::template_published::{
    InstanceCounts, PublishedFilter, TemplatePublished,
};
use procforge_db::store::{CatalogStore, CatalogTx};

use crate::error::{conflict, not_found, on_unique, CatalogResult};
use crate::views::{CategoryIndex, DraftView, Page, PublishedView};

const DRAFT: &str = "TemplateDraft";
const PUBLISHED: &str = "TemplatePublished";

/// Listing parameters for drafts.
#[derive(Debug, Clone, Default)]
pub struct DraftQuery {
    pub category_id: Option<DbId>,
    pub keyword: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Listing parameters for published templates.
#[derive(Debug, Clone, Default)]
pub struct PublishedQuery {
    pub category_id: Option<DbId>,
    pub status: Option<TemplateStatus>,
    pub keyword: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Orchestrates `DRAFT -> ACTIVE <-> INACTIVE`.
#[derive(Clone)]
pub struct TemplateLifecycleManager {
    store: Arc<dyn CatalogStore>,
    gateway: Arc<dyn DeploymentGateway>,
    validator: Arc<dyn ContentValidator>,
}

impl TemplateLifecycleManager {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        gateway: Arc<dyn DeploymentGateway>,
        validator: Arc<dyn ContentValidator>,
    ) -> Self {
        Self {
            store,
            gateway,
            validator,
        }
    }

    // -----------------------------------------------------------------------
    // Drafts
    // -----------------------------------------------------------------------

    /// Design a new draft.
    pub async fn create_draft(
        &self,
        scope: &TenantScope,
        actor: &str,
        input: CreateDraft,
    ) -> CatalogResult<DraftView> {
        input.validate().map_err(CoreError::from)?;
        let key = input.template_key.trim().to_string();
        validate_template_key(&key)?;
        validate_template_name(&input.name)?;

        let mut tx = self.store.begin().await?;

        if tx.count_drafts_by_key(scope, &key).await? > 0 {
            return Err(CoreError::DuplicateKey(key).into());
        }
        let category = find_category(tx.as_mut(), scope, input.category_id).await?;
        self.validator.check(&input.content)?;

        let now = Utc::now();
        let draft = TemplateDraft {
            id: new_id(),
            template_key: key.clone(),
            name: input.name.trim().to_string(),
            description: input.description,
            content: input.content,
            category_id: category.id,
            category_name: category.name,
            category_code: category.code,
            tags: input.tags.unwrap_or_default(),
            form_config: input.form_config,
            tenant_id: scope.tenant_id.clone(),
            app_id: scope.app_id.clone(),
            context_id: scope.context_id.clone(),
            status: TemplateStatus::Draft,
            version: 1,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };

        let created = on_unique(tx.insert_draft(&draft).await, || {
            CoreError::DuplicateKey(key.clone())
        })?;
        let index = CategoryIndex::load(tx.as_mut(), scope).await?;
        on_unique(tx.commit().await, || CoreError::DuplicateKey(key))?;

        tracing::info!(
            draft_id = %created.id,
            template_key = %created.template_key,
            scope = %scope,
            "Draft created",
        );
        Ok(index.draft_view(created))
    }

    /// Edit a draft under optimistic concurrency.
    pub async fn update_draft(
        &self,
        scope: &TenantScope,
        actor: &str,
        id: DbId,
        input: UpdateDraft,
    ) -> CatalogResult<DraftView> {
        input.validate().map_err(CoreError::from)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .find_draft(scope, id)
            .await?
            .ok_or_else(|| not_found(DRAFT, id))?;

        if input.version.is_some_and(|v| v != current.version) {
            tracing::warn!(draft_id = %id, "Draft update based on a stale version");
            return Err(conflict(DRAFT, id).into());
        }

        let mut next = current.clone();
        if let Some(name) = input.name {
            validate_template_name(&name)?;
            next.name = name.trim().to_string();
        }
        if input.description.is_some() {
            next.description = input.description;
        }
        if let Some(category_id) = input.category_id {
            let category = find_category(tx.as_mut(), scope, category_id).await?;
            next.category_id = category.id;
            next.category_name = category.name;
            next.category_code = category.code;
        }
        if let Some(content) = input.content {
            next.content = content;
        }
        self.validator.check(&next.content)?;
        if let Some(tags) = input.tags {
            next.tags = tags;
        }
        if input.form_config.is_some() {
            next.form_config = input.form_config;
        }
        next.updated_by = actor.to_string();

        let updated = tx
            .update_draft(&next, current.version)
            .await?
            .ok_or_else(|| conflict(DRAFT, id))?;
        let index = CategoryIndex::load(tx.as_mut(), scope).await?;
        tx.commit().await?;

        tracing::info!(draft_id = %id, version = updated.version, "Draft updated");
        Ok(index.draft_view(updated))
    }

    /// Delete a draft.
    pub async fn delete_draft(&self, scope: &TenantScope, id: DbId) -> CatalogResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_draft(scope, id, None).await? {
            return Err(not_found(DRAFT, id).into());
        }
        tx.commit().await?;

        tracing::info!(draft_id = %id, scope = %scope, "Draft deleted");
        Ok(())
    }

    pub async fn get_draft(&self, scope: &TenantScope, id: DbId) -> CatalogResult<DraftView> {
        let mut tx = self.store.begin().await?;
        let draft = tx
            .find_draft(scope, id)
            .await?
            .ok_or_else(|| not_found(DRAFT, id))?;
        let index = CategoryIndex::load(tx.as_mut(), scope).await?;
        Ok(index.draft_view(draft))
    }

    /// Page of drafts, most recently updated first.
    pub async fn list_drafts(
        &self,
        scope: &TenantScope,
        query: DraftQuery,
    ) -> CatalogResult<Page<DraftView>> {
        let filter = DraftFilter {
            scope: scope.clone(),
            category_id: query.category_id,
            keyword: normalize_keyword(query.keyword.as_deref()),
            limit: clamp_limit(query.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
            offset: clamp_offset(query.offset),
        };

        let mut tx = self.store.begin().await?;
        let drafts = tx.list_drafts(&filter).await?;
        let total = tx.count_drafts(&filter).await?;
        let index = CategoryIndex::load(tx.as_mut(), scope).await?;

        Ok(Page {
            items: drafts.into_iter().map(|d| index.draft_view(d)).collect(),
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    // -----------------------------------------------------------------------
    // Publication
    // -----------------------------------------------------------------------

    /// Deploy a draft and replace it with a published template.
    ///
    /// The flow version is allocated per the key the engine returns, which
    /// may differ from the draft's key.
    pub async fn publish(
        &self,
        scope: &TenantScope,
        actor: &str,
        draft_id: DbId,
    ) -> CatalogResult<PublishedView> {
        let draft = {
            let mut tx = self.store.begin().await?;
            tx.find_draft(scope, draft_id)
                .await?
                .ok_or_else(|| not_found(DRAFT, draft_id))?
        };
        self.validator.check(&draft.content)?;

        let request = DeploymentRequest {
            name: &draft.name,
            requested_key: &draft.template_key,
            content: &draft.content,
        };
        let receipt = self.gateway.deploy(&request).await.map_err(|e| {
            tracing::warn!(draft_id = %draft_id, error = %e, "Deployment failed");
            CoreError::DeploymentFailed(e.to_string())
        })?;

        if receipt.definition_key != draft.template_key {
            tracing::info!(
                draft_id = %draft_id,
                requested_key = %draft.template_key,
                authoritative_key = %receipt.definition_key,
                "Engine assigned a different definition key",
            );
        }

        match self.record_publication(scope, actor, &draft, &receipt).await {
            Ok(view) => {
                tracing::info!(
                    draft_id = %draft_id,
                    published_id = %view.published.id,
                    template_key = %view.published.template_key,
                    flow_version = view.published.flow_version,
                    deployment_id = %receipt.deployment_id,
                    "Template published",
                );
                Ok(view)
            }
            Err(err) => {
                tracing::warn!(
                    draft_id = %draft_id,
                    deployment_id = %receipt.deployment_id,
                    error = %err,
                    "Deployment succeeded but publication was not recorded",
                );
                Err(err)
            }
        }
    }

    /// Second half of publish: re-check the draft, insert the published row
    /// and consume the draft, all in one unit of work.
    async fn record_publication(
        &self,
        scope: &TenantScope,
        actor: &str,
        draft: &TemplateDraft,
        receipt: &DeploymentReceipt,
    ) -> CatalogResult<PublishedView> {
        let mut tx = self.store.begin().await?;

        match tx.find_draft(scope, draft.id).await? {
            Some(current) if current.version == draft.version => {}
            _ => return Err(conflict(DRAFT, draft.id).into()),
        }

        let key = receipt.definition_key.clone();
        let flow_version = next_version(tx.max_flow_version(scope, &key).await?);
        let now = Utc::now();
        let published = TemplatePublished {
            id: new_id(),
            template_key: key,
            requested_key: draft.template_key.clone(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            content: draft.content.clone(),
            deployment_ref: receipt.deployment_id.clone(),
            definition_ref: receipt.definition_id.clone(),
            flow_version,
            category_id: draft.category_id,
            category_name: draft.category_name.clone(),
            category_code: draft.category_code.clone(),
            tags: draft.tags.clone(),
            form_config: draft.form_config.clone(),
            tenant_id: scope.tenant_id.clone(),
            app_id: scope.app_id.clone(),
            context_id: scope.context_id.clone(),
            status: TemplateStatus::Active,
            instance_count: 0,
            running_instance_count: 0,
            published_by: actor.to_string(),
            published_at: now,
            suspended_at: None,
            version: 1,
            updated_at: now,
        };

        let created = on_unique(tx.insert_published(&published).await, || {
            conflict(PUBLISHED, draft.id)
        })?;
        if !tx
            .delete_draft(scope, draft.id, Some(draft.version))
            .await?
        {
            return Err(conflict(DRAFT, draft.id).into());
        }
        let index = CategoryIndex::load(tx.as_mut(), scope).await?;
        on_unique(tx.commit().await, || conflict(PUBLISHED, draft.id))?;

        Ok(index.published_view(created))
    }

    /// Suspend an active template with no running instances.
    pub async fn suspend(&self, scope: &TenantScope, id: DbId) -> CatalogResult<PublishedView> {
        let current = self.read_published(scope, id).await?;
        ensure_suspendable(id, current.status, current.running_instance_count)?;

        self.gateway
            .suspend(&current.definition_ref)
            .await
            .map_err(|e| {
                tracing::warn!(published_id = %id, error = %e, "Engine suspend failed");
                CoreError::DeploymentFailed(e.to_string())
            })?;

        let next = TemplatePublished {
            status: TemplateStatus::Inactive,
            suspended_at: Some(Utc::now()),
            ..current.clone()
        };
        let view = self.write_published(scope, &next, current.version).await?;

        tracing::info!(published_id = %id, "Template suspended");
        Ok(view)
    }

    /// Re-activate a suspended template.
    pub async fn activate(&self, scope: &TenantScope, id: DbId) -> CatalogResult<PublishedView> {
        let current = self.read_published(scope, id).await?;
        ensure_activatable(id, current.status)?;

        self.gateway
            .activate(&current.definition_ref)
            .await
            .map_err(|e| {
                tracing::warn!(published_id = %id, error = %e, "Engine activate failed");
                CoreError::DeploymentFailed(e.to_string())
            })?;

        let next = TemplatePublished {
            status: TemplateStatus::Active,
            suspended_at: None,
            ..current.clone()
        };
        let view = self.write_published(scope, &next, current.version).await?;

        tracing::info!(published_id = %id, "Template activated");
        Ok(view)
    }

    /// Store engine-reported instance counters.
    pub async fn record_instance_counts(
        &self,
        scope: &TenantScope,
        id: DbId,
        counts: InstanceCounts,
    ) -> CatalogResult<PublishedView> {
        validate_instance_counts(counts.instance_count, counts.running_instance_count)?;

        let current = self.read_published(scope, id).await?;
        let next = TemplatePublished {
            instance_count: counts.instance_count,
            running_instance_count: counts.running_instance_count,
            ..current.clone()
        };
        let view = self.write_published(scope, &next, current.version).await?;

        tracing::debug!(
            published_id = %id,
            instance_count = counts.instance_count,
            running_instance_count = counts.running_instance_count,
            "Instance counts recorded",
        );
        Ok(view)
    }

    pub async fn get_published(
        &self,
        scope: &TenantScope,
        id: DbId,
    ) -> CatalogResult<PublishedView> {
        let mut tx = self.store.begin().await?;
        let published = tx
            .find_published(scope, id)
            .await?
            .ok_or_else(|| not_found(PUBLISHED, id))?;
        let index = CategoryIndex::load(tx.as_mut(), scope).await?;
        Ok(index.published_view(published))
    }

    /// Page of published templates, most recently published first.
    pub async fn list_published(
        &self,
        scope: &TenantScope,
        query: PublishedQuery,
    ) -> CatalogResult<Page<PublishedView>> {
        let filter = PublishedFilter {
            scope: scope.clone(),
            category_id: query.category_id,
            status: query.status,
            keyword: normalize_keyword(query.keyword.as_deref()),
            limit: clamp_limit(query.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
            offset: clamp_offset(query.offset),
        };

        let mut tx = self.store.begin().await?;
        let rows = tx.list_published(&filter).await?;
        let total = tx.count_published(&filter).await?;
        let index = CategoryIndex::load(tx.as_mut(), scope).await?;

        Ok(Page {
            items: rows.into_iter().map(|p| index.published_view(p)).collect(),
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    async fn read_published(
        &self,
        scope: &TenantScope,
        id: DbId,
    ) -> CatalogResult<TemplatePublished> {
        let mut tx = self.store.begin().await?;
        Ok(tx
            .find_published(scope, id)
            .await?
            .ok_or_else(|| not_found(PUBLISHED, id))?)
    }

    /// Conditionally write a published row read earlier at `expected_version`.
    async fn write_published(
        &self,
        scope: &TenantScope,
        next: &TemplatePublished,
        expected_version: i32,
    ) -> CatalogResult<PublishedView> {
        let mut tx = self.store.begin().await?;
        let updated = match tx.update_published(next, expected_version).await? {
            Some(updated) => updated,
            None => {
                tracing::warn!(published_id = %next.id, "Published template changed concurrently");
                return Err(conflict(PUBLISHED, next.id).into());
            }
        };
        let index = CategoryIndex::load(tx.as_mut(), scope).await?;
        tx.commit().await?;
        Ok(index.published_view(updated))
    }
}

/// Resolve a live category or fail with `CategoryNotFound`.
async fn find_category(
    tx: &mut dyn CatalogTx,
    scope: &TenantScope,
    id: DbId,
) -> CatalogResult<Category> {
    Ok(tx
        .find_category(scope, id)
        .await?
        .ok_or(CoreError::CategoryNotFound(id))?)
}
