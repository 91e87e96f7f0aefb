//! Snapshot Versioner: immutable captures of drafts or published templates,
//! numbered per template key, restorable into new drafts.

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use procforge_core::error::CoreError;
use procforge_core::template::{
    next_version, restore_key, validate_template_name, SourceKind, TemplateStatus,
};
use procforge_core::types::{new_id, DbId, TenantScope};
use procforge_db::models::template_draft::TemplateDraft;
use procforge_db::models::template_snapshot::{CreateSnapshot, RestoreSnapshot, TemplateSnapshot};
use procforge_db::store::{CatalogStore, CatalogTx};

use crate::error::{conflict, not_found, on_unique, CatalogResult};
use crate::views::{CategoryIndex, DraftView};

const SNAPSHOT: &str = "TemplateSnapshot";

/// Collision retries when allocating a restore key within one millisecond.
const MAX_RESTORE_KEY_ATTEMPTS: u32 = 32;

/// Fields captured from whichever record a snapshot is taken of.
struct SnapshotSource {
    id: DbId,
    template_key: String,
    content: String,
    status: TemplateStatus,
    version: i32,
    category_id: DbId,
    category_name: String,
    category_code: String,
    tags: Vec<String>,
    form_config: Option<serde_json::Value>,
}

/// Captures, lists, restores and deletes snapshots.
#[derive(Clone)]
pub struct SnapshotVersioner {
    store: Arc<dyn CatalogStore>,
}

impl SnapshotVersioner {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Capture a draft or published template.
    ///
    /// The snapshot copies every denormalized field, so later edits to the
    /// source or its category leave it unchanged.
    pub async fn create_snapshot(
        &self,
        scope: &TenantScope,
        actor: &str,
        input: CreateSnapshot,
    ) -> CatalogResult<TemplateSnapshot> {
        input.validate().map_err(CoreError::from)?;
        let kind: SourceKind = input.source_kind.parse()?;
        validate_template_name(&input.snapshot_name)?;

        let mut tx = self.store.begin().await?;
        let source = load_source(tx.as_mut(), scope, kind, input.source_template_id).await?;

        let snapshot_version =
            next_version(tx.max_snapshot_version(scope, &source.template_key).await?);
        let snapshot = TemplateSnapshot {
            id: new_id(),
            template_key: source.template_key,
            snapshot_name: input.snapshot_name.trim().to_string(),
            content: source.content,
            source_template_id: source.id,
            source_template_status: source.status,
            source_template_version: source.version,
            category_id: source.category_id,
            category_name: source.category_name,
            category_code: source.category_code,
            tags: source.tags,
            form_config: source.form_config,
            tenant_id: scope.tenant_id.clone(),
            app_id: scope.app_id.clone(),
            context_id: scope.context_id.clone(),
            snapshot_version,
            created_by: actor.to_string(),
            created_at: Utc::now(),
        };

        let created = on_unique(tx.insert_snapshot(&snapshot).await, || {
            conflict(SNAPSHOT, source.id)
        })?;
        on_unique(tx.commit().await, || conflict(SNAPSHOT, source.id))?;

        tracing::info!(
            snapshot_id = %created.id,
            template_key = %created.template_key,
            snapshot_version = created.snapshot_version,
            source_status = %created.source_template_status,
            "Snapshot created",
        );
        Ok(created)
    }

    pub async fn get_snapshot(
        &self,
        scope: &TenantScope,
        id: DbId,
    ) -> CatalogResult<TemplateSnapshot> {
        let mut tx = self.store.begin().await?;
        Ok(tx
            .find_snapshot(scope, id)
            .await?
            .ok_or_else(|| not_found(SNAPSHOT, id))?)
    }

    /// Snapshots of a template key, newest first.
    pub async fn list_snapshots(
        &self,
        scope: &TenantScope,
        template_key: &str,
    ) -> CatalogResult<Vec<TemplateSnapshot>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_snapshots(scope, template_key).await?)
    }

    /// Restore a snapshot into a new draft under a fresh key.
    ///
    /// The key is `{key}_restore_{millis}`, with an attempt counter appended
    /// while it collides with an existing draft or published template. The
    /// snapshot itself is left untouched.
    pub async fn restore_snapshot(
        &self,
        scope: &TenantScope,
        actor: &str,
        id: DbId,
        input: RestoreSnapshot,
    ) -> CatalogResult<DraftView> {
        input.validate().map_err(CoreError::from)?;
        if let Some(name) = &input.new_template_name {
            validate_template_name(name)?;
        }

        let mut tx = self.store.begin().await?;
        let snapshot = tx
            .find_snapshot(scope, id)
            .await?
            .ok_or_else(|| not_found(SNAPSHOT, id))?;

        let key = allocate_restore_key(tx.as_mut(), scope, &snapshot.template_key).await?;

        // Prefer the live category; fall back to what was captured.
        let (category_id, category_name, category_code) =
            match tx.find_category(scope, snapshot.category_id).await? {
                Some(category) => (category.id, category.name, category.code),
                None => (
                    snapshot.category_id,
                    snapshot.category_name.clone(),
                    snapshot.category_code.clone(),
                ),
            };

        let now = Utc::now();
        let draft = TemplateDraft {
            id: new_id(),
            template_key: key.clone(),
            name: input
                .new_template_name
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| snapshot.snapshot_name.clone()),
            description: Some(format!("Restored from snapshot: {}", snapshot.snapshot_name)),
            content: snapshot.content.clone(),
            category_id,
            category_name,
            category_code,
            tags: snapshot.tags.clone(),
            form_config: snapshot.form_config.clone(),
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

        let created = on_unique(tx.insert_draft(&draft).await, || conflict(SNAPSHOT, id))?;
        let index = CategoryIndex::load(tx.as_mut(), scope).await?;
        on_unique(tx.commit().await, || conflict(SNAPSHOT, id))?;

        tracing::info!(
            snapshot_id = %id,
            draft_id = %created.id,
            template_key = %key,
            "Snapshot restored",
        );
        Ok(index.draft_view(created))
    }

    /// Delete a snapshot.
    pub async fn delete_snapshot(&self, scope: &TenantScope, id: DbId) -> CatalogResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_snapshot(scope, id).await? {
            return Err(not_found(SNAPSHOT, id).into());
        }
        tx.commit().await?;

        tracing::info!(snapshot_id = %id, scope = %scope, "Snapshot deleted");
        Ok(())
    }
}

async fn load_source(
    tx: &mut dyn CatalogTx,
    scope: &TenantScope,
    kind: SourceKind,
    id: DbId,
) -> CatalogResult<SnapshotSource> {
    let source = match kind {
        SourceKind::Draft => {
            let d = tx
                .find_draft(scope, id)
                .await?
                .ok_or_else(|| not_found("TemplateDraft", id))?;
            SnapshotSource {
                id: d.id,
                template_key: d.template_key,
                content: d.content,
                status: d.status,
                version: d.version,
                category_id: d.category_id,
                category_name: d.category_name,
                category_code: d.category_code,
                tags: d.tags,
                form_config: d.form_config,
            }
        }
        SourceKind::Published => {
            let p = tx
                .find_published(scope, id)
                .await?
                .ok_or_else(|| not_found("TemplatePublished", id))?;
            SnapshotSource {
                id: p.id,
                template_key: p.template_key,
                content: p.content,
                status: p.status,
                version: p.flow_version,
                category_id: p.category_id,
                category_name: p.category_name,
                category_code: p.category_code,
                tags: p.tags,
                form_config: p.form_config,
            }
        }
    };
    Ok(source)
}

/// Find a restore key used by neither a draft nor a published template.
async fn allocate_restore_key(
    tx: &mut dyn CatalogTx,
    scope: &TenantScope,
    original_key: &str,
) -> CatalogResult<String> {
    let suffix = Utc::now().timestamp_millis();
    for attempt in 0..MAX_RESTORE_KEY_ATTEMPTS {
        let key = restore_key(original_key, suffix, attempt);
        if tx.count_drafts_by_key(scope, &key).await? == 0
            && tx.count_published_by_key(scope, &key).await? == 0
        {
            return Ok(key);
        }
    }
    Err(CoreError::Internal(format!(
        "Could not allocate a unique restore key for '{original_key}'"
    ))
    .into())
}
