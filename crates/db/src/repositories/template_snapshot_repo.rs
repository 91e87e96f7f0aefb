//! Repository for the `process_template_snapshots` table.

use sqlx::PgConnection;

use procforge_core::types::{DbId, TenantScope};

use super::scope_clause;
use crate::models::template_snapshot::TemplateSnapshot;

/// Column list for process_template_snapshots queries.
const COLUMNS: &str = "id, template_key, snapshot_name, content, source_template_id, \
    source_template_status, source_template_version, category_id, category_name, \
    category_code, tags, form_config, tenant_id, app_id, context_id, snapshot_version, \
    created_by, created_at";

/// Provides scoped insert, read and delete for snapshots.
pub struct TemplateSnapshotRepo;

impl TemplateSnapshotRepo {
    /// Find a snapshot by id within a scope.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        scope: &TenantScope,
        id: DbId,
    ) -> Result<Option<TemplateSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM process_template_snapshots WHERE id = $1 AND {}",
            scope_clause(2)
        );
        sqlx::query_as::<_, TemplateSnapshot>(&query)
            .bind(id)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Highest `snapshot_version` recorded for a key.
    pub async fn max_snapshot_version(
        conn: &mut PgConnection,
        scope: &TenantScope,
        key: &str,
    ) -> Result<Option<i32>, sqlx::Error> {
        let query = format!(
            "SELECT MAX(snapshot_version) FROM process_template_snapshots \
             WHERE template_key = $1 AND {}",
            scope_clause(2)
        );
        sqlx::query_scalar::<_, Option<i32>>(&query)
            .bind(key)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Insert a snapshot, returning it.
    pub async fn create(
        conn: &mut PgConnection,
        snapshot: &TemplateSnapshot,
    ) -> Result<TemplateSnapshot, sqlx::Error> {
        let query = format!(
            "INSERT INTO process_template_snapshots \
                (id, template_key, snapshot_name, content, source_template_id, \
                 source_template_status, source_template_version, category_id, category_name, \
                 category_code, tags, form_config, tenant_id, app_id, context_id, \
                 snapshot_version, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemplateSnapshot>(&query)
            .bind(snapshot.id)
            .bind(&snapshot.template_key)
            .bind(&snapshot.snapshot_name)
            .bind(&snapshot.content)
            .bind(snapshot.source_template_id)
            .bind(snapshot.source_template_status.as_str())
            .bind(snapshot.source_template_version)
            .bind(snapshot.category_id)
            .bind(&snapshot.category_name)
            .bind(&snapshot.category_code)
            .bind(&snapshot.tags)
            .bind(&snapshot.form_config)
            .bind(&snapshot.tenant_id)
            .bind(&snapshot.app_id)
            .bind(&snapshot.context_id)
            .bind(snapshot.snapshot_version)
            .bind(&snapshot.created_by)
            .bind(snapshot.created_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Delete a snapshot. Returns `true` if a row was removed.
    pub async fn delete(
        conn: &mut PgConnection,
        scope: &TenantScope,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "DELETE FROM process_template_snapshots WHERE id = $1 AND {}",
            scope_clause(2)
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List snapshots of a key, newest version first.
    pub async fn list_by_key(
        conn: &mut PgConnection,
        scope: &TenantScope,
        key: &str,
    ) -> Result<Vec<TemplateSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM process_template_snapshots \
             WHERE template_key = $1 AND {} \
             ORDER BY snapshot_version DESC",
            scope_clause(2)
        );
        sqlx::query_as::<_, TemplateSnapshot>(&query)
            .bind(key)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_all(&mut *conn)
            .await
    }
}
