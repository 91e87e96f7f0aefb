//! Repository for the `process_template_drafts` table.

use sqlx::PgConnection;

use procforge_core::search::like_pattern;
use procforge_core::types::{DbId, TenantScope};

use super::scope_clause;
use crate::models::template_draft::{DraftFilter, TemplateDraft};

/// Column list for process_template_drafts queries.
const COLUMNS: &str = "id, template_key, name, description, content, category_id, \
    category_name, category_code, tags, form_config, tenant_id, app_id, context_id, status, \
    version, created_by, updated_by, created_at, updated_at";

/// Provides scoped CRUD for draft templates.
pub struct TemplateDraftRepo;

impl TemplateDraftRepo {
    /// Find a draft by id within a scope.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        scope: &TenantScope,
        id: DbId,
    ) -> Result<Option<TemplateDraft>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM process_template_drafts WHERE id = $1 AND {}",
            scope_clause(2)
        );
        sqlx::query_as::<_, TemplateDraft>(&query)
            .bind(id)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Count drafts using `key` in scope.
    pub async fn count_by_key(
        conn: &mut PgConnection,
        scope: &TenantScope,
        key: &str,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM process_template_drafts WHERE template_key = $1 AND {}",
            scope_clause(2)
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(key)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Insert a draft, returning the stored row.
    pub async fn create(
        conn: &mut PgConnection,
        draft: &TemplateDraft,
    ) -> Result<TemplateDraft, sqlx::Error> {
        let query = format!(
            "INSERT INTO process_template_drafts \
                (id, template_key, name, description, content, category_id, category_name, \
                 category_code, tags, form_config, tenant_id, app_id, context_id, status, \
                 version, created_by, updated_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemplateDraft>(&query)
            .bind(draft.id)
            .bind(&draft.template_key)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(&draft.content)
            .bind(draft.category_id)
            .bind(&draft.category_name)
            .bind(&draft.category_code)
            .bind(&draft.tags)
            .bind(&draft.form_config)
            .bind(&draft.tenant_id)
            .bind(&draft.app_id)
            .bind(&draft.context_id)
            .bind(draft.status.as_str())
            .bind(draft.version)
            .bind(&draft.created_by)
            .bind(&draft.updated_by)
            .bind(draft.created_at)
            .bind(draft.updated_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Conditionally update a draft if its version still matches.
    pub async fn update(
        conn: &mut PgConnection,
        draft: &TemplateDraft,
        expected_version: i32,
    ) -> Result<Option<TemplateDraft>, sqlx::Error> {
        let query = format!(
            "UPDATE process_template_drafts SET \
                name = $3, description = $4, content = $5, category_id = $6, \
                category_name = $7, category_code = $8, tags = $9, form_config = $10, \
                updated_by = $11, updated_at = NOW(), version = version + 1 \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemplateDraft>(&query)
            .bind(draft.id)
            .bind(expected_version)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(&draft.content)
            .bind(draft.category_id)
            .bind(&draft.category_name)
            .bind(&draft.category_code)
            .bind(&draft.tags)
            .bind(&draft.form_config)
            .bind(&draft.updated_by)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Delete a draft, optionally only if its version still matches.
    pub async fn delete(
        conn: &mut PgConnection,
        scope: &TenantScope,
        id: DbId,
        expected_version: Option<i32>,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "DELETE FROM process_template_drafts \
             WHERE id = $1 AND ($2::int IS NULL OR version = $2) AND {}",
            scope_clause(3)
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(expected_version)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a page of drafts, most recently updated first.
    pub async fn list(
        conn: &mut PgConnection,
        filter: &DraftFilter,
    ) -> Result<Vec<TemplateDraft>, sqlx::Error> {
        let (where_clause, next_idx) = Self::filter_clause(filter);
        let query = format!(
            "SELECT {COLUMNS} FROM process_template_drafts \
             WHERE {where_clause} \
             ORDER BY updated_at DESC, id \
             LIMIT ${next_idx} OFFSET ${}",
            next_idx + 1
        );

        let mut q = sqlx::query_as::<_, TemplateDraft>(&query)
            .bind(&filter.scope.tenant_id)
            .bind(&filter.scope.app_id)
            .bind(&filter.scope.context_id);
        if let Some(category_id) = filter.category_id {
            q = q.bind(category_id);
        }
        if let Some(ref keyword) = filter.keyword {
            q = q.bind(like_pattern(keyword));
        }
        q.bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&mut *conn)
            .await
    }

    /// Count drafts matching a filter, ignoring pagination.
    pub async fn count(conn: &mut PgConnection, filter: &DraftFilter) -> Result<i64, sqlx::Error> {
        let (where_clause, _) = Self::filter_clause(filter);
        let query = format!("SELECT COUNT(*) FROM process_template_drafts WHERE {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query)
            .bind(&filter.scope.tenant_id)
            .bind(&filter.scope.app_id)
            .bind(&filter.scope.context_id);
        if let Some(category_id) = filter.category_id {
            q = q.bind(category_id);
        }
        if let Some(ref keyword) = filter.keyword {
            q = q.bind(like_pattern(keyword));
        }
        q.fetch_one(&mut *conn).await
    }

    /// Build the WHERE clause; returns it with the next free bind index.
    fn filter_clause(filter: &DraftFilter) -> (String, u32) {
        let mut conditions = vec![scope_clause(1)];
        let mut bind_idx = 4u32;

        if filter.category_id.is_some() {
            conditions.push(format!("category_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.keyword.is_some() {
            conditions.push(format!(
                "(name ILIKE ${bind_idx} OR template_key ILIKE ${bind_idx})"
            ));
            bind_idx += 1;
        }
        (conditions.join(" AND "), bind_idx)
    }
}
