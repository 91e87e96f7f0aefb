//! Repository for the `process_template_published` table.
//!
//! There is no delete: published history is retained.

use sqlx::PgConnection;

use procforge_core::search::like_pattern;
use procforge_core::types::{DbId, TenantScope};

use super::scope_clause;
use crate::models::template_published::{PublishedFilter, TemplatePublished};

/// Column list for process_template_published queries.
const COLUMNS: &str = "id, template_key, requested_key, name, description, content, \
    deployment_ref, definition_ref, flow_version, category_id, category_name, category_code, \
    tags, form_config, tenant_id, app_id, context_id, status, instance_count, \
    running_instance_count, published_by, published_at, suspended_at, version, updated_at";

/// Provides scoped reads, inserts and status updates for published templates.
pub struct TemplatePublishedRepo;

impl TemplatePublishedRepo {
    /// Find a published template by id within a scope.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        scope: &TenantScope,
        id: DbId,
    ) -> Result<Option<TemplatePublished>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM process_template_published WHERE id = $1 AND {}",
            scope_clause(2)
        );
        sqlx::query_as::<_, TemplatePublished>(&query)
            .bind(id)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Highest `flow_version` recorded for an authoritative key.
    pub async fn max_flow_version(
        conn: &mut PgConnection,
        scope: &TenantScope,
        key: &str,
    ) -> Result<Option<i32>, sqlx::Error> {
        let query = format!(
            "SELECT MAX(flow_version) FROM process_template_published \
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

    /// Count published rows for a key.
    pub async fn count_by_key(
        conn: &mut PgConnection,
        scope: &TenantScope,
        key: &str,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM process_template_published WHERE template_key = $1 AND {}",
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

    /// Insert a published row, returning it.
    pub async fn create(
        conn: &mut PgConnection,
        published: &TemplatePublished,
    ) -> Result<TemplatePublished, sqlx::Error> {
        let query = format!(
            "INSERT INTO process_template_published \
                (id, template_key, requested_key, name, description, content, deployment_ref, \
                 definition_ref, flow_version, category_id, category_name, category_code, tags, \
                 form_config, tenant_id, app_id, context_id, status, instance_count, \
                 running_instance_count, published_by, published_at, suspended_at, version, \
                 updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19, $20, $21, $22, $23, $24, $25) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemplatePublished>(&query)
            .bind(published.id)
            .bind(&published.template_key)
            .bind(&published.requested_key)
            .bind(&published.name)
            .bind(&published.description)
            .bind(&published.content)
            .bind(&published.deployment_ref)
            .bind(&published.definition_ref)
            .bind(published.flow_version)
            .bind(published.category_id)
            .bind(&published.category_name)
            .bind(&published.category_code)
            .bind(&published.tags)
            .bind(&published.form_config)
            .bind(&published.tenant_id)
            .bind(&published.app_id)
            .bind(&published.context_id)
            .bind(published.status.as_str())
            .bind(published.instance_count)
            .bind(published.running_instance_count)
            .bind(&published.published_by)
            .bind(published.published_at)
            .bind(published.suspended_at)
            .bind(published.version)
            .bind(published.updated_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Conditionally update status, suspension time and counters.
    pub async fn update(
        conn: &mut PgConnection,
        published: &TemplatePublished,
        expected_version: i32,
    ) -> Result<Option<TemplatePublished>, sqlx::Error> {
        let query = format!(
            "UPDATE process_template_published SET \
                status = $3, suspended_at = $4, instance_count = $5, \
                running_instance_count = $6, updated_at = NOW(), version = version + 1 \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemplatePublished>(&query)
            .bind(published.id)
            .bind(expected_version)
            .bind(published.status.as_str())
            .bind(published.suspended_at)
            .bind(published.instance_count)
            .bind(published.running_instance_count)
            .fetch_optional(&mut *conn)
            .await
    }

    /// List a page of published templates, most recently published first.
    pub async fn list(
        conn: &mut PgConnection,
        filter: &PublishedFilter,
    ) -> Result<Vec<TemplatePublished>, sqlx::Error> {
        let (where_clause, next_idx) = Self::filter_clause(filter);
        let query = format!(
            "SELECT {COLUMNS} FROM process_template_published \
             WHERE {where_clause} \
             ORDER BY published_at DESC, id \
             LIMIT ${next_idx} OFFSET ${}",
            next_idx + 1
        );

        let mut q = sqlx::query_as::<_, TemplatePublished>(&query)
            .bind(&filter.scope.tenant_id)
            .bind(&filter.scope.app_id)
            .bind(&filter.scope.context_id);
        if let Some(category_id) = filter.category_id {
            q = q.bind(category_id);
        }
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(ref keyword) = filter.keyword {
            q = q.bind(like_pattern(keyword));
        }
        q.bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&mut *conn)
            .await
    }

    /// Count published templates matching a filter, ignoring pagination.
    pub async fn count(
        conn: &mut PgConnection,
        filter: &PublishedFilter,
    ) -> Result<i64, sqlx::Error> {
        let (where_clause, _) = Self::filter_clause(filter);
        let query =
            format!("SELECT COUNT(*) FROM process_template_published WHERE {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query)
            .bind(&filter.scope.tenant_id)
            .bind(&filter.scope.app_id)
            .bind(&filter.scope.context_id);
        if let Some(category_id) = filter.category_id {
            q = q.bind(category_id);
        }
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(ref keyword) = filter.keyword {
            q = q.bind(like_pattern(keyword));
        }
        q.fetch_one(&mut *conn).await
    }

    fn filter_clause(filter: &PublishedFilter) -> (String, u32) {
        let mut conditions = vec![scope_clause(1)];
        let mut bind_idx = 4u32;

        if filter.category_id.is_some() {
            conditions.push(format!("category_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.status.is_some() {
            conditions.push(format!("status = ${bind_idx}"));
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
