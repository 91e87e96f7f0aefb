//! Repository for the `process_categories` table.

use std::collections::HashMap;

use sqlx::PgConnection;

use procforge_core::search::like_pattern;
use procforge_core::types::{DbId, TenantScope};

use super::scope_clause;
use crate::models::category::Category;

/// Column list for process_categories queries.
const COLUMNS: &str = "id, name, code, parent_id, path, level, sort_order, description, icon, \
    tenant_id, app_id, context_id, version, created_by, updated_by, created_at, updated_at, \
    deleted_at";

/// Provides scoped CRUD and path-prefix queries for categories.
pub struct CategoryRepo;

impl CategoryRepo {
    /// Find a non-deleted category by id within a scope.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        scope: &TenantScope,
        id: DbId,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM process_categories \
             WHERE id = $1 AND {} AND deleted_at IS NULL",
            scope_clause(2)
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Count non-deleted categories using `code`, optionally ignoring one id.
    pub async fn count_by_code(
        conn: &mut PgConnection,
        scope: &TenantScope,
        code: &str,
        exclude: Option<DbId>,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM process_categories \
             WHERE code = $1 AND {} AND deleted_at IS NULL \
               AND ($5::uuid IS NULL OR id <> $5)",
            scope_clause(2)
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(code)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .bind(exclude)
            .fetch_one(&mut *conn)
            .await
    }

    /// Insert a fully placed category, returning the stored row.
    pub async fn create(
        conn: &mut PgConnection,
        category: &Category,
    ) -> Result<Category, sqlx::Error> {
        let query = format!(
            "INSERT INTO process_categories \
                (id, name, code, parent_id, path, level, sort_order, description, icon, \
                 tenant_id, app_id, context_id, version, created_by, updated_by, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.code)
            .bind(category.parent_id)
            .bind(&category.path)
            .bind(category.level)
            .bind(category.sort_order)
            .bind(&category.description)
            .bind(&category.icon)
            .bind(&category.tenant_id)
            .bind(&category.app_id)
            .bind(&category.context_id)
            .bind(category.version)
            .bind(&category.created_by)
            .bind(&category.updated_by)
            .bind(category.created_at)
            .bind(category.updated_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Conditionally update a category if its version still matches.
    ///
    /// Returns `None` when zero rows were affected.
    pub async fn update(
        conn: &mut PgConnection,
        category: &Category,
        expected_version: i32,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!(
            "UPDATE process_categories SET \
                name = $3, code = $4, parent_id = $5, path = $6, level = $7, \
                sort_order = $8, description = $9, icon = $10, updated_by = $11, \
                updated_at = NOW(), version = version + 1 \
             WHERE id = $1 AND version = $2 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(category.id)
            .bind(expected_version)
            .bind(&category.name)
            .bind(&category.code)
            .bind(category.parent_id)
            .bind(&category.path)
            .bind(category.level)
            .bind(category.sort_order)
            .bind(&category.description)
            .bind(&category.icon)
            .bind(&category.updated_by)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Soft-delete a category. Returns `true` if a row was marked.
    pub async fn soft_delete(
        conn: &mut PgConnection,
        scope: &TenantScope,
        id: DbId,
        expected_version: i32,
        actor: &str,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE process_categories \
             SET deleted_at = NOW(), updated_by = $3, updated_at = NOW(), version = version + 1 \
             WHERE id = $1 AND version = $2 AND {} AND deleted_at IS NULL",
            scope_clause(4)
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(expected_version)
            .bind(actor)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all non-deleted categories in scope in sibling order.
    pub async fn list(
        conn: &mut PgConnection,
        scope: &TenantScope,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM process_categories \
             WHERE {} AND deleted_at IS NULL \
             ORDER BY sort_order, id",
            scope_clause(1)
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Search by name or code (ILIKE).
    pub async fn search(
        conn: &mut PgConnection,
        scope: &TenantScope,
        keyword: &str,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM process_categories \
             WHERE (name ILIKE $1 OR code ILIKE $1) AND {} AND deleted_at IS NULL \
             ORDER BY sort_order, id",
            scope_clause(2)
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(like_pattern(keyword))
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Strict descendants of `path`, shallowest first.
    pub async fn find_descendants(
        conn: &mut PgConnection,
        scope: &TenantScope,
        path: &str,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM process_categories \
             WHERE path LIKE $1 AND {} AND deleted_at IS NULL \
             ORDER BY level, sort_order, id",
            scope_clause(2)
        );
        // Ids contain no LIKE metacharacters, so the path needs no escaping.
        sqlx::query_as::<_, Category>(&query)
            .bind(format!("{path}/%"))
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Count non-deleted direct children.
    pub async fn count_children(
        conn: &mut PgConnection,
        scope: &TenantScope,
        id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM process_categories \
             WHERE parent_id = $1 AND {} AND deleted_at IS NULL",
            scope_clause(2)
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(id)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Count drafts and published templates filed under a category.
    pub async fn count_linked_templates(
        conn: &mut PgConnection,
        scope: &TenantScope,
        category_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT \
                (SELECT COUNT(*) FROM process_template_drafts \
                  WHERE category_id = $1 AND {scope}) + \
                (SELECT COUNT(*) FROM process_template_published \
                  WHERE category_id = $1 AND {scope})",
            scope = scope_clause(2)
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(category_id)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Linked template counts per category for a whole scope.
    pub async fn linked_template_counts(
        conn: &mut PgConnection,
        scope: &TenantScope,
    ) -> Result<HashMap<DbId, i64>, sqlx::Error> {
        let query = format!(
            "SELECT category_id, COUNT(*) FROM ( \
                SELECT category_id FROM process_template_drafts WHERE {scope} \
                UNION ALL \
                SELECT category_id FROM process_template_published WHERE {scope} \
             ) linked \
             GROUP BY category_id",
            scope = scope_clause(1)
        );
        let rows = sqlx::query_as::<_, (DbId, i64)>(&query)
            .bind(&scope.tenant_id)
            .bind(&scope.app_id)
            .bind(&scope.context_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().collect())
    }
}
