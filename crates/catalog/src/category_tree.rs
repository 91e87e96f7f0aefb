//! Category Tree Manager: creates, edits, moves and deletes categories while
//! keeping every materialized path consistent with its ancestors.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use procforge_core::category_tree::{build_forest, child_path, place, plan_move, ParentRef};
use procforge_core::error::CoreError;
use procforge_core::search::normalize_keyword;
use procforge_core::types::{new_id, DbId, TenantScope};
use procforge_db::models::category::{
    Category, CreateCategory, MoveCategory, SortOrderUpdate, UpdateCategory,
};
use procforge_db::store::{CatalogStore, CatalogTx};

use crate::error::{conflict, not_found, on_unique, CatalogResult};
use crate::views::{CategoryIndex, CategoryTreeNode, CategoryView};

const ENTITY: &str = "Category";

/// Maintains the category forest of each tenant scope.
#[derive(Clone)]
pub struct CategoryTreeManager {
    store: Arc<dyn CatalogStore>,
}

impl CategoryTreeManager {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Create a category beneath `parent_id`, or as a root.
    pub async fn create_category(
        &self,
        scope: &TenantScope,
        actor: &str,
        input: CreateCategory,
    ) -> CatalogResult<CategoryView> {
        input.validate().map_err(CoreError::from)?;
        let name = required_text("name", &input.name)?;
        let code = required_text("code", &input.code)?;

        let mut tx = self.store.begin().await?;

        if tx.count_categories_by_code(scope, &code, None).await? > 0 {
            return Err(CoreError::DuplicateCode(code).into());
        }

        let parent = match input.parent_id {
            Some(parent_id) => {
                let parent = tx
                    .find_category(scope, parent_id)
                    .await?
                    .ok_or(CoreError::ParentNotFound(parent_id))?;
                Some(claim_parent(tx.as_mut(), parent).await?)
            }
            None => None,
        };

        // The path embeds the id, so it is allocated first.
        let id = new_id();
        let placement = place(id, parent.as_ref().map(parent_ref));
        let now = Utc::now();
        let category = Category {
            id,
            name,
            code: code.clone(),
            parent_id: placement.parent_id,
            path: placement.path,
            level: placement.level,
            sort_order: input.sort_order.unwrap_or(0),
            description: input.description,
            icon: input.icon,
            tenant_id: scope.tenant_id.clone(),
            app_id: scope.app_id.clone(),
            context_id: scope.context_id.clone(),
            version: 1,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let created = on_unique(tx.insert_category(&category).await, || {
            CoreError::DuplicateCode(code.clone())
        })?;
        let view = resolve_view(tx.as_mut(), scope, created).await?;
        on_unique(tx.commit().await, || CoreError::DuplicateCode(code))?;

        tracing::info!(
            category_id = %view.category.id,
            parent_id = ?view.category.parent_id,
            depth = view.category.level,
            scope = %scope,
            "Category created",
        );
        Ok(view)
    }

    /// Fetch one category with its resolved path.
    pub async fn get_category(&self, scope: &TenantScope, id: DbId) -> CatalogResult<CategoryView> {
        let mut tx = self.store.begin().await?;
        let category = tx
            .find_category(scope, id)
            .await?
            .ok_or_else(|| not_found(ENTITY, id))?;
        Ok(resolve_view(tx.as_mut(), scope, category).await?)
    }

    /// Edit a category's own fields. Placement is only changed by a move.
    pub async fn update_category(
        &self,
        scope: &TenantScope,
        actor: &str,
        id: DbId,
        input: UpdateCategory,
    ) -> CatalogResult<CategoryView> {
        input.validate().map_err(CoreError::from)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .find_category(scope, id)
            .await?
            .ok_or_else(|| not_found(ENTITY, id))?;

        let mut next = current.clone();
        if let Some(name) = input.name {
            next.name = required_text("name", &name)?;
        }
        if let Some(code) = input.code {
            let code = required_text("code", &code)?;
            if code != current.code
                && tx.count_categories_by_code(scope, &code, Some(id)).await? > 0
            {
                return Err(CoreError::DuplicateCode(code).into());
            }
            next.code = code;
        }
        if input.description.is_some() {
            next.description = input.description;
        }
        if let Some(sort_order) = input.sort_order {
            next.sort_order = sort_order;
        }
        if input.icon.is_some() {
            next.icon = input.icon;
        }
        next.updated_by = actor.to_string();

        let code = next.code.clone();
        let updated = on_unique(tx.update_category(&next, current.version).await, || {
            CoreError::DuplicateCode(code)
        })?
        .ok_or_else(|| conflict(ENTITY, id))?;
        let view = resolve_view(tx.as_mut(), scope, updated).await?;
        tx.commit().await?;

        tracing::info!(category_id = %id, scope = %scope, "Category updated");
        Ok(view)
    }

    /// Move a category (and with it, its whole subtree) beneath a new parent,
    /// or to the root when `parent_id` is `None`.
    ///
    /// The node is rewritten first; descendants are then located level by
    /// level with a path-prefix query and rewritten from an explicit
    /// worklist. Everything happens in one unit of work.
    pub async fn move_category(
        &self,
        scope: &TenantScope,
        actor: &str,
        id: DbId,
        input: MoveCategory,
    ) -> CatalogResult<CategoryView> {
        let mut tx = self.store.begin().await?;
        let node = tx
            .find_category(scope, id)
            .await?
            .ok_or_else(|| not_found(ENTITY, id))?;

        let new_parent = match input.parent_id {
            Some(parent_id) => Some(
                tx.find_category(scope, parent_id)
                    .await?
                    .ok_or_else(|| not_found(ENTITY, parent_id))?,
            ),
            None => None,
        };

        let placement = plan_move(id, &node.path, new_parent.as_ref().map(parent_ref))?;
        if placement.path == node.path {
            return Ok(resolve_view(tx.as_mut(), scope, node).await?);
        }

        if let Some(parent) = new_parent {
            claim_parent(tx.as_mut(), parent).await?;
        }

        let old_path = node.path.clone();
        let moved = Category {
            parent_id: placement.parent_id,
            path: placement.path,
            level: placement.level,
            updated_by: actor.to_string(),
            ..node.clone()
        };
        let moved = tx
            .update_category(&moved, node.version)
            .await?
            .ok_or_else(|| conflict(ENTITY, id))?;

        let rewritten = rewrite_descendants(
            tx.as_mut(),
            scope,
            actor,
            (moved.id, old_path, moved.path.clone(), moved.level),
        )
        .await?;

        let view = resolve_view(tx.as_mut(), scope, moved).await?;
        tx.commit().await?;

        tracing::info!(
            category_id = %id,
            new_parent_id = ?view.category.parent_id,
            descendants_rewritten = rewritten,
            scope = %scope,
            "Category moved",
        );
        Ok(view)
    }

    /// Change one category's position among its siblings.
    pub async fn update_sort_order(
        &self,
        scope: &TenantScope,
        actor: &str,
        id: DbId,
        sort_order: i32,
    ) -> CatalogResult<CategoryView> {
        let mut tx = self.store.begin().await?;
        let current = tx
            .find_category(scope, id)
            .await?
            .ok_or_else(|| not_found(ENTITY, id))?;

        let next = Category {
            sort_order,
            updated_by: actor.to_string(),
            ..current.clone()
        };
        let updated = tx
            .update_category(&next, current.version)
            .await?
            .ok_or_else(|| conflict(ENTITY, id))?;
        let view = resolve_view(tx.as_mut(), scope, updated).await?;
        tx.commit().await?;

        tracing::debug!(category_id = %id, sort_order, "Category sort order updated");
        Ok(view)
    }

    /// Apply a drag-and-drop reorder in one unit of work. Unknown ids are
    /// skipped. Returns the number of categories updated.
    pub async fn batch_update_sort_order(
        &self,
        scope: &TenantScope,
        actor: &str,
        updates: Vec<SortOrderUpdate>,
    ) -> CatalogResult<usize> {
        let mut tx = self.store.begin().await?;
        let mut updated = 0;

        for update in updates {
            let Some(current) = tx.find_category(scope, update.id).await? else {
                tracing::debug!(category_id = %update.id, "Skipping unknown category in reorder");
                continue;
            };
            let next = Category {
                sort_order: update.sort_order,
                updated_by: actor.to_string(),
                ..current.clone()
            };
            tx.update_category(&next, current.version)
                .await?
                .ok_or_else(|| conflict(ENTITY, update.id))?;
            updated += 1;
        }

        tx.commit().await?;
        tracing::info!(updated, scope = %scope, "Categories reordered");
        Ok(updated)
    }

    /// Soft-delete a category that has no children and no linked templates.
    pub async fn delete_category(
        &self,
        scope: &TenantScope,
        actor: &str,
        id: DbId,
    ) -> CatalogResult<()> {
        let mut tx = self.store.begin().await?;
        let current = tx
            .find_category(scope, id)
            .await?
            .ok_or_else(|| not_found(ENTITY, id))?;

        let children = tx.count_child_categories(scope, id).await?;
        if children > 0 {
            return Err(CoreError::HasChildren { count: children }.into());
        }
        let templates = tx.count_linked_templates(scope, id).await?;
        if templates > 0 {
            return Err(CoreError::HasTemplates { count: templates }.into());
        }

        if !tx
            .soft_delete_category(scope, id, current.version, actor)
            .await?
        {
            return Err(conflict(ENTITY, id).into());
        }
        tx.commit().await?;

        tracing::info!(category_id = %id, scope = %scope, "Category deleted");
        Ok(())
    }

    /// The category forest of a scope with derived fields.
    ///
    /// Categories whose parent is not visible are listed as roots.
    pub async fn build_tree(&self, scope: &TenantScope) -> CatalogResult<Vec<CategoryTreeNode>> {
        let mut tx = self.store.begin().await?;
        let categories = tx.list_categories(scope).await?;
        let counts = tx.linked_template_counts(scope).await?;

        let index = CategoryIndex::from_categories(&categories);
        let views: Vec<CategoryView> = categories
            .into_iter()
            .map(|c| index.category_view(c))
            .collect();
        Ok(build_forest(views, &counts))
    }

    /// Categories whose name or code contains `keyword`. A blank keyword
    /// lists every category.
    pub async fn search_categories(
        &self,
        scope: &TenantScope,
        keyword: Option<&str>,
    ) -> CatalogResult<Vec<CategoryView>> {
        let mut tx = self.store.begin().await?;
        let index = CategoryIndex::load(tx.as_mut(), scope).await?;
        let matches = match normalize_keyword(keyword) {
            Some(keyword) => tx.search_categories(scope, &keyword).await?,
            None => tx.list_categories(scope).await?,
        };
        Ok(matches
            .into_iter()
            .map(|c| index.category_view(c))
            .collect())
    }
}

fn parent_ref(parent: &Category) -> ParentRef<'_> {
    ParentRef {
        id: parent.id,
        path: &parent.path,
        level: parent.level,
    }
}

/// Rewrite `parent` at the version that was read, so a concurrent move or
/// delete of it fails its own version check or makes this unit of work fail.
async fn claim_parent(tx: &mut dyn CatalogTx, parent: Category) -> CatalogResult<Category> {
    let id = parent.id;
    let claimed = tx
        .update_category(&parent, parent.version)
        .await?
        .ok_or_else(|| conflict(ENTITY, id))?;
    Ok(claimed)
}

fn required_text(field: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}

/// Rewrite path and level of every descendant of a moved node.
///
/// `start` is `(node id, old path, new path, new level)`. Each step re-queries
/// the store by the old path prefix so that changes made since the move began
/// are picked up. Returns the number of descendants rewritten.
async fn rewrite_descendants(
    tx: &mut dyn CatalogTx,
    scope: &TenantScope,
    actor: &str,
    start: (DbId, String, String, i32),
) -> CatalogResult<usize> {
    let mut worklist = VecDeque::from([start]);
    let mut rewritten = 0;

    while let Some((parent_id, old_parent_path, new_parent_path, new_parent_level)) =
        worklist.pop_front()
    {
        let children = tx
            .find_descendants(scope, &old_parent_path)
            .await?
            .into_iter()
            .filter(|c| c.parent_id == Some(parent_id));

        for child in children {
            let old_path = child.path.clone();
            let next = Category {
                path: child_path(&new_parent_path, child.id),
                level: new_parent_level + 1,
                updated_by: actor.to_string(),
                ..child.clone()
            };
            let updated = tx
                .update_category(&next, child.version)
                .await?
                .ok_or_else(|| conflict(ENTITY, child.id))?;
            rewritten += 1;
            worklist.push_back((updated.id, old_path, updated.path, updated.level));
        }
    }

    Ok(rewritten)
}

/// Resolve the display path of one category through its ancestors.
async fn resolve_view(
    tx: &mut dyn CatalogTx,
    scope: &TenantScope,
    category: Category,
) -> CatalogResult<CategoryView> {
    let index = CategoryIndex::load(tx, scope).await?;
    Ok(index.category_view(category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn blank_text_is_rejected_and_trimmed() {
        assert_matches!(required_text("name", "   "), Err(CoreError::Validation(_)));
        assert_eq!(required_text("code", " A ").unwrap(), "A");
    }
}
