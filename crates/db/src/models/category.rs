//! Category model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use procforge_core::category_tree::TreeItem;
use procforge_core::types::{DbId, TenantScope, Timestamp};

/// A row from the `process_categories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub parent_id: Option<DbId>,
    /// Materialized path `/root/.../id`.
    pub path: String,
    pub level: i32,
    pub sort_order: i32,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub tenant_id: String,
    pub app_id: Option<String>,
    pub context_id: Option<String>,
    pub version: i32,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(skip_serializing)]
    pub deleted_at: Option<Timestamp>,
}

impl Category {
    pub fn scope(&self) -> TenantScope {
        TenantScope {
            tenant_id: self.tenant_id.clone(),
            app_id: self.app_id.clone(),
            context_id: self.context_id.clone(),
        }
    }

    pub fn in_scope(&self, scope: &TenantScope) -> bool {
        self.tenant_id == scope.tenant_id
            && self.app_id == scope.app_id
            && self.context_id == scope.context_id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl TreeItem for Category {
    fn id(&self) -> DbId {
        self.id
    }

    fn parent_id(&self) -> Option<DbId> {
        self.parent_id
    }

    fn sort_order(&self) -> i32 {
        self.sort_order
    }
}

/// DTO for creating a category. The tenant scope travels separately.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    pub parent_id: Option<DbId>,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub sort_order: Option<i32>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
}

/// DTO for updating a category's own fields. All fields are optional;
/// placement is changed only through a move.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub code: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
}

/// DTO for moving a category. `None` moves it to the root.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCategory {
    pub parent_id: Option<DbId>,
}

/// One entry of a drag-and-drop reorder.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOrderUpdate {
    pub id: DbId,
    pub sort_order: i32,
}
