//! Value objects returned to callers: entities plus resolved display fields.

use std::collections::HashMap;

use serde::Serialize;

use procforge_core::category_tree::{path_ids, path_names, TreeItem, TreeNode};
use procforge_core::types::{DbId, TenantScope};
use procforge_db::models::category::Category;
use procforge_db::models::template_draft::TemplateDraft;
use procforge_db::models::template_published::TemplatePublished;
use procforge_db::store::{CatalogTx, StoreResult};

/// A category with its path resolved to names.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: Category,
    /// `Root/Child/Leaf`.
    pub path_names: String,
    pub path_ids: Vec<DbId>,
}

impl TreeItem for CategoryView {
    fn id(&self) -> DbId {
        self.category.id
    }

    fn parent_id(&self) -> Option<DbId> {
        self.category.parent_id
    }

    fn sort_order(&self) -> i32 {
        self.category.sort_order
    }
}

pub type CategoryTreeNode = TreeNode<CategoryView>;

/// A draft with the current path of its category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    #[serde(flatten)]
    pub draft: TemplateDraft,
    /// `None` when the category no longer exists.
    pub category_path: Option<String>,
}

/// A published template with the current path of its category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedView {
    #[serde(flatten)]
    pub published: TemplatePublished,
    pub category_path: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Name and path of every live category in a scope, for resolving display
/// fields without a lookup per record.
#[derive(Debug, Default)]
pub(crate) struct CategoryIndex {
    names: HashMap<DbId, String>,
    paths: HashMap<DbId, String>,
}

impl CategoryIndex {
    pub(crate) async fn load(tx: &mut dyn CatalogTx, scope: &TenantScope) -> StoreResult<Self> {
        let categories = tx.list_categories(scope).await?;
        Ok(Self::from_categories(&categories))
    }

    pub(crate) fn from_categories(categories: &[Category]) -> Self {
        let mut index = Self::default();
        for c in categories {
            index.names.insert(c.id, c.name.clone());
            index.paths.insert(c.id, c.path.clone());
        }
        index
    }

    pub(crate) fn category_view(&self, category: Category) -> CategoryView {
        CategoryView {
            path_names: path_names(&category.path, &self.names),
            path_ids: path_ids(&category.path),
            category,
        }
    }

    /// Resolved path of a category, if it is still live.
    pub(crate) fn category_path(&self, category_id: DbId) -> Option<String> {
        self.paths
            .get(&category_id)
            .map(|path| path_names(path, &self.names))
    }

    pub(crate) fn draft_view(&self, draft: TemplateDraft) -> DraftView {
        DraftView {
            category_path: self.category_path(draft.category_id),
            draft,
        }
    }

    pub(crate) fn published_view(&self, published: TemplatePublished) -> PublishedView {
        PublishedView {
            category_path: self.category_path(published.category_id),
            published,
        }
    }
}
