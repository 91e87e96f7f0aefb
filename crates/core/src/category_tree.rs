//! Materialized-path arithmetic and forest assembly for the category tree.
//!
//! A category's `path` is the `/`-joined chain of ids from its root down to
//! itself (`/root/child/leaf`); `level` is its depth with roots at 0. These
//! helpers are pure so the invariants can be checked without a store.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

/// Separator between ids in a materialized path.
pub const PATH_SEPARATOR: char = '/';

// ---------------------------------------------------------------------------
// Path arithmetic
// ---------------------------------------------------------------------------

/// Path of a root category.
pub fn root_path(id: DbId) -> String {
    format!("{PATH_SEPARATOR}{id}")
}

/// Path of a category placed directly beneath `parent_path`.
pub fn child_path(parent_path: &str, id: DbId) -> String {
    format!("{parent_path}{PATH_SEPARATOR}{id}")
}

/// Ids along a path, root first. Segments that are not valid ids are skipped.
pub fn path_ids(path: &str) -> Vec<DbId> {
    path.split(PATH_SEPARATOR)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

/// Prefix shared by every strict descendant of the node at `path`.
///
/// Includes the trailing separator so `/ab` never matches `/abc`.
pub fn descendant_prefix(path: &str) -> String {
    format!("{path}{PATH_SEPARATOR}")
}

/// Whether `path` lies strictly beneath `ancestor_path`.
pub fn is_strict_descendant(path: &str, ancestor_path: &str) -> bool {
    path.starts_with(&descendant_prefix(ancestor_path))
}

/// Whether `path` is `root_path` itself or lies beneath it.
pub fn is_within_subtree(path: &str, root_path: &str) -> bool {
    path == root_path || is_strict_descendant(path, root_path)
}

/// Where a category sits in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub parent_id: Option<DbId>,
    pub path: String,
    pub level: i32,
}

/// The parent a category is being placed beneath.
#[derive(Debug, Clone, Copy)]
pub struct ParentRef<'a> {
    pub id: DbId,
    pub path: &'a str,
    pub level: i32,
}

/// Compute the placement of `id` beneath `parent` (or as a root).
pub fn place(id: DbId, parent: Option<ParentRef<'_>>) -> Placement {
    match parent {
        Some(parent) => Placement {
            parent_id: Some(parent.id),
            path: child_path(parent.path, id),
            level: parent.level + 1,
        },
        None => Placement {
            parent_id: None,
            path: root_path(id),
            level: 0,
        },
    }
}

/// Compute the new placement for moving the node at `current_path`.
///
/// Fails with [`CoreError::CyclicMove`] when the target parent is the node
/// itself or one of its descendants.
pub fn plan_move(
    id: DbId,
    current_path: &str,
    new_parent: Option<ParentRef<'_>>,
) -> Result<Placement, CoreError> {
    if let Some(parent) = new_parent {
        if parent.id == id || is_within_subtree(parent.path, current_path) {
            return Err(CoreError::CyclicMove { id });
        }
    }
    Ok(place(id, new_parent))
}

/// Human-readable path (`Root/Child/Leaf`) resolved through `names`.
///
/// Ids missing from `names` are skipped.
pub fn path_names(path: &str, names: &HashMap<DbId, String>) -> String {
    path_ids(path)
        .iter()
        .filter_map(|id| names.get(id).map(String::as_str))
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Forest assembly
// ---------------------------------------------------------------------------

/// A record that can be arranged into the category forest.
pub trait TreeItem {
    fn id(&self) -> DbId;
    fn parent_id(&self) -> Option<DbId>;
    fn sort_order(&self) -> i32;
}

/// Sibling order: `sort_order` ascending, then id ascending.
pub fn sibling_order<T: TreeItem>(a: &T, b: &T) -> Ordering {
    a.sort_order()
        .cmp(&b.sort_order())
        .then_with(|| a.id().cmp(&b.id()))
}

/// A node of the assembled forest with derived fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub has_children: bool,
    /// Linked templates of this node plus all of its descendants.
    pub template_count: i64,
    pub children: Vec<TreeNode<T>>,
}

/// Arrange flat records into a forest.
///
/// Records whose parent is absent from `items` become roots. Every sibling
/// group is ordered by [`sibling_order`]. `own_counts` holds the number of
/// templates linked directly to each category; `template_count` on each
/// node sums it over the subtree.
///
/// Assembly is iterative, so deep trees do not grow the call stack.
pub fn build_forest<T: TreeItem>(items: Vec<T>, own_counts: &HashMap<DbId, i64>) -> Vec<TreeNode<T>> {
    let mut by_id: HashMap<DbId, T> = HashMap::with_capacity(items.len());
    for item in items {
        by_id.insert(item.id(), item);
    }

    let mut roots: Vec<DbId> = Vec::new();
    let mut children: HashMap<DbId, Vec<DbId>> = HashMap::new();
    for item in by_id.values() {
        match item.parent_id() {
            Some(parent_id) if parent_id != item.id() && by_id.contains_key(&parent_id) => {
                children.entry(parent_id).or_default().push(item.id());
            }
            _ => roots.push(item.id()),
        }
    }

    let order = |a: &DbId, b: &DbId| sibling_order(&by_id[a], &by_id[b]);
    roots.sort_by(order);
    for siblings in children.values_mut() {
        siblings.sort_by(order);
    }

    // Pre-order walk; visiting it in reverse finishes children before parents.
    let mut visit = Vec::with_capacity(by_id.len());
    let mut stack: Vec<DbId> = roots.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        visit.push(id);
        if let Some(kids) = children.get(&id) {
            stack.extend(kids.iter().rev().copied());
        }
    }

    let mut built: HashMap<DbId, TreeNode<T>> = HashMap::with_capacity(visit.len());
    for id in visit.into_iter().rev() {
        let Some(item) = by_id.remove(&id) else {
            continue;
        };
        let kids: Vec<TreeNode<T>> = children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|k| built.remove(k)).collect())
            .unwrap_or_default();
        let own = own_counts.get(&id).copied().unwrap_or(0);
        let template_count = own + kids.iter().map(|k| k.template_count).sum::<i64>();
        built.insert(
            id,
            TreeNode {
                item,
                has_children: !kids.is_empty(),
                template_count,
                children: kids,
            },
        );
    }

    roots.iter().filter_map(|id| built.remove(id)).collect()
}
