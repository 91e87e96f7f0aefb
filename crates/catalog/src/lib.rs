//! Orchestration over the catalog store: the category tree manager, the
//! template lifecycle manager and the snapshot versioner.
//!
//! Managers hold no entity state between calls. Each command opens a unit
//! of work, re-reads what it needs, writes, and commits.

pub mod category_tree;
pub mod error;
pub mod lifecycle;
pub mod snapshot;
pub mod views;

pub use category_tree::CategoryTreeManager;
pub use error::{CatalogError, CatalogResult};
pub use lifecycle::{DraftQuery, PublishedQuery, TemplateLifecycleManager};
pub use snapshot::SnapshotVersioner;
