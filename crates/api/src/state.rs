use std::sync::Arc;

use procforge_catalog::{CategoryTreeManager, SnapshotVersioner, TemplateLifecycleManager};
use procforge_core::content::BpmnStructureValidator;
use procforge_core::deployment::DeploymentGateway;
use procforge_db::CatalogStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Catalog persistence, Postgres or in-memory.
    pub store: Arc<dyn CatalogStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    pub categories: CategoryTreeManager,
    pub lifecycle: TemplateLifecycleManager,
    pub snapshots: SnapshotVersioner,
}

impl AppState {
    /// Wire the catalog managers to a store and a deployment gateway.
    pub fn new(
        store: Arc<dyn CatalogStore>,
        gateway: Arc<dyn DeploymentGateway>,
        config: ServerConfig,
    ) -> Self {
        Self {
            categories: CategoryTreeManager::new(Arc::clone(&store)),
            lifecycle: TemplateLifecycleManager::new(
                Arc::clone(&store),
                gateway,
                Arc::new(BpmnStructureValidator),
            ),
            snapshots: SnapshotVersioner::new(Arc::clone(&store)),
            store,
            config: Arc::new(config),
        }
    }
}
