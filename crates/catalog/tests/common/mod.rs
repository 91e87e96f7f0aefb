//! Shared fixtures for catalog tests: an in-memory store, the in-process
//! engine and helpers for building valid requests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;

use procforge_catalog::{CategoryTreeManager, SnapshotVersioner, TemplateLifecycleManager};
use procforge_core::content::BpmnStructureValidator;
use procforge_core::deployment::{
    DeploymentGateway, DeploymentReceipt, DeploymentRequest, GatewayError, LocalDeploymentGateway,
};
use procforge_core::types::{DbId, TenantScope};
use procforge_db::models::category::CreateCategory;
use procforge_db::models::template_draft::CreateDraft;
use procforge_db::{CatalogStore, InMemoryCatalogStore};

pub const ACTOR: &str = "alice";

pub struct Harness {
    pub store: Arc<InMemoryCatalogStore>,
    pub engine: Arc<LocalDeploymentGateway>,
    pub categories: CategoryTreeManager,
    pub lifecycle: TemplateLifecycleManager,
    pub snapshots: SnapshotVersioner,
}

/// Managers wired to a fresh in-memory store and in-process engine.
pub fn harness() -> Harness {
    let engine = Arc::new(LocalDeploymentGateway::new());
    harness_with_gateway(engine.clone(), engine)
}

/// Like [`harness`], with a custom gateway handling deployments.
pub fn harness_with_gateway(
    engine: Arc<LocalDeploymentGateway>,
    gateway: Arc<dyn DeploymentGateway>,
) -> Harness {
    let store = Arc::new(InMemoryCatalogStore::new());
    let dyn_store: Arc<dyn CatalogStore> = store.clone();
    Harness {
        categories: CategoryTreeManager::new(dyn_store.clone()),
        lifecycle: TemplateLifecycleManager::new(
            dyn_store.clone(),
            gateway,
            Arc::new(BpmnStructureValidator),
        ),
        snapshots: SnapshotVersioner::new(dyn_store),
        store,
        engine,
    }
}

pub fn scope() -> TenantScope {
    TenantScope::new("tenant-1", Some("app-1".to_string()), None)
}

pub fn new_category(code: &str, parent_id: Option<DbId>) -> CreateCategory {
    CreateCategory {
        parent_id,
        name: format!("Category {code}"),
        code: code.to_string(),
        sort_order: None,
        description: None,
        icon: None,
    }
}

/// A minimal valid process document whose main process id is `process_id`.
pub fn bpmn(process_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="defs_{process_id}">
  <process id="{process_id}" isExecutable="true">
    <startEvent id="start"/>
    <endEvent id="end"/>
    <sequenceFlow id="flow" sourceRef="start" targetRef="end"/>
  </process>
</definitions>"#
    )
}

pub fn new_draft(key: &str, process_id: &str, category_id: DbId) -> CreateDraft {
    CreateDraft {
        template_key: key.to_string(),
        name: format!("Template {key}"),
        description: Some("test template".to_string()),
        content: bpmn(process_id),
        category_id,
        tags: Some(vec!["hr".to_string(), "approval".to_string()]),
        form_config: Some(serde_json::json!({ "fields": [{ "name": "reason" }] })),
    }
}

/// Gateway that refuses every call.
pub struct FailingGateway;

#[async_trait]
impl DeploymentGateway for FailingGateway {
    async fn deploy(
        &self,
        _request: &DeploymentRequest<'_>,
    ) -> Result<DeploymentReceipt, GatewayError> {
        Err(GatewayError::Unavailable("connection refused".to_string()))
    }

    async fn suspend(&self, _definition_id: &str) -> Result<(), GatewayError> {
        Err(GatewayError::Timeout)
    }

    async fn activate(&self, _definition_id: &str) -> Result<(), GatewayError> {
        Err(GatewayError::Timeout)
    }
}
