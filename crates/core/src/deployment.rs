//! Deployment gateway: the seam to the external workflow engine.
//!
//! The engine parses and deploys process documents and owns the definition
//! key. Whatever key it returns is authoritative, even when it differs from
//! the key the caller asked for.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::content::main_process_id;

/// What is sent to the engine for a deployment.
#[derive(Debug, Clone)]
pub struct DeploymentRequest<'a> {
    /// Display name for the deployment.
    pub name: &'a str,
    /// Key the caller requested; used only to name the deployed resource.
    pub requested_key: &'a str,
    /// The process document.
    pub content: &'a str,
}

impl DeploymentRequest<'_> {
    /// Resource name the engine stores the document under.
    pub fn resource_name(&self) -> String {
        format!("{}.bpmn20.xml", self.requested_key)
    }
}

/// What the engine returns after a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentReceipt {
    /// Authoritative definition key.
    pub definition_key: String,
    /// Engine deployment identifier.
    pub deployment_id: String,
    /// Engine definition identifier; used for suspend/activate.
    pub definition_id: String,
}

/// Failures reported by a deployment gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The engine refused the request (malformed document, unknown definition).
    #[error("Engine rejected request: {0}")]
    Rejected(String),

    /// The engine could not be reached.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// The engine did not answer in time.
    #[error("Engine call timed out")]
    Timeout,
}

/// Operations consumed from the workflow engine.
///
/// `suspend` and `activate` are idempotent from the caller's point of view.
#[async_trait]
pub trait DeploymentGateway: Send + Sync {
    async fn deploy(&self, request: &DeploymentRequest<'_>) -> Result<DeploymentReceipt, GatewayError>;

    async fn suspend(&self, definition_id: &str) -> Result<(), GatewayError>;

    async fn activate(&self, definition_id: &str) -> Result<(), GatewayError>;
}

// ---------------------------------------------------------------------------
// In-process gateway
// ---------------------------------------------------------------------------

/// In-process stand-in for the engine, used when no engine URL is
/// configured and in tests.
///
/// Mirrors engine behaviour that matters to this system: the definition
/// key is the id of the document's main `<process>`, each deployment of a
/// key gets the next definition number, and suspend/activate only accept
/// definitions it has deployed.
#[derive(Debug, Default)]
pub struct LocalDeploymentGateway {
    state: Mutex<LocalState>,
}

#[derive(Debug, Default)]
struct LocalState {
    versions: HashMap<String, u32>,
    /// definition id -> suspended flag
    definitions: HashMap<String, bool>,
}

impl LocalDeploymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the definition is currently suspended; `None` if unknown.
    pub async fn is_suspended(&self, definition_id: &str) -> Option<bool> {
        self.state.lock().await.definitions.get(definition_id).copied()
    }

    /// Number of deployments performed so far.
    pub async fn deployment_count(&self) -> usize {
        self.state.lock().await.definitions.len()
    }

    async fn set_suspended(&self, definition_id: &str, suspended: bool) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        match state.definitions.get_mut(definition_id) {
            Some(flag) => {
                *flag = suspended;
                Ok(())
            }
            None => Err(GatewayError::Rejected(format!(
                "Unknown process definition: {definition_id}"
            ))),
        }
    }
}

#[async_trait]
impl DeploymentGateway for LocalDeploymentGateway {
    async fn deploy(&self, request: &DeploymentRequest<'_>) -> Result<DeploymentReceipt, GatewayError> {
        let key = main_process_id(request.content).ok_or_else(|| {
            GatewayError::Rejected(format!(
                "No process definition found in {}",
                request.resource_name()
            ))
        })?;

        let mut state = self.state.lock().await;
        let version = state.versions.entry(key.clone()).or_insert(0);
        *version += 1;
        let definition_id = format!("{key}:{version}:{}", uuid::Uuid::new_v4());
        state.definitions.insert(definition_id.clone(), false);

        Ok(DeploymentReceipt {
            definition_key: key,
            deployment_id: uuid::Uuid::new_v4().to_string(),
            definition_id,
        })
    }

    async fn suspend(&self, definition_id: &str) -> Result<(), GatewayError> {
        self.set_suspended(definition_id, true).await
    }

    async fn activate(&self, definition_id: &str) -> Result<(), GatewayError> {
        self.set_suspended(definition_id, false).await
    }
}
