//! [`DeploymentGateway`] over the engine's REST API.
//!
//! ```text
//! POST {base}/deployments                   {name, resourceName, content}
//!                                           -> {definitionKey, deploymentId, definitionId}
//! PUT  {base}/definitions/{id}/suspend
//! PUT  {base}/definitions/{id}/activate
//! ```

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Serialize;

use procforge_core::deployment::{
    DeploymentGateway, DeploymentReceipt, DeploymentRequest, GatewayError,
};

/// Body of a deployment request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployBody<'a> {
    name: &'a str,
    resource_name: String,
    content: &'a str,
}

/// HTTP client for a remote workflow engine.
#[derive(Debug, Clone)]
pub struct HttpDeploymentGateway {
    client: Client,
    base_url: Url,
}

impl HttpDeploymentGateway {
    /// Build a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid deployment gateway URL '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Deployment gateway URL '{base_url}' cannot be used as a base");
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn change_state(&self, definition_id: &str, action: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(&["definitions", definition_id, action]);
        let response = self.client.put(url).send().await.map_err(transport_error)?;
        ensure_success(response).await?;

        tracing::debug!(definition_id, action, "Engine definition state changed");
        Ok(())
    }
}

#[async_trait]
impl DeploymentGateway for HttpDeploymentGateway {
    async fn deploy(
        &self,
        request: &DeploymentRequest<'_>,
    ) -> Result<DeploymentReceipt, GatewayError> {
        let body = DeployBody {
            name: request.name,
            resource_name: request.resource_name(),
            content: request.content,
        };
        let response = self
            .client
            .post(self.endpoint(&["deployments"]))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;

        let receipt: DeploymentReceipt = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::Rejected(format!("Malformed engine response: {e}"))
            }
        })?;

        tracing::debug!(
            requested_key = request.requested_key,
            definition_key = %receipt.definition_key,
            deployment_id = %receipt.deployment_id,
            "Engine accepted deployment",
        );
        Ok(receipt)
    }

    async fn suspend(&self, definition_id: &str) -> Result<(), GatewayError> {
        self.change_state(definition_id, "suspend").await
    }

    async fn activate(&self, definition_id: &str) -> Result<(), GatewayError> {
        self.change_state(definition_id, "activate").await
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Unavailable(err.to_string())
    }
}

/// Turn a non-2xx answer into [`GatewayError::Rejected`] carrying the body.
async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Rejected(format!("{status}: {}", body.trim())))
}
