//! Template snapshot model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use procforge_core::template::TemplateStatus;
use procforge_core::types::{DbId, TenantScope, Timestamp};

/// A row from the `process_template_snapshots` table. Immutable once written.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSnapshot {
    pub id: DbId,
    pub template_key: String,
    pub snapshot_name: String,
    pub content: String,
    pub source_template_id: DbId,
    #[sqlx(try_from = "String")]
    pub source_template_status: TemplateStatus,
    pub source_template_version: i32,
    pub category_id: DbId,
    pub category_name: String,
    pub category_code: String,
    pub tags: Vec<String>,
    pub form_config: Option<serde_json::Value>,
    pub tenant_id: String,
    pub app_id: Option<String>,
    pub context_id: Option<String>,
    pub snapshot_version: i32,
    pub created_by: String,
    pub created_at: Timestamp,
}

impl TemplateSnapshot {
    pub fn scope(&self) -> TenantScope {
        TenantScope {
            tenant_id: self.tenant_id.clone(),
            app_id: self.app_id.clone(),
            context_id: self.context_id.clone(),
        }
    }
}

/// DTO for capturing a snapshot.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshot {
    pub source_template_id: DbId,
    /// `DRAFT` or `PUBLISHED`.
    pub source_kind: String,
    #[validate(length(min = 1, max = 200))]
    pub snapshot_name: String,
}

/// DTO for restoring a snapshot into a new draft.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSnapshot {
    #[validate(length(min = 1, max = 200))]
    pub new_template_name: Option<String>,
}
