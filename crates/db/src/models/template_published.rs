//! Published template model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use procforge_core::template::TemplateStatus;
use procforge_core::types::{DbId, TenantScope, Timestamp};

/// A row from the `process_template_published` table.
///
/// Rows are never deleted; each publish adds a new row with the next
/// `flow_version` for its authoritative key.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePublished {
    pub id: DbId,
    /// Authoritative key returned by the engine.
    pub template_key: String,
    /// Key of the draft that was published; may differ from `template_key`.
    pub requested_key: String,
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub deployment_ref: String,
    pub definition_ref: String,
    pub flow_version: i32,
    pub category_id: DbId,
    pub category_name: String,
    pub category_code: String,
    pub tags: Vec<String>,
    pub form_config: Option<serde_json::Value>,
    pub tenant_id: String,
    pub app_id: Option<String>,
    pub context_id: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TemplateStatus,
    pub instance_count: i32,
    pub running_instance_count: i32,
    pub published_by: String,
    pub published_at: Timestamp,
    pub suspended_at: Option<Timestamp>,
    pub version: i32,
    pub updated_at: Timestamp,
}

impl TemplatePublished {
    pub fn scope(&self) -> TenantScope {
        TenantScope {
            tenant_id: self.tenant_id.clone(),
            app_id: self.app_id.clone(),
            context_id: self.context_id.clone(),
        }
    }
}

/// Engine-reported instance counters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceCounts {
    pub instance_count: i32,
    pub running_instance_count: i32,
}

/// Filter for paginated published listings.
#[derive(Debug, Clone)]
pub struct PublishedFilter {
    pub scope: TenantScope,
    pub category_id: Option<DbId>,
    pub status: Option<TemplateStatus>,
    pub keyword: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
