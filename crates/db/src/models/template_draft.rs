//! Draft template model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use procforge_core::template::TemplateStatus;
use procforge_core::types::{DbId, TenantScope, Timestamp};

/// A row from the `process_template_drafts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDraft {
    pub id: DbId,
    pub template_key: String,
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub category_id: DbId,
    /// Category name at the time of the last write.
    pub category_name: String,
    /// Category code at the time of the last write.
    pub category_code: String,
    pub tags: Vec<String>,
    pub form_config: Option<serde_json::Value>,
    pub tenant_id: String,
    pub app_id: Option<String>,
    pub context_id: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TemplateStatus,
    pub version: i32,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TemplateDraft {
    pub fn scope(&self) -> TenantScope {
        TenantScope {
            tenant_id: self.tenant_id.clone(),
            app_id: self.app_id.clone(),
            context_id: self.context_id.clone(),
        }
    }
}

/// DTO for designing a new draft.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraft {
    #[validate(length(min = 1, max = 128))]
    pub template_key: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub content: String,
    pub category_id: DbId,
    pub tags: Option<Vec<String>>,
    pub form_config: Option<serde_json::Value>,
}

/// DTO for editing a draft. Absent fields keep their current value.
///
/// `version`, when given, must equal the stored version or the update is
/// refused as a concurrent modification.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDraft {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<DbId>,
    pub tags: Option<Vec<String>>,
    pub form_config: Option<serde_json::Value>,
    pub version: Option<i32>,
}

/// Filter for paginated draft listings.
#[derive(Debug, Clone)]
pub struct DraftFilter {
    pub scope: TenantScope,
    pub category_id: Option<DbId>,
    pub keyword: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
