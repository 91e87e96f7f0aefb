use std::fmt;

use serde::{Deserialize, Serialize};

/// All primary keys are UUIDv7, generated in-process before insert.
///
/// Category paths embed the row id, so the id must be known before the
/// row is written.
pub type DbId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh, time-ordered identifier.
pub fn new_id() -> DbId {
    uuid::Uuid::now_v7()
}

/// The `{tenant_id, app_id, context_id}` partition every record lives in.
///
/// Used uniformly as the filter and uniqueness dimension for categories,
/// drafts, published templates and snapshots. Two scopes are equal only
/// when all three components match; an absent `app_id` is distinct from
/// any present one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    pub tenant_id: String,
    pub app_id: Option<String>,
    pub context_id: Option<String>,
}

impl TenantScope {
    pub fn new(
        tenant_id: impl Into<String>,
        app_id: Option<String>,
        context_id: Option<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            app_id: normalize(app_id),
            context_id: normalize(context_id),
        }
    }

    /// Scope consisting of a tenant only.
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self::new(tenant_id, None, None)
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.tenant_id,
            self.app_id.as_deref().unwrap_or("-"),
            self.context_id.as_deref().unwrap_or("-"),
        )
    }
}

/// Treat blank optional components as absent so `""` and `None` never
/// produce two different scopes.
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
