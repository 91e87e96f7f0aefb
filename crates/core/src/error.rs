use crate::types::DbId;

/// Domain errors raised by the category tree, template lifecycle and
/// snapshot operations.
///
/// Every variant is detected before any write is made, except
/// [`CoreError::ConcurrentModification`] (detected by a conditional update
/// affecting zero rows) and [`CoreError::DeploymentFailed`] (raised by the
/// external engine before anything is persisted).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Category code already exists in scope: {0}")]
    DuplicateCode(String),

    #[error("Template key already exists in scope: {0}")]
    DuplicateKey(String),

    #[error("Parent category not found: {0}")]
    ParentNotFound(DbId),

    #[error("Category not found: {0}")]
    CategoryNotFound(DbId),

    #[error("Cannot move category {id} beneath its own subtree")]
    CyclicMove { id: DbId },

    #[error("Category still has {count} child categories")]
    HasChildren { count: i64 },

    #[error("Category still has {count} linked templates")]
    HasTemplates { count: i64 },

    #[error("Invalid process content: {}", .0.join("; "))]
    InvalidContent(Vec<String>),

    #[error("Deployment failed: {0}")]
    DeploymentFailed(String),

    #[error("Template {0} is not active")]
    NotActive(DbId),

    #[error("Template {0} is not inactive")]
    NotInactive(DbId),

    #[error("Template has {count} running instances")]
    HasRunningInstances { count: i32 },

    #[error("{entity} {id} was modified concurrently; re-read and retry")]
    ConcurrentModification { entity: &'static str, id: DbId },

    #[error("Invalid snapshot source kind: {0}")]
    InvalidSourceKind(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::Validation(errors.to_string())
    }
}
