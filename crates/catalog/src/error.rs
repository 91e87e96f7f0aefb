use procforge_core::error::CoreError;
use procforge_core::types::DbId;
use procforge_db::store::{StoreError, StoreResult};

/// Errors returned by the catalog managers.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Translate a unique-index rejection of a write into a domain error.
///
/// Pre-write checks catch the ordinary cases; a violation here means a
/// concurrent writer got in between the check and the write.
pub(crate) fn on_unique<T>(
    result: StoreResult<T>,
    to_core: impl FnOnce() -> CoreError,
) -> CatalogResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(StoreError::UniqueViolation(constraint)) => {
            tracing::warn!(constraint = %constraint, "Unique index rejected write");
            Err(to_core().into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Shorthand for the optimistic-concurrency failure.
pub(crate) fn conflict(entity: &'static str, id: DbId) -> CoreError {
    CoreError::ConcurrentModification { entity, id }
}

/// Shorthand for a missing record.
pub(crate) fn not_found(entity: &'static str, id: DbId) -> CoreError {
    CoreError::NotFound { entity, id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use procforge_core::types::new_id;
    use procforge_db::store::DatabaseError;

    #[test]
    fn unique_violations_become_domain_errors() {
        let id = new_id();
        let result: StoreResult<()> = Err(StoreError::UniqueViolation("uq".to_string()));
        assert_matches!(
            on_unique(result, || conflict("TemplateDraft", id)),
            Err(CatalogError::Core(CoreError::ConcurrentModification { entity: "TemplateDraft", .. }))
        );
    }

    #[test]
    fn other_store_errors_pass_through() {
        let result: StoreResult<()> = Err(StoreError::Database(DatabaseError::RowNotFound));
        assert_matches!(
            on_unique(result, || CoreError::Internal("unused".to_string())),
            Err(CatalogError::Store(StoreError::Database(_)))
        );
    }
}
