//! Zero-sized repositories, one per table.
//!
//! Each takes a `&mut PgConnection` so it runs equally against a pooled
//! connection or inside a transaction.

pub mod category_repo;
pub mod template_draft_repo;
pub mod template_published_repo;
pub mod template_snapshot_repo;

pub use category_repo::CategoryRepo;
pub use template_draft_repo::TemplateDraftRepo;
pub use template_published_repo::TemplatePublishedRepo;
pub use template_snapshot_repo::TemplateSnapshotRepo;

/// Tenant scope predicate binding `$first`, `$first+1`, `$first+2` to
/// `tenant_id`, `app_id` and `context_id`.
///
/// Absent app/context ids match only rows where they are absent too.
pub(crate) fn scope_clause(first: u32) -> String {
    format!(
        "tenant_id = ${first} \
         AND app_id IS NOT DISTINCT FROM ${} \
         AND context_id IS NOT DISTINCT FROM ${}",
        first + 1,
        first + 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_clause_numbers_parameters() {
        assert_eq!(
            scope_clause(2),
            "tenant_id = $2 AND app_id IS NOT DISTINCT FROM $3 AND context_id IS NOT DISTINCT FROM $4"
        );
    }
}
