//! Row models and request DTOs for the catalog tables.

pub mod category;
pub mod template_draft;
pub mod template_published;
pub mod template_snapshot;
