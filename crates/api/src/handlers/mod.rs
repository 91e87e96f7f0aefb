pub mod categories;
pub mod snapshots;
pub mod templates;
