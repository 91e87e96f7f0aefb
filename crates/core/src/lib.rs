//! Domain core for process template administration.
//!
//! Pure logic shared by the persistence, orchestration and HTTP layers:
//! identifiers and tenant scoping, the error taxonomy, materialized-path
//! arithmetic for the category tree, template lifecycle rules, process
//! document validation and the deployment gateway seam.

pub mod category_tree;
pub mod content;
pub mod deployment;
pub mod error;
pub mod search;
pub mod template;
pub mod types;
