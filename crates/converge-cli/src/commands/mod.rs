//! Command implementations for converge-cli

pub mod diff;
pub mod import_id;
pub mod schema;
pub mod validate;

pub use diff::run_diff;
pub use import_id::run_import_id;
pub use schema::{run_schema_list, run_schema_show};
pub use validate::run_validate;
