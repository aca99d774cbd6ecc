//! Typed views over builtin resources.

pub mod request_criteria;

pub use request_criteria::{CriteriaKind, RequestCriteria, WorkerThreadMatch};
