//! Declarative attribute schemas for the converge reconciliation engine.
//!
//! This crate holds everything the engine reads but never changes at
//! runtime: raw [`Value`]s, [`AttributeSpec`] and [`ResourceSchema`]
//! declarations, [`ProductVersion`] and the [`SchemaRegistry`].
//!
//! Schemas come from two places:
//!
//! - **Built-ins** compiled into the crate, available through
//!   [`SchemaRegistry::global`]
//! - **Schema documents** in TOML, loaded with [`SchemaLoader`]
//!
//! Adding a resource type is a schema change only; the engine has no
//! per-resource code.

pub mod attribute;
pub mod builtins;
pub mod error;
pub mod loader;
pub mod registry;
pub mod resource;
pub mod value;
pub mod version;

pub use attribute::{AttributeSpec, Presence, SemanticType};
pub use builtins::{BUILTIN_COUNT, builtin_resources};
pub use error::{Error, Result};
pub use loader::{SUPPORTED_FORMAT, SchemaLoader};
pub use registry::SchemaRegistry;
pub use resource::{Discriminant, Lifecycle, ResourceSchema};
pub use value::{AttributeMap, Value};
pub use version::ProductVersion;
