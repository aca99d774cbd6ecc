//! Schema registry
//!
//! Maps resource type names to their [`ResourceSchema`]. The built-in registry
//! is constructed once per process and shared read-only.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::loader::SchemaLoader;
use crate::resource::ResourceSchema;

static BUILTIN_REGISTRY: LazyLock<SchemaRegistry> = LazyLock::new(SchemaRegistry::with_builtins);

/// Registry of resource schemas, keyed by resource name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    resources: BTreeMap<String, ResourceSchema>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            resources: BTreeMap::new(),
        }
    }

    /// Create a registry holding every built-in schema.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for schema in crate::builtins::builtin_resources() {
            registry.resources.insert(schema.name.clone(), schema);
        }
        registry
    }

    /// The process-wide built-in registry.
    pub fn global() -> &'static SchemaRegistry {
        &BUILTIN_REGISTRY
    }

    /// Validate and register a schema, replacing any previous one of the same name.
    pub fn register(&mut self, schema: ResourceSchema) -> Result<()> {
        schema.validate()?;
        if self.resources.contains_key(&schema.name) {
            tracing::debug!(resource = %schema.name, "Replacing registered schema");
        }
        self.resources.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Load every `*.toml` schema document in `dir` into this registry.
    ///
    /// Returns the number of schemas registered.
    pub fn extend_from_dir(&mut self, dir: &Path) -> Result<usize> {
        let schemas = SchemaLoader::new().load_dir(dir)?;
        let count = schemas.len();
        for schema in schemas {
            self.register(schema)?;
        }
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&ResourceSchema> {
        self.resources.get(name)
    }

    /// Like [`get`](Self::get) but fails with [`Error::UnknownResource`].
    pub fn require(&self, name: &str) -> Result<&ResourceSchema> {
        self.get(name).ok_or_else(|| Error::UnknownResource {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Registered resource names (sorted).
    pub fn list(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceSchema> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
