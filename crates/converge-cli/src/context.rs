//! Engine context for one CLI invocation
//!
//! Resolves `converge.toml` (plus local overrides) from the config directory
//! and builds the schema registry it describes.

use std::fs;
use std::path::Path;

use converge_core::{ConfigurationObject, EngineConfig};
use converge_schema::{ResourceSchema, SchemaRegistry};
use tracing::debug;

use crate::error::{CliError, Result};

pub struct Context {
    pub config: EngineConfig,
    pub registry: SchemaRegistry,
}

impl Context {
    /// Load configuration and schemas from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(CliError::user(format!(
                "config directory not found: {}",
                dir.display()
            )));
        }
        let config = EngineConfig::resolve(dir)?;
        let registry = config.registry()?;
        debug!(dir = %dir.display(), resources = registry.len(), "context loaded");
        Ok(Self { config, registry })
    }

    pub fn schema(&self, resource: &str) -> Result<&ResourceSchema> {
        Ok(self.registry.require(resource)?)
    }
}

/// Read a configuration object from a JSON file.
pub fn read_object(path: &Path) -> Result<ConfigurationObject> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::user(format!("cannot read {}: {e}", path.display()))
    })?;
    let object = serde_json::from_str(&content)?;
    Ok(object)
}
