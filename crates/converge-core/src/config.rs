//! Engine configuration
//!
//! Configuration is read from `converge.toml` in a working directory, then
//! overlaid with `converge.local.toml` when present. Tables are merged
//! recursively; scalar values in the later file win.
//!
//! ```toml
//! [remote]
//! version = "9.2.0.0"
//!
//! [reconcile]
//! second_pass = true
//! dry_run = false
//!
//! [import]
//! delimiter = "/"
//!
//! [schema]
//! paths = ["schemas"]
//!
//! [logging]
//! filter = "converge_core=debug"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use converge_schema::{ProductVersion, SchemaRegistry};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::import::DEFAULT_DELIMITER;
use crate::reconcile::ReconcileOptions;

/// Main configuration file name.
pub const CONFIG_FILE: &str = "converge.toml";
/// Untracked per-machine overrides.
pub const LOCAL_CONFIG_FILE: &str = "converge.local.toml";

fn default_true() -> bool {
    true
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

fn default_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSection {
    /// Version negotiated with the remote service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ProductVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSection {
    #[serde(default = "default_true")]
    pub second_pass: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            second_pass: true,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSection {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSection {
    /// Directories of schema documents, relative to the config directory
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

/// Resolved engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub reconcile: ReconcileSection,
    #[serde(default)]
    pub import: ImportSection,
    #[serde(default)]
    pub schema: SchemaSection,
    #[serde(default)]
    pub logging: LoggingSection,

    /// Directory relative schema paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl EngineConfig {
    /// Parse a configuration from TOML content.
    pub fn parse(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `converge.toml` from `dir`, overlaid with `converge.local.toml`.
    ///
    /// Missing files are skipped; with neither present the defaults apply.
    pub fn resolve(dir: &Path) -> Result<Self> {
        let mut merged = toml::Table::new();

        for name in [CONFIG_FILE, LOCAL_CONFIG_FILE] {
            let path = dir.join(name);
            if !path.is_file() {
                debug!(?path, "no config file, skipping");
                continue;
            }
            debug!(?path, "loading config");
            let content = fs::read_to_string(&path)?;
            let layer: toml::Table = toml::from_str(&content)?;
            merge_tables(&mut merged, layer);
        }

        let mut config: EngineConfig = toml::Value::Table(merged).try_into()?;
        config.base_dir = dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.import.delimiter.is_empty() {
            return Err(Error::Config {
                message: "import.delimiter must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The negotiated remote version, preferring `override_version`.
    pub fn version(&self, override_version: Option<ProductVersion>) -> Result<ProductVersion> {
        override_version
            .or(self.remote.version)
            .ok_or_else(|| Error::Config {
                message: "remote.version is not set".to_string(),
            })
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            second_pass: self.reconcile.second_pass,
            dry_run: self.reconcile.dry_run,
            import_delimiter: self.import.delimiter.clone(),
        }
    }

    /// Builtin schemas plus every document under the configured paths.
    pub fn registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::with_builtins();
        for path in &self.schema.paths {
            let dir = self.base_dir.join(path);
            let added = registry.extend_from_dir(&dir)?;
            debug!(?dir, added, "loaded schema documents");
        }
        Ok(registry)
    }
}

/// Merge `overlay` into `base`: tables recursively, everything else replaced.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
