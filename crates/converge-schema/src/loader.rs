//! Loader for declarative schema documents.
//!
//! A schema document is a TOML file declaring one or more resources:
//!
//! ```toml
//! format = "1.0.0"
//!
//! [[resource]]
//! name = "log_publisher"
//! parents = []
//!
//! [[resource.attribute]]
//! name = "enabled"
//! type = "bool"
//! presence = "required"
//! ```
//!
//! Documents whose `format` does not satisfy [`SUPPORTED_FORMAT`] are rejected
//! so that schema changes never silently change engine behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::resource::ResourceSchema;

/// Semver requirement a document's `format` must satisfy.
pub const SUPPORTED_FORMAT: &str = "^1";

#[derive(Debug, Deserialize)]
struct SchemaDocument {
    format: String,
    #[serde(default)]
    resource: Vec<ResourceSchema>,
}

/// Loads resource schemas from TOML documents.
#[derive(Debug, Default)]
pub struct SchemaLoader;

impl SchemaLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse a document from a string. `origin` is used in error messages.
    pub fn parse(&self, content: &str, origin: &Path) -> Result<Vec<ResourceSchema>> {
        let document: SchemaDocument = toml::from_str(content)?;
        check_format(&document.format, origin)?;

        for schema in &document.resource {
            schema.validate()?;
        }
        Ok(document.resource)
    }

    /// Load a single document from disk.
    pub fn load_file(&self, path: &Path) -> Result<Vec<ResourceSchema>> {
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&content, path)
    }

    /// Load every `*.toml` document in `dir`, in file name order.
    ///
    /// A missing directory yields no schemas.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<ResourceSchema>> {
        if !dir.exists() {
            tracing::debug!(dir = %dir.display(), "Schema directory does not exist");
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(dir).map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();

        let mut schemas = Vec::new();
        for file in files {
            let loaded = self.load_file(&file)?;
            tracing::debug!(file = %file.display(), count = loaded.len(), "Loaded schema document");
            schemas.extend(loaded);
        }
        Ok(schemas)
    }
}

fn check_format(found: &str, origin: &Path) -> Result<()> {
    let unsupported = || Error::UnsupportedFormat {
        path: origin.to_path_buf(),
        found: found.to_string(),
        expected: SUPPORTED_FORMAT.to_string(),
    };

    let requirement = semver::VersionReq::parse(SUPPORTED_FORMAT).map_err(|_| unsupported())?;
    let version = semver::Version::parse(found.trim()).map_err(|_| unsupported())?;

    if requirement.matches(&version) {
        Ok(())
    } else {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::SemanticType;
    use crate::resource::Lifecycle;

    const DOC: &str = r#"
format = "1.0.0"

[[resource]]
name = "log_publisher"
lifecycle = "owned"

[resource.discriminant]
attribute = "type"
variants = ["file", "syslog"]

[[resource.attribute]]
name = "enabled"
type = "bool"
presence = "required"

[[resource.attribute]]
name = "log_file"
type = "string"
variants = ["file"]
"#;

    #[test]
    fn test_parse_document() {
        let schemas = SchemaLoader::new()
            .parse(DOC, Path::new("inline.toml"))
            .unwrap();
        assert_eq!(schemas.len(), 1);

        let schema = &schemas[0];
        assert_eq!(schema.name, "log_publisher");
        assert_eq!(schema.lifecycle, Lifecycle::Owned);
        assert!(schema.keyed);
        assert_eq!(schema.variants(), ["file", "syslog"]);
        assert_eq!(schema.attributes.len(), 2);
        assert_eq!(schema.attributes[0].kind, SemanticType::Bool);
        assert!(schema.attributes[0].is_required());
    }

    #[test]
    fn test_rejects_unsupported_format() {
        let doc = DOC.replace("1.0.0", "2.0.0");
        let err = SchemaLoader::new()
            .parse(&doc, Path::new("future.toml"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("future.toml"));
    }

    #[test]
    fn test_rejects_invalid_schema() {
        let doc = DOC.replace("variants = [\"file\"]", "variants = [\"socket\"]");
        let err = SchemaLoader::new()
            .parse(&doc, Path::new("broken.toml"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema { .. }));
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let loaded = SchemaLoader::new()
            .load_dir(Path::new("/definitely/not/here"))
            .unwrap();
        assert!(loaded.is_empty());
    }
}
