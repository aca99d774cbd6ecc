//! Error types for converge-schema

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown resource type: {name}")]
    UnknownResource { name: String },

    #[error("Invalid schema for {resource}: {message}")]
    InvalidSchema { resource: String, message: String },

    #[error("Unsupported schema format '{found}' in {path} (expected {expected})")]
    UnsupportedFormat {
        path: PathBuf,
        found: String,
        expected: String,
    },

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn invalid(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            resource: resource.into(),
            message: message.into(),
        }
    }
}
