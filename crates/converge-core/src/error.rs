//! Error types for converge-core
//!
//! The taxonomy follows the "fail before you call" rule: validation and
//! conflict errors are raised before any remote request is made, so they
//! never leave partial state behind.

use std::fmt;

use serde::Serialize;

/// Result type for converge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Category of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationKind {
    /// Discriminant missing or not one of the declared variants
    UnknownVariant,
    /// Attribute set for a variant it does not belong to
    NotApplicable,
    /// Attribute not declared by the schema
    UnknownAttribute,
    /// User supplied a value for a computed-only attribute
    Computed,
    /// Required attribute left undefined
    Required,
    /// Attribute or resource newer than the negotiated version
    VersionUnsupported,
    /// Value cannot be interpreted as the attribute's type
    InvalidValue,
    /// Change that cannot be applied to this kind of object
    Immutable,
}

/// A problem with the plan, detected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Offending attribute (or discriminant / resource name)
    pub attribute: String,
    pub kind: ValidationKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(attribute: impl Into<String>, kind: ValidationKind, message: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_variant(discriminant: &str, value: Option<&str>, allowed: &[String]) -> Self {
        let message = match value {
            Some(v) => format!(
                "{discriminant} \"{v}\" is not valid; expected one of {{{}}}",
                allowed.join(", ")
            ),
            None => format!(
                "{discriminant} is required; expected one of {{{}}}",
                allowed.join(", ")
            ),
        };
        Self::new(discriminant, ValidationKind::UnknownVariant, message)
    }

    pub fn not_applicable(attribute: &str, discriminant: &str, variants: &[String]) -> Self {
        Self::new(
            attribute,
            ValidationKind::NotApplicable,
            format!(
                "attribute {attribute} only valid when {discriminant} ∈ {{{}}}",
                variants.join(", ")
            ),
        )
    }

    pub fn invalid_value(attribute: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            attribute,
            ValidationKind::InvalidValue,
            format!("invalid value for {attribute}: {reason}"),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

fn render_validation(errors: &[ValidationError]) -> String {
    match errors {
        [single] => single.message.clone(),
        many => {
            let lines: Vec<&str> = many.iter().map(|e| e.message.as_str()).collect();
            format!("{} validation errors: {}", many.len(), lines.join("; "))
        }
    }
}

fn not_found_hint(edit_only: &bool) -> &'static str {
    if *edit_only {
        " (edit-only objects must always exist on the remote service)"
    } else {
        ""
    }
}

/// Errors that can occur in converge-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One or more plan problems found before any remote call
    #[error("{}", render_validation(.0))]
    Validation(Vec<ValidationError>),

    /// The remote service reported the object missing
    #[error("{resource} '{id}' not found{}", not_found_hint(.edit_only))]
    NotFound {
        resource: String,
        id: String,
        edit_only: bool,
    },

    /// Non-success response or transport failure, with the remote's message
    #[error("{operation} {resource} '{id}' failed: {message}")]
    Remote {
        operation: &'static str,
        resource: String,
        id: String,
        message: String,
    },

    /// Malformed input discovered while building a remote request
    #[error("cannot build request for {attribute}: {message}")]
    Conflict { attribute: String, message: String },

    /// Import identifier with the wrong shape
    #[error("invalid import identifier '{id}' for {resource}: expected {expected}")]
    InvalidImportId {
        resource: String,
        id: String,
        expected: String,
    },

    /// Engine configuration problem
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Schema error from converge-schema
    #[error(transparent)]
    Schema(#[from] converge_schema::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    /// Validation errors carried by this error, if any.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Validation(errors) => errors.as_slice(),
            _ => &[],
        }
    }

    /// True when no remote call was attempted before this error was raised.
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Conflict { .. } | Self::InvalidImportId { .. }
        )
    }
}

impl From<ValidationError> for Error {
    fn from(error: ValidationError) -> Self {
        Self::Validation(vec![error])
    }
}
