//! Attribute specifications.
//!
//! An [`AttributeSpec`] declares everything the engine needs to know about one
//! attribute of a resource: its semantic type, which variants it belongs to,
//! defaults, the minimum product version that understands it and how the
//! remote service expects changes to it to be expressed.
//!
//! # Example TOML
//!
//! ```toml
//! [[resource.attribute]]
//! name = "operation_type"
//! type = "enum-set"
//! values = ["add", "delete", "modify", "search"]
//! variants = ["simple", "root-dse"]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;
use crate::version::ProductVersion;

/// Semantic type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SemanticType {
    String,
    Bool,
    Int,
    /// A `<n> <unit>` duration string.
    Duration,
    StringSet,
    /// A string restricted to `values`, compared case-insensitively.
    Enum,
    /// A set whose members are restricted to `values`.
    EnumSet,
}

impl SemanticType {
    pub fn is_set(self) -> bool {
        matches!(self, Self::StringSet | Self::EnumSet)
    }

    pub fn is_enum(self) -> bool {
        matches!(self, Self::Enum | Self::EnumSet)
    }
}

/// Whether users must, may, or cannot supply a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Presence {
    Required,
    #[default]
    Optional,
    /// Set by the remote service only. Never diffed.
    Computed,
}

fn default_incremental() -> bool {
    true
}

/// Declaration of a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: SemanticType,

    /// Allowed members for enum types, in their remote representation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,

    /// Variants this attribute is valid for. Empty means every variant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,

    #[serde(default)]
    pub presence: Presence,

    /// Applied only when the user leaves the attribute undefined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Per-variant defaults, taking precedence over `default`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variant_defaults: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<ProductVersion>,

    /// Changing the value forces the object to be destroyed and recreated.
    #[serde(default)]
    pub immutable: bool,

    /// An empty string is equivalent to the attribute being absent.
    #[serde(default)]
    pub empty_is_null: bool,

    /// Scalar strings compare case-insensitively.
    #[serde(default)]
    pub ignore_case: bool,

    /// The remote accepts per-element add/remove for this set. When false,
    /// set changes are sent as a full replace.
    #[serde(default = "default_incremental")]
    pub incremental: bool,
}

impl AttributeSpec {
    /// Create an optional attribute of the given type with no restrictions.
    pub fn new(name: impl Into<String>, kind: SemanticType) -> Self {
        Self {
            name: name.into(),
            kind,
            values: Vec::new(),
            variants: Vec::new(),
            presence: Presence::Optional,
            default: None,
            variant_defaults: BTreeMap::new(),
            min_version: None,
            immutable: false,
            empty_is_null: false,
            ignore_case: false,
            incremental: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    pub fn for_variants(mut self, variants: &[&str]) -> Self {
        self.variants = variants.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_values(mut self, values: &[&str]) -> Self {
        self.values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_variant_default(mut self, variant: &str, value: impl Into<Value>) -> Self {
        self.variant_defaults.insert(variant.to_string(), value.into());
        self
    }

    pub fn since(mut self, version: ProductVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn empty_is_null(mut self) -> Self {
        self.empty_is_null = true;
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Mark a set attribute as replace-only.
    pub fn replace_only(mut self) -> Self {
        self.incremental = false;
        self
    }

    /// Whether this attribute is valid for `variant`.
    ///
    /// Resources without a discriminant pass `None`; every attribute applies.
    pub fn applies_to(&self, variant: Option<&str>) -> bool {
        match variant {
            None => true,
            Some(_) if self.variants.is_empty() => true,
            Some(v) => self.variants.iter().any(|candidate| candidate == v),
        }
    }

    /// Default value for `variant`, if any.
    pub fn default_for(&self, variant: Option<&str>) -> Option<&Value> {
        variant
            .and_then(|v| self.variant_defaults.get(v))
            .or(self.default.as_ref())
    }

    /// Every default this attribute may inject, across variants.
    pub fn all_defaults(&self) -> impl Iterator<Item = &Value> {
        self.default.iter().chain(self.variant_defaults.values())
    }

    pub fn is_computed(&self) -> bool {
        self.presence == Presence::Computed
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    pub fn is_set(&self) -> bool {
        self.kind.is_set()
    }

    /// True if `candidate` (already case-folded) is a declared enum member.
    pub fn allows_value(&self, candidate: &str) -> bool {
        self.values.iter().any(|v| v.eq_ignore_ascii_case(candidate))
    }
}
