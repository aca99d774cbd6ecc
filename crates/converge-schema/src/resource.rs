//! Resource schemas: the declarative shape of one managed resource type.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeSpec, SemanticType};
use crate::error::{Error, Result};
use crate::value::Value;
use crate::version::ProductVersion;

/// How the engine treats the lifetime of remote objects of a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lifecycle {
    /// Created and destroyed by the engine.
    #[default]
    Owned,
    /// Always exists remotely; adopted and edited, never created or deleted.
    EditOnly,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owned => write!(f, "owned"),
            Self::EditOnly => write!(f, "edit-only"),
        }
    }
}

/// The attribute selecting one of several mutually exclusive shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discriminant {
    pub attribute: String,
    pub variants: Vec<String>,
    /// Variant used when the plan leaves the discriminant undefined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Discriminant {
    pub fn new(attribute: impl Into<String>, variants: &[&str]) -> Self {
        Self {
            attribute: attribute.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
            default: None,
        }
    }

    /// Match `candidate` against the declared variants, ignoring case.
    pub fn find(&self, candidate: &str) -> Option<&str> {
        let folded = candidate.trim().to_lowercase();
        self.variants
            .iter()
            .find(|v| v.to_lowercase() == folded)
            .map(String::as_str)
    }
}

fn default_keyed() -> bool {
    true
}

/// Declarative schema for one resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub lifecycle: Lifecycle,

    /// False for singletons that are addressed without a key of their own.
    #[serde(default = "default_keyed")]
    pub keyed: bool,

    /// Names of the parent identifiers, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminant: Option<Discriminant>,

    /// Minimum product version that offers this resource at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<ProductVersion>,

    /// Attributes in declaration order.
    #[serde(default, rename = "attribute")]
    pub attributes: Vec<AttributeSpec>,
}

impl ResourceSchema {
    /// Create an owned, keyed resource with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            lifecycle: Lifecycle::Owned,
            keyed: true,
            parents: Vec::new(),
            discriminant: None,
            min_version: None,
            attributes: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Make this an edit-only singleton.
    pub fn edit_only_singleton(mut self) -> Self {
        self.lifecycle = Lifecycle::EditOnly;
        self.keyed = false;
        self
    }

    pub fn with_parents(mut self, parents: &[&str]) -> Self {
        self.parents = parents.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_discriminant(mut self, discriminant: Discriminant) -> Self {
        self.discriminant = Some(discriminant);
        self
    }

    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    pub fn is_edit_only(&self) -> bool {
        self.lifecycle == Lifecycle::EditOnly
    }

    /// Look up an attribute by name.
    pub fn get(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes valid for `variant`, in declaration order.
    pub fn applicable<'a>(
        &'a self,
        variant: Option<&'a str>,
    ) -> impl Iterator<Item = &'a AttributeSpec> + 'a {
        self.attributes.iter().filter(move |a| a.applies_to(variant))
    }

    /// Declared variant names; empty when the resource is not sum-typed.
    pub fn variants(&self) -> &[String] {
        self.discriminant
            .as_ref()
            .map(|d| d.variants.as_slice())
            .unwrap_or_default()
    }

    /// Number of segments an import identifier must have.
    pub fn id_segments(&self) -> usize {
        self.parents.len() + usize::from(self.keyed)
    }

    /// Human-readable import identifier pattern, e.g. `[backend_name]/[name]`.
    pub fn import_format(&self, delimiter: &str) -> String {
        let mut segments: Vec<String> = self.parents.iter().map(|p| format!("[{p}]")).collect();
        if self.keyed {
            segments.push("[name]".to_string());
        }
        segments.join(delimiter)
    }

    /// Check the schema for internal consistency.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let variants = self.variants();

        if let Some(discriminant) = &self.discriminant {
            if discriminant.variants.is_empty() {
                return Err(Error::invalid(&self.name, "discriminant declares no variants"));
            }
            if let Some(default) = &discriminant.default
                && discriminant.find(default).is_none()
            {
                return Err(Error::invalid(
                    &self.name,
                    format!("default variant '{default}' is not declared"),
                ));
            }
            seen.insert(discriminant.attribute.as_str());
        }

        for attr in &self.attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(Error::invalid(
                    &self.name,
                    format!("attribute '{}' is declared more than once", attr.name),
                ));
            }

            for variant in attr.variants.iter().chain(attr.variant_defaults.keys()) {
                if !variants.contains(variant) {
                    return Err(Error::invalid(
                        &self.name,
                        format!(
                            "attribute '{}' references undeclared variant '{variant}'",
                            attr.name
                        ),
                    ));
                }
            }

            if attr.kind.is_enum() && attr.values.is_empty() {
                return Err(Error::invalid(
                    &self.name,
                    format!("enum attribute '{}' declares no values", attr.name),
                ));
            }

            if attr.is_computed() && attr.default.is_some() {
                return Err(Error::invalid(
                    &self.name,
                    format!("computed attribute '{}' cannot have a default", attr.name),
                ));
            }

            for default in attr.all_defaults() {
                check_default(&self.name, attr, default)?;
            }
        }

        Ok(())
    }
}

fn check_default(resource: &str, attr: &AttributeSpec, default: &Value) -> Result<()> {
    let members: Vec<&str> = match (attr.kind, default) {
        (SemanticType::Enum, Value::String(s)) => vec![s.as_str()],
        (SemanticType::EnumSet, Value::Set(items)) => items.iter().map(String::as_str).collect(),
        (SemanticType::String | SemanticType::Duration, Value::String(_))
        | (SemanticType::Bool, Value::Bool(_))
        | (SemanticType::Int, Value::Int(_))
        | (SemanticType::StringSet, Value::Set(_)) => Vec::new(),
        (kind, other) => {
            return Err(Error::invalid(
                resource,
                format!(
                    "default for '{}' is a {} but the attribute is {:?}",
                    attr.name,
                    other.type_name(),
                    kind
                ),
            ));
        }
    };

    if let Some(bad) = members.into_iter().find(|m| !attr.allows_value(m)) {
        return Err(Error::invalid(
            resource,
            format!("default '{bad}' for '{}' is not an allowed value", attr.name),
        ));
    }

    Ok(())
}
