//! Configuration objects and their identifiers.

use std::fmt;

use converge_schema::AttributeMap;
use serde::{Deserialize, Serialize};

/// Identifier of a remote object: parent keys, outermost first, plus its own key.
///
/// Singletons have an empty key and no parents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ObjectId {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default)]
    pub key: String,
}

impl ObjectId {
    /// A top-level object.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            parents: Vec::new(),
            key: key.into(),
        }
    }

    /// An object scoped under parent objects.
    pub fn nested<I, S>(parents: I, key: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parents: parents.into_iter().map(Into::into).collect(),
            key: key.into(),
        }
    }

    /// The identifier of a singleton.
    pub fn singleton() -> Self {
        Self::default()
    }

    pub fn is_singleton(&self) -> bool {
        self.parents.is_empty() && self.key.is_empty()
    }

    /// Join parents and key with `delimiter`.
    pub fn render(&self, delimiter: &str) -> String {
        let mut segments: Vec<&str> = self.parents.iter().map(String::as_str).collect();
        if !self.key.is_empty() {
            segments.push(&self.key);
        }
        segments.join(delimiter)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render("/"))
    }
}

/// One managed resource instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigurationObject {
    /// Resource type name in the schema registry
    pub resource: String,
    #[serde(default)]
    pub id: ObjectId,
    /// Selected variant for sum-typed resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminant: Option<String>,
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl ConfigurationObject {
    pub fn new(resource: impl Into<String>, id: ObjectId) -> Self {
        Self {
            resource: resource.into(),
            id,
            discriminant: None,
            attributes: AttributeMap::new(),
        }
    }

    pub fn with_discriminant(mut self, variant: impl Into<String>) -> Self {
        self.discriminant = Some(variant.into());
        self
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<converge_schema::Value>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Plan and prior state of one object for a single reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassState {
    pub plan: ConfigurationObject,
    #[serde(default)]
    pub prior: Option<ConfigurationObject>,
}

impl PassState {
    pub fn new(plan: ConfigurationObject, prior: Option<ConfigurationObject>) -> Self {
        Self { plan, prior }
    }
}
