//! Diff engine
//!
//! [`diff`] compares a canonical plan against canonical state and returns the
//! ordered operations that converge the state. It is pure and cannot fail.
//! Output order follows schema declaration order so it is stable across runs.

use std::fmt;

use converge_schema::{AttributeMap, ResourceSchema, Value};
use serde::{Deserialize, Serialize};

use crate::canonical::{self, CanonicalMap, CanonicalValue};
use crate::object::ConfigurationObject;
use crate::variant;

/// What an [`Operation`] does to its attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Add elements to a set
    AddValues,
    /// Remove elements from a set
    RemoveValues,
    /// Replace the whole value
    Replace,
    /// Clear the attribute
    RemoveAll,
}

/// A single change to one attribute of a remote object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub attribute: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl Operation {
    pub fn add_values(attribute: &str, values: impl IntoIterator<Item = String>) -> Self {
        Self::with_values(OperationKind::AddValues, attribute, values)
    }

    pub fn remove_values(attribute: &str, values: impl IntoIterator<Item = String>) -> Self {
        Self::with_values(OperationKind::RemoveValues, attribute, values)
    }

    pub fn replace(attribute: &str, values: impl IntoIterator<Item = String>) -> Self {
        Self::with_values(OperationKind::Replace, attribute, values)
    }

    pub fn remove_all(attribute: &str) -> Self {
        Self::with_values(OperationKind::RemoveAll, attribute, Vec::new())
    }

    fn with_values(
        kind: OperationKind,
        attribute: &str,
        values: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            kind,
            attribute: attribute.to_string(),
            values: values.into_iter().collect(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            OperationKind::AddValues => "add",
            OperationKind::RemoveValues => "remove",
            OperationKind::Replace => "replace",
            OperationKind::RemoveAll => "remove-all",
        };
        if self.values.is_empty() {
            write!(f, "{verb} {}", self.attribute)
        } else {
            write!(f, "{verb} {} [{}]", self.attribute, self.values.join(", "))
        }
    }
}

/// Operations that converge `state` to `plan` for the attributes of `variant`.
///
/// Attributes missing from `plan` are skipped, so values the remote computes
/// and the user never mentioned are left alone. Computed attributes are never
/// diffed. The result is empty exactly when every applicable plan value
/// equals the state value.
pub fn diff(
    plan: &CanonicalMap,
    state: &CanonicalMap,
    schema: &ResourceSchema,
    variant: Option<&str>,
) -> Vec<Operation> {
    let mut operations = Vec::new();

    for spec in schema.applicable(variant) {
        if spec.is_computed() {
            continue;
        }
        let Some(wanted) = plan.get(&spec.name) else {
            continue;
        };
        let actual = state.get(&spec.name).unwrap_or(&CanonicalValue::Absent);
        if wanted == actual {
            continue;
        }

        if !spec.is_set() {
            operations.push(match wanted {
                CanonicalValue::Absent => Operation::remove_all(&spec.name),
                value => Operation::replace(&spec.name, value.render()),
            });
            continue;
        }

        let wanted_members = wanted.members();
        let actual_members = actual.members();
        if wanted_members == actual_members {
            continue;
        }
        if wanted_members.is_empty() {
            operations.push(Operation::remove_all(&spec.name));
            continue;
        }
        if !spec.incremental {
            operations.push(Operation::replace(&spec.name, wanted_members));
            continue;
        }

        let added: Vec<String> = wanted_members.difference(&actual_members).cloned().collect();
        let removed: Vec<String> = actual_members.difference(&wanted_members).cloned().collect();
        if !added.is_empty() {
            operations.push(Operation::add_values(&spec.name, added));
        }
        if !removed.is_empty() {
            operations.push(Operation::remove_values(&spec.name, removed));
        }
    }

    operations
}

/// Apply `operations` to a raw attribute map the way the remote service does.
pub fn apply_operations(attributes: &mut AttributeMap, operations: &[Operation]) {
    for op in operations {
        match op.kind {
            OperationKind::RemoveAll => {
                attributes.remove(&op.attribute);
            }
            OperationKind::Replace => {
                let existing_is_set = matches!(attributes.get(&op.attribute), Some(Value::Set(_)));
                let value = match op.values.as_slice() {
                    [] => Value::Null,
                    [single] if !existing_is_set => Value::String(single.clone()),
                    many => Value::Set(many.to_vec()),
                };
                attributes.insert(op.attribute.clone(), value);
            }
            OperationKind::AddValues | OperationKind::RemoveValues => {
                let mut members: Vec<String> = match attributes.remove(&op.attribute) {
                    Some(Value::Set(items)) => items,
                    Some(Value::String(s)) if !s.is_empty() => vec![s],
                    _ => Vec::new(),
                };
                if op.kind == OperationKind::AddValues {
                    for value in &op.values {
                        if !members.contains(value) {
                            members.push(value.clone());
                        }
                    }
                } else {
                    members.retain(|m| !op.values.contains(m));
                }
                if !members.is_empty() {
                    attributes.insert(op.attribute.clone(), Value::Set(members));
                }
            }
        }
    }
}

/// Changes between `prior` and `plan` that an in-place update cannot make.
///
/// `plan_variant` is the variant the plan resolved to, default included.
/// Identifier and discriminant are fixed at creation, as is every attribute
/// declared immutable. Each returned string names one such change.
pub fn replacement_reasons(
    plan: &ConfigurationObject,
    plan_variant: Option<&str>,
    prior: &ConfigurationObject,
    schema: &ResourceSchema,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if plan.id != prior.id {
        reasons.push(format!("identifier changed from '{}' to '{}'", prior.id, plan.id));
    }

    if let Some(decl) = &schema.discriminant {
        let before =
            variant::stated_variant(prior.discriminant.as_deref(), &prior.attributes, schema);
        if let (Some(before), Some(after)) = (before, plan_variant)
            && before != after
        {
            reasons.push(format!("{} changed from {before} to {after}", decl.attribute));
        }
    }

    for spec in schema.attributes.iter().filter(|s| s.immutable) {
        let Some(wanted) = plan.attributes.get(&spec.name) else {
            continue;
        };
        if !wanted.is_defined() {
            continue;
        }
        let actual = prior.attributes.get(&spec.name).unwrap_or(&Value::Null);
        if !canonical::equal(wanted, actual, spec) {
            reasons.push(format!(
                "attribute {} is immutable ({actual} -> {wanted})",
                spec.name
            ));
        }
    }

    reasons
}
