//! Remote request construction.
//!
//! Canonical values are lowercase for enums; the remote expects the exact
//! spelling declared in the schema. Anything that has no declared spelling is
//! a [`Error::Conflict`] raised before the request is sent.

use converge_schema::{AttributeSpec, ResourceSchema, Value};

use crate::canonical::{CanonicalMap, CanonicalValue};
use crate::diff::Operation;
use crate::error::{Error, Result};
use crate::object::ObjectId;
use crate::remote::AddRequest;

fn remote_spelling(spec: &AttributeSpec, value: &str) -> Result<String> {
    if !spec.kind.is_enum() {
        return Ok(value.to_string());
    }
    spec.values
        .iter()
        .find(|declared| declared.eq_ignore_ascii_case(value))
        .cloned()
        .ok_or_else(|| Error::Conflict {
            attribute: spec.name.clone(),
            message: format!(
                "\"{value}\" has no remote representation; expected one of {{{}}}",
                spec.values.join(", ")
            ),
        })
}

fn to_remote_value(spec: &AttributeSpec, value: &CanonicalValue) -> Result<Value> {
    Ok(match value {
        CanonicalValue::Absent => Value::Null,
        CanonicalValue::Text(s) => Value::String(remote_spelling(spec, s)?),
        CanonicalValue::Bool(b) => Value::Bool(*b),
        CanonicalValue::Int(i) => Value::Int(*i),
        CanonicalValue::Set(items) => Value::Set(
            items
                .iter()
                .map(|item| remote_spelling(spec, item))
                .collect::<Result<_>>()?,
        ),
    })
}

/// Build the ADD payload for a resolved, canonical plan.
///
/// Only attributes applicable to `variant` with a value are sent; computed
/// attributes never are.
pub fn build_add_request(
    id: &ObjectId,
    variant: Option<&str>,
    plan: &CanonicalMap,
    schema: &ResourceSchema,
) -> Result<AddRequest> {
    let mut request = AddRequest {
        id: id.clone(),
        discriminant: variant.map(str::to_string),
        ..AddRequest::default()
    };

    for spec in schema.applicable(variant) {
        if spec.is_computed() {
            continue;
        }
        match plan.get(&spec.name) {
            None | Some(CanonicalValue::Absent) => {}
            Some(value) => {
                request
                    .attributes
                    .insert(spec.name.clone(), to_remote_value(spec, value)?);
            }
        }
    }

    Ok(request)
}

/// Validate an operation list and rewrite enum values to their remote spelling.
pub fn check_operations(operations: &[Operation], schema: &ResourceSchema) -> Result<Vec<Operation>> {
    operations
        .iter()
        .map(|op| {
            let spec = schema.get(&op.attribute).ok_or_else(|| Error::Conflict {
                attribute: op.attribute.clone(),
                message: format!("not an attribute of {}", schema.name),
            })?;
            let values = op
                .values
                .iter()
                .map(|value| remote_spelling(spec, value))
                .collect::<Result<_>>()?;
            Ok(Operation {
                values,
                ..op.clone()
            })
        })
        .collect()
}
