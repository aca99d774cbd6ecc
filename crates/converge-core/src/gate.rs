//! Version gate: reject plan attributes the negotiated remote cannot accept.

use converge_schema::{AttributeMap, AttributeSpec, ProductVersion, ResourceSchema, Value};

use crate::canonical::{self, CanonicalValue};
use crate::error::{ValidationError, ValidationKind};

/// Check every defined, non-default plan attribute against `negotiated`.
///
/// A resource newer than the remote yields a single error for the whole
/// resource. Otherwise one error is returned per offending attribute, in
/// declaration order.
pub fn check_supported(
    plan: &AttributeMap,
    negotiated: &ProductVersion,
    schema: &ResourceSchema,
) -> Vec<ValidationError> {
    if let Some(minimum) = &schema.min_version
        && !negotiated.satisfies(minimum)
    {
        return vec![ValidationError::new(
            &schema.name,
            ValidationKind::VersionUnsupported,
            format!(
                "resource {} requires version {minimum} or later (remote is {negotiated})",
                schema.name
            ),
        )];
    }

    schema
        .attributes
        .iter()
        .filter_map(|spec| {
            let minimum = spec.min_version.as_ref()?;
            let value = plan.get(&spec.name)?;
            if negotiated.satisfies(minimum) || !is_expressed(value, spec) {
                return None;
            }
            Some(ValidationError::new(
                &spec.name,
                ValidationKind::VersionUnsupported,
                format!(
                    "attribute {} requires version {minimum} or later (remote is {negotiated})",
                    spec.name
                ),
            ))
        })
        .collect()
}

/// True when the user actually asked for something: the value is defined,
/// not empty, and not one of the attribute's declared defaults.
fn is_expressed(value: &Value, spec: &AttributeSpec) -> bool {
    if !value.is_defined() {
        return false;
    }
    if matches!(canonical::canonicalize(value, spec), Ok(Some(CanonicalValue::Absent))) {
        return false;
    }
    !spec.all_defaults().any(|default| canonical::equal(value, default, spec))
}
