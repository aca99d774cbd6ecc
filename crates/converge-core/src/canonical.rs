//! Attribute canonicalization
//!
//! Reduces raw [`Value`]s to the form used for equality comparison and for
//! building remote requests:
//!
//! - empty strings become [`CanonicalValue::Absent`] where the attribute is
//!   nullable-as-empty
//! - enum strings (and `ignore_case` strings) are lowercased
//! - durations are parsed and re-rendered (`5 seconds` -> `5 s`)
//! - sets become deduplicated, ordered collections; an empty set is absent

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use converge_schema::{AttributeMap, AttributeSpec, ResourceSchema, SemanticType, Value};
use serde::Serialize;
use tracing::warn;

use crate::duration;
use crate::error::ValidationError;

/// Canonical attribute values, keyed by attribute name.
pub type CanonicalMap = BTreeMap<String, CanonicalValue>;

/// A value in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CanonicalValue {
    Absent,
    Text(String),
    Bool(bool),
    Int(i64),
    Set(BTreeSet<String>),
}

impl CanonicalValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Members of a set value; scalars count as a one-element set.
    pub fn members(&self) -> BTreeSet<String> {
        match self {
            Self::Absent => BTreeSet::new(),
            Self::Set(items) => items.clone(),
            scalar => BTreeSet::from([scalar.to_string()]),
        }
    }

    /// Textual form sent in operations.
    pub fn render(&self) -> Vec<String> {
        match self {
            Self::Absent => Vec::new(),
            Self::Set(items) => items.iter().cloned().collect(),
            scalar => vec![scalar.to_string()],
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("(absent)"),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Set(items) => {
                let joined: Vec<&str> = items.iter().map(String::as_str).collect();
                write!(f, "[{}]", joined.join(", "))
            }
        }
    }
}

/// Canonicalize one raw value.
///
/// Returns `Ok(None)` for [`Value::Unknown`]: nothing can be said about a
/// value that is only known after apply.
pub fn canonicalize(
    value: &Value,
    spec: &AttributeSpec,
) -> Result<Option<CanonicalValue>, ValidationError> {
    let canonical = match value {
        Value::Unknown => return Ok(None),
        Value::Null => CanonicalValue::Absent,
        _ if spec.is_set() => canonical_set(value, spec)?,
        _ => canonical_scalar(value, spec)?,
    };
    Ok(Some(canonical))
}

fn canonical_scalar(value: &Value, spec: &AttributeSpec) -> Result<CanonicalValue, ValidationError> {
    let mismatch = || {
        ValidationError::invalid_value(
            &spec.name,
            format!("expected {:?}, got {}", spec.kind, value.type_name()),
        )
    };

    match spec.kind {
        SemanticType::String => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Int(i) => i.to_string(),
                _ => return Err(mismatch()),
            };
            if text.is_empty() && spec.empty_is_null {
                Ok(CanonicalValue::Absent)
            } else if spec.ignore_case {
                Ok(CanonicalValue::Text(text.to_lowercase()))
            } else {
                Ok(CanonicalValue::Text(text))
            }
        }
        SemanticType::Enum => match value {
            Value::String(s) if s.trim().is_empty() => Ok(CanonicalValue::Absent),
            Value::String(s) => Ok(CanonicalValue::Text(s.trim().to_lowercase())),
            Value::Bool(b) => Ok(CanonicalValue::Text(b.to_string())),
            _ => Err(mismatch()),
        },
        SemanticType::Bool => match value {
            Value::Bool(b) => Ok(CanonicalValue::Bool(*b)),
            Value::String(s) if s.is_empty() && spec.empty_is_null => Ok(CanonicalValue::Absent),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(CanonicalValue::Bool(true)),
                "false" => Ok(CanonicalValue::Bool(false)),
                _ => Err(ValidationError::invalid_value(
                    &spec.name,
                    format!("'{s}' is not a boolean"),
                )),
            },
            _ => Err(mismatch()),
        },
        SemanticType::Int => match value {
            Value::Int(i) => Ok(CanonicalValue::Int(*i)),
            Value::String(s) if s.is_empty() && spec.empty_is_null => Ok(CanonicalValue::Absent),
            Value::String(s) => s.trim().parse().map(CanonicalValue::Int).map_err(|_| {
                ValidationError::invalid_value(&spec.name, format!("'{s}' is not an integer"))
            }),
            _ => Err(mismatch()),
        },
        SemanticType::Duration => match value {
            Value::String(s) if s.is_empty() && spec.empty_is_null => Ok(CanonicalValue::Absent),
            Value::String(s) => duration::normalize(s)
                .map(CanonicalValue::Text)
                .map_err(|reason| ValidationError::invalid_value(&spec.name, reason)),
            _ => Err(mismatch()),
        },
        SemanticType::StringSet | SemanticType::EnumSet => Err(mismatch()),
    }
}

fn canonical_set(value: &Value, spec: &AttributeSpec) -> Result<CanonicalValue, ValidationError> {
    let fold = spec.kind == SemanticType::EnumSet || spec.ignore_case;
    let normalize = |item: &str| {
        if fold {
            item.trim().to_lowercase()
        } else {
            item.to_string()
        }
    };

    let members: BTreeSet<String> = match value {
        Value::Set(items) => items.iter().map(|item| normalize(item)).collect(),
        Value::String(s) if s.is_empty() => BTreeSet::new(),
        Value::String(s) => BTreeSet::from([normalize(s)]),
        other => {
            return Err(ValidationError::invalid_value(
                &spec.name,
                format!("expected a set of strings, got {}", other.type_name()),
            ));
        }
    };

    if members.is_empty() {
        Ok(CanonicalValue::Absent)
    } else {
        Ok(CanonicalValue::Set(members))
    }
}

/// Compare two raw values under `spec`.
///
/// Computed-only attributes always compare equal. Values that cannot be
/// canonicalized fall back to raw equality.
pub fn equal(a: &Value, b: &Value, spec: &AttributeSpec) -> bool {
    if spec.is_computed() {
        return true;
    }
    match (canonicalize(a, spec), canonicalize(b, spec)) {
        (Ok(left), Ok(right)) => left == right,
        _ => a == b,
    }
}

/// Canonicalize a plan's attributes.
///
/// Undefined and unknown values are skipped, as are names the schema does
/// not declare (the variant resolver reports those). Every type problem is
/// collected before returning.
pub fn canonicalize_plan(
    attributes: &AttributeMap,
    schema: &ResourceSchema,
) -> Result<CanonicalMap, Vec<ValidationError>> {
    let mut canonical = CanonicalMap::new();
    let mut errors = Vec::new();

    for (name, value) in attributes {
        if !value.is_defined() {
            continue;
        }
        let Some(spec) = schema.get(name) else {
            continue;
        };
        match canonicalize(value, spec) {
            Ok(Some(v)) => {
                canonical.insert(name.clone(), v);
            }
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(canonical)
    } else {
        Err(errors)
    }
}

/// Canonicalize attributes reported by the remote service.
///
/// The remote is the authority on its own values, so nothing here fails:
/// a value that does not fit its declared type is kept as text.
pub fn canonicalize_state(attributes: &AttributeMap, schema: &ResourceSchema) -> CanonicalMap {
    let mut canonical = CanonicalMap::new();

    for (name, value) in attributes {
        let Some(spec) = schema.get(name) else {
            continue;
        };
        match canonicalize(value, spec) {
            Ok(Some(CanonicalValue::Absent)) | Ok(None) => {}
            Ok(Some(v)) => {
                canonical.insert(name.clone(), v);
            }
            Err(e) => {
                warn!(resource = %schema.name, attribute = %name, "keeping remote value verbatim: {e}");
                let raw = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                canonical.insert(name.clone(), CanonicalValue::Text(raw));
            }
        }
    }

    canonical
}
