//! Typed view of the builtin `request_criteria` resource.
//!
//! The remote stores every criteria shape in one table with one nullable
//! column per attribute. Here each shape carries only its own fields, so a
//! simple criteria holding aggregate references cannot be expressed.

use std::collections::BTreeSet;

use converge_schema::Value;
use serde::Serialize;

use crate::error::{Error, Result, ValidationError, ValidationKind};
use crate::variant::ResolvedObject;

/// Resource name in the schema registry.
pub const RESOURCE: &str = "request_criteria";

/// Which administrative-session requests match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerThreadMatch {
    #[default]
    Any,
    True,
    False,
}

impl WorkerThreadMatch {
    fn parse(value: Option<&Value>) -> Result<Self> {
        let text = match value {
            None | Some(Value::Null | Value::Unknown) => return Ok(Self::Any),
            Some(Value::Bool(true)) => return Ok(Self::True),
            Some(Value::Bool(false)) => return Ok(Self::False),
            Some(Value::String(text)) => text.trim().to_ascii_lowercase(),
            Some(other) => {
                return Err(ValidationError::invalid_value(
                    "using_administrative_session_worker_thread",
                    format!("expected any, true or false, got {other}"),
                )
                .into());
            }
        };
        match text.as_str() {
            "any" | "" => Ok(Self::Any),
            "true" => Ok(Self::True),
            "false" => Ok(Self::False),
            other => Err(ValidationError::invalid_value(
                "using_administrative_session_worker_thread",
                format!("\"{other}\" is not one of any, true, false"),
            )
            .into()),
        }
    }
}

/// Variant-specific criteria fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CriteriaKind {
    Simple {
        operation_types: BTreeSet<String>,
        worker_thread: WorkerThreadMatch,
        application_names: BTreeSet<String>,
        operation_origins: BTreeSet<String>,
        connection_criteria: Option<String>,
        target_entry_dns: BTreeSet<String>,
    },
    RootDse {
        operation_types: BTreeSet<String>,
        worker_thread: WorkerThreadMatch,
        application_names: BTreeSet<String>,
    },
    Aggregate {
        all_included: BTreeSet<String>,
        any_included: BTreeSet<String>,
        not_all_included: BTreeSet<String>,
        none_included: BTreeSet<String>,
    },
    ThirdParty {
        extension_class: String,
        arguments: BTreeSet<String>,
    },
}

impl CriteriaKind {
    /// Discriminant value as declared in the schema.
    pub fn variant(&self) -> &'static str {
        match self {
            Self::Simple { .. } => "simple",
            Self::RootDse { .. } => "root-dse",
            Self::Aggregate { .. } => "aggregate",
            Self::ThirdParty { .. } => "third-party",
        }
    }

    /// Other criteria referenced by an aggregate; empty for other shapes.
    pub fn references(&self) -> BTreeSet<&str> {
        match self {
            Self::Aggregate {
                all_included,
                any_included,
                not_all_included,
                none_included,
            } => all_included
                .iter()
                .chain(any_included)
                .chain(not_all_included)
                .chain(none_included)
                .map(String::as_str)
                .collect(),
            _ => BTreeSet::new(),
        }
    }
}

/// A request criteria: shared base attributes plus one variant payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestCriteria {
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: CriteriaKind,
}

fn text(object: &ResolvedObject, name: &str) -> Option<String> {
    object
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn set(object: &ResolvedObject, name: &str) -> BTreeSet<String> {
    match object.get(name) {
        Some(Value::Set(items)) => items.iter().cloned().collect(),
        Some(Value::String(s)) if !s.is_empty() => BTreeSet::from([s.clone()]),
        _ => BTreeSet::new(),
    }
}

fn folded_set(object: &ResolvedObject, name: &str) -> BTreeSet<String> {
    set(object, name).iter().map(|s| s.to_lowercase()).collect()
}

impl TryFrom<&ResolvedObject> for RequestCriteria {
    type Error = Error;

    fn try_from(object: &ResolvedObject) -> Result<Self> {
        if object.resource != RESOURCE {
            return Err(Error::Conflict {
                attribute: "resource".to_string(),
                message: format!("expected {RESOURCE}, got {}", object.resource),
            });
        }

        let kind = match object.variant_name() {
            Some("simple") => CriteriaKind::Simple {
                operation_types: folded_set(object, "operation_type"),
                worker_thread: WorkerThreadMatch::parse(
                    object.get("using_administrative_session_worker_thread"),
                )?,
                application_names: set(object, "included_application_name"),
                operation_origins: folded_set(object, "operation_origin"),
                connection_criteria: text(object, "connection_criteria"),
                target_entry_dns: set(object, "included_target_entry_dn"),
            },
            Some("root-dse") => CriteriaKind::RootDse {
                operation_types: folded_set(object, "operation_type"),
                worker_thread: WorkerThreadMatch::parse(
                    object.get("using_administrative_session_worker_thread"),
                )?,
                application_names: set(object, "included_application_name"),
            },
            Some("aggregate") => CriteriaKind::Aggregate {
                all_included: set(object, "all_included_request_criteria"),
                any_included: set(object, "any_included_request_criteria"),
                not_all_included: set(object, "not_all_included_request_criteria"),
                none_included: set(object, "none_included_request_criteria"),
            },
            Some("third-party") => CriteriaKind::ThirdParty {
                extension_class: text(object, "extension_class").ok_or_else(|| {
                    ValidationError::new(
                        "extension_class",
                        ValidationKind::Required,
                        "attribute extension_class is required when type = third-party",
                    )
                })?,
                arguments: set(object, "extension_argument"),
            },
            other => {
                return Err(ValidationError::new(
                    "type",
                    ValidationKind::UnknownVariant,
                    format!("request criteria variant {other:?} is not supported"),
                )
                .into());
            }
        };

        Ok(Self {
            description: text(object, "description"),
            kind,
        })
    }
}
