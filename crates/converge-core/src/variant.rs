//! Variant resolution for sum-typed resources
//!
//! A resource with a discriminant is a tagged union: one shared base
//! attribute set plus a payload that depends on the selected variant.
//! [`resolve`] picks the variant, rejects attributes that belong to other
//! variants, injects defaults for anything the user left undefined and nulls
//! everything the variant does not own.

use std::collections::BTreeSet;

use converge_schema::{AttributeMap, ResourceSchema, Value};
use serde::Serialize;

use crate::error::{ValidationError, ValidationKind};

/// Variant-specific part of a resolved object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub name: String,
    pub payload: AttributeMap,
}

/// A raw configuration resolved against its schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResolvedObject {
    pub resource: String,
    /// Attributes shared by every variant
    pub base: AttributeMap,
    /// Present only for sum-typed resources
    pub variant: Option<Variant>,
    /// Attributes not applicable to the selected variant
    pub nulled: BTreeSet<String>,
}

impl ResolvedObject {
    fn empty(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            ..Self::default()
        }
    }

    pub fn variant_name(&self) -> Option<&str> {
        self.variant.as_ref().map(|v| v.name.as_str())
    }

    /// Look up a resolved attribute in the base or the variant payload.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.base
            .get(name)
            .or_else(|| self.variant.as_ref().and_then(|v| v.payload.get(name)))
    }

    /// Flatten back into one attribute map; nulled attributes map to `Null`.
    pub fn to_attribute_map(&self) -> AttributeMap {
        let mut attributes = self.base.clone();
        if let Some(variant) = &self.variant {
            attributes.extend(variant.payload.clone());
        }
        for name in &self.nulled {
            attributes.insert(name.clone(), Value::Null);
        }
        attributes
    }
}

/// Select the variant named by `discriminant` (falling back to the value of
/// the discriminant attribute in `raw`, then to the schema default).
fn select_variant<'s>(
    discriminant: Option<&str>,
    raw: &AttributeMap,
    schema: &'s ResourceSchema,
) -> Result<Option<&'s str>, ValidationError> {
    let Some(decl) = &schema.discriminant else {
        return match discriminant {
            None => Ok(None),
            Some(value) => Err(ValidationError::new(
                "discriminant",
                ValidationKind::UnknownVariant,
                format!(
                    "resource {} has no variants; remove discriminant \"{value}\"",
                    schema.name
                ),
            )),
        };
    };

    let from_attribute = raw.get(&decl.attribute).and_then(Value::as_str);
    if let (Some(field), Some(attribute)) = (discriminant, from_attribute)
        && fold(field) != fold(attribute)
    {
        return Err(ValidationError::new(
            &decl.attribute,
            ValidationKind::UnknownVariant,
            format!(
                "discriminant \"{field}\" disagrees with {} = \"{attribute}\"",
                decl.attribute
            ),
        ));
    }

    match discriminant.or(from_attribute) {
        Some(value) => decl.find(value).map(Some).ok_or_else(|| {
            ValidationError::unknown_variant(&decl.attribute, Some(value), &decl.variants)
        }),
        None => match decl.default.as_deref() {
            Some(default) => Ok(decl.find(default)),
            None => Err(ValidationError::unknown_variant(
                &decl.attribute,
                None,
                &decl.variants,
            )),
        },
    }
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// The variant an object names itself, through its discriminant field or
/// the discriminant attribute, without falling back to the schema default.
///
/// Names the schema does not declare are returned folded to lowercase.
pub fn stated_variant(
    discriminant: Option<&str>,
    raw: &AttributeMap,
    schema: &ResourceSchema,
) -> Option<String> {
    let decl = schema.discriminant.as_ref()?;
    let value = discriminant.or_else(|| raw.get(&decl.attribute).and_then(Value::as_str))?;
    Some(decl.find(value).map(str::to_string).unwrap_or_else(|| fold(value)))
}

/// Resolve `raw` to one variant of `schema`.
///
/// Defaults are taken from the raw input only: an attribute the user set to
/// an explicit empty value keeps it. Every error is collected; the returned
/// object is only meaningful when the error list is empty.
pub fn resolve(
    discriminant: Option<&str>,
    raw: &AttributeMap,
    schema: &ResourceSchema,
) -> (ResolvedObject, Vec<ValidationError>) {
    let variant = match select_variant(discriminant, raw, schema) {
        Ok(variant) => variant,
        Err(e) => return (ResolvedObject::empty(&schema.name), vec![e]),
    };
    let discriminant_attr = schema.discriminant.as_ref().map(|d| d.attribute.as_str());
    let mut errors = Vec::new();

    for (name, value) in raw {
        if Some(name.as_str()) == discriminant_attr {
            continue;
        }
        let Some(spec) = schema.get(name) else {
            errors.push(ValidationError::new(
                name,
                ValidationKind::UnknownAttribute,
                format!("attribute {name} is not declared by resource {}", schema.name),
            ));
            continue;
        };
        if value.is_null() {
            continue;
        }
        if spec.is_computed() {
            errors.push(ValidationError::new(
                name,
                ValidationKind::Computed,
                format!("attribute {name} is computed by the remote service and cannot be set"),
            ));
        } else if !spec.applies_to(variant) {
            errors.push(ValidationError::not_applicable(
                name,
                discriminant_attr.unwrap_or("type"),
                &spec.variants,
            ));
        }
    }

    let mut resolved = ResolvedObject::empty(&schema.name);
    let mut payload = AttributeMap::new();

    for spec in schema.applicable(variant) {
        if spec.is_computed() {
            continue;
        }
        let value = match raw.get(&spec.name) {
            Some(value) if !value.is_null() => Some(value.clone()),
            _ => spec.default_for(variant).cloned(),
        };
        let Some(value) = value else {
            if spec.is_required() {
                let message = match variant {
                    Some(v) => format!(
                        "attribute {} is required when {} = {v}",
                        spec.name,
                        discriminant_attr.unwrap_or("type")
                    ),
                    None => format!("attribute {} is required", spec.name),
                };
                errors.push(ValidationError::new(&spec.name, ValidationKind::Required, message));
            }
            continue;
        };

        if spec.variants.is_empty() {
            resolved.base.insert(spec.name.clone(), value);
        } else {
            payload.insert(spec.name.clone(), value);
        }
    }

    if let Some(name) = variant {
        resolved.variant = Some(Variant {
            name: name.to_string(),
            payload,
        });
        resolved.nulled = schema
            .attributes
            .iter()
            .filter(|spec| !spec.applies_to(Some(name)))
            .map(|spec| spec.name.clone())
            .collect();
    } else {
        resolved.base.extend(payload);
    }

    (resolved, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge_schema::SchemaRegistry;
    use pretty_assertions::assert_eq;

    fn criteria() -> &'static ResourceSchema {
        SchemaRegistry::global().require("request_criteria").unwrap()
    }

    fn attrs<const N: usize>(pairs: [(&str, Value); N]) -> AttributeMap {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_discriminant_is_case_insensitive() {
        let (resolved, errors) = resolve(Some("Simple"), &AttributeMap::new(), criteria());
        assert!(errors.is_empty());
        assert_eq!(resolved.variant_name(), Some("simple"));
    }

    #[test]
    fn test_unknown_variant_lists_allowed() {
        let (_, errors) = resolve(Some("complex"), &AttributeMap::new(), criteria());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationKind::UnknownVariant);
        assert!(errors[0].message.contains("simple, root-dse, aggregate, third-party"));
    }

    #[test]
    fn test_missing_discriminant_without_default() {
        let (_, errors) = resolve(None, &AttributeMap::new(), criteria());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("is required"));
    }

    #[test]
    fn test_discriminant_from_raw_attribute() {
        let raw = attrs([("type", Value::from("aggregate"))]);
        let (resolved, errors) = resolve(None, &raw, criteria());
        assert!(errors.is_empty());
        assert_eq!(resolved.variant_name(), Some("aggregate"));
        assert!(resolved.get("type").is_none());
    }

    #[test]
    fn test_discriminant_disagreeing_with_attribute() {
        let raw = attrs([("type", Value::from("aggregate"))]);
        let (_, errors) = resolve(Some("simple"), &raw, criteria());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationKind::UnknownVariant);
        assert_eq!(
            errors[0].message,
            "discriminant \"simple\" disagrees with type = \"aggregate\""
        );

        let (resolved, errors) = resolve(Some("Aggregate"), &raw, criteria());
        assert!(errors.is_empty());
        assert_eq!(resolved.variant_name(), Some("aggregate"));
    }

    #[test]
    fn test_stated_variant() {
        let raw = attrs([("type", Value::from("Root-DSE"))]);
        assert_eq!(stated_variant(None, &raw, criteria()), Some("root-dse".to_string()));
        assert_eq!(
            stated_variant(Some("aggregate"), &AttributeMap::new(), criteria()),
            Some("aggregate".to_string())
        );
        assert_eq!(stated_variant(None, &AttributeMap::new(), criteria()), None);

        let plain = SchemaRegistry::global().require("local_db_index").unwrap();
        assert_eq!(stated_variant(None, &raw, plain), None);
    }

    #[test]
    fn test_cross_variant_attribute_rejected() {
        let raw = attrs([(
            "all_included_request_criteria",
            Value::set(["c1"]),
        )]);
        let (_, errors) = resolve(Some("simple"), &raw, criteria());
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "attribute all_included_request_criteria only valid when type ∈ {aggregate}"
        );
    }

    #[test]
    fn test_null_cross_variant_attribute_is_fine() {
        let raw = attrs([("all_included_request_criteria", Value::Null)]);
        let (_, errors) = resolve(Some("simple"), &raw, criteria());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_variant_default_injected_only_when_undefined() {
        let (resolved, _) = resolve(Some("simple"), &AttributeMap::new(), criteria());
        assert_eq!(
            resolved.get("using_administrative_session_worker_thread"),
            Some(&Value::from("any"))
        );

        let explicit = attrs([("using_administrative_session_worker_thread", Value::from(""))]);
        let (resolved, _) = resolve(Some("simple"), &explicit, criteria());
        assert_eq!(
            resolved.get("using_administrative_session_worker_thread"),
            Some(&Value::from(""))
        );
    }

    #[test]
    fn test_base_and_payload_split() {
        let raw = attrs([
            ("description", Value::from("audit")),
            ("operation_type", Value::set(["add"])),
        ]);
        let (resolved, errors) = resolve(Some("simple"), &raw, criteria());
        assert!(errors.is_empty());
        assert!(resolved.base.contains_key("description"));
        let payload = &resolved.variant.as_ref().unwrap().payload;
        assert!(payload.contains_key("operation_type"));
        assert!(!payload.contains_key("description"));
    }

    #[test]
    fn test_required_attribute_for_variant() {
        let (_, errors) = resolve(Some("third-party"), &AttributeMap::new(), criteria());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationKind::Required);
        assert_eq!(
            errors[0].message,
            "attribute extension_class is required when type = third-party"
        );
    }

    #[test]
    fn test_unknown_and_computed_attributes() {
        let schema = SchemaRegistry::global().require("global_configuration").unwrap();
        let raw = attrs([
            ("instance_name", Value::from("ds1")),
            ("colour", Value::from("blue")),
        ]);
        let (_, errors) = resolve(None, &raw, schema);
        let kinds: Vec<ValidationKind> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ValidationKind::UnknownAttribute, ValidationKind::Computed]);
    }

    #[test]
    fn test_discriminant_on_plain_resource_rejected() {
        let schema = SchemaRegistry::global().require("global_configuration").unwrap();
        let (_, errors) = resolve(Some("simple"), &AttributeMap::new(), schema);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationKind::UnknownVariant);
    }

    #[test]
    fn test_plain_resource_has_no_variant() {
        let schema = SchemaRegistry::global().require("global_configuration").unwrap();
        let (resolved, errors) = resolve(None, &AttributeMap::new(), schema);
        assert!(errors.is_empty());
        assert!(resolved.variant.is_none());
        assert!(resolved.nulled.is_empty());
        assert_eq!(resolved.get("size_limit"), Some(&Value::Int(1000)));
    }
}
