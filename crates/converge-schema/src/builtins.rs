//! Built-in resource schemas
//!
//! These cover a sum-typed owned resource, an edit-only singleton and a
//! nested owned resource, which between them exercise every engine path.

use crate::attribute::{AttributeSpec, SemanticType};
use crate::resource::{Discriminant, ResourceSchema};
use crate::version::ProductVersion;

/// Number of built-in resource schemas.
pub const BUILTIN_COUNT: usize = 3;

const OPERATION_TYPES: &[&str] = &[
    "add", "bind", "compare", "delete", "extended", "modify", "modify-dn", "search",
];

const OPERATION_ORIGINS: &[&str] = &[
    "internal-operation",
    "replicated-operation",
    "external-operation",
];

const INDEX_TYPES: &[&str] = &["equality", "ordering", "presence", "substring", "approximate"];

/// All built-in schemas, in registration order.
pub fn builtin_resources() -> Vec<ResourceSchema> {
    vec![request_criteria(), global_configuration(), local_db_index()]
}

/// Sum-typed request criteria: four mutually exclusive shapes sharing one table.
fn request_criteria() -> ResourceSchema {
    const SIMPLE: &str = "simple";
    const ROOT_DSE: &str = "root-dse";
    const AGGREGATE: &str = "aggregate";
    const THIRD_PARTY: &str = "third-party";

    ResourceSchema::new("request_criteria")
        .describe("Criteria matching operation requests")
        .with_discriminant(Discriminant::new(
            "type",
            &[SIMPLE, ROOT_DSE, AGGREGATE, THIRD_PARTY],
        ))
        .attribute(AttributeSpec::new("description", SemanticType::String).empty_is_null())
        .attribute(
            AttributeSpec::new("operation_type", SemanticType::EnumSet)
                .with_values(OPERATION_TYPES)
                .for_variants(&[SIMPLE, ROOT_DSE]),
        )
        .attribute(
            AttributeSpec::new(
                "using_administrative_session_worker_thread",
                SemanticType::Enum,
            )
            .with_values(&["any", "true", "false"])
            .for_variants(&[SIMPLE, ROOT_DSE])
            .with_variant_default(SIMPLE, "any")
            .with_variant_default(ROOT_DSE, "any"),
        )
        .attribute(
            AttributeSpec::new("included_application_name", SemanticType::StringSet)
                .for_variants(&[SIMPLE, ROOT_DSE])
                .since(ProductVersion::new(9, 2, 0, 0)),
        )
        .attribute(
            AttributeSpec::new("operation_origin", SemanticType::EnumSet)
                .with_values(OPERATION_ORIGINS)
                .for_variants(&[SIMPLE]),
        )
        .attribute(
            AttributeSpec::new("connection_criteria", SemanticType::String)
                .for_variants(&[SIMPLE])
                .empty_is_null(),
        )
        .attribute(
            AttributeSpec::new("included_target_entry_dn", SemanticType::StringSet)
                .for_variants(&[SIMPLE]),
        )
        .attribute(
            AttributeSpec::new("all_included_request_criteria", SemanticType::StringSet)
                .for_variants(&[AGGREGATE]),
        )
        .attribute(
            AttributeSpec::new("any_included_request_criteria", SemanticType::StringSet)
                .for_variants(&[AGGREGATE]),
        )
        .attribute(
            AttributeSpec::new("not_all_included_request_criteria", SemanticType::StringSet)
                .for_variants(&[AGGREGATE]),
        )
        .attribute(
            AttributeSpec::new("none_included_request_criteria", SemanticType::StringSet)
                .for_variants(&[AGGREGATE]),
        )
        .attribute(
            AttributeSpec::new("extension_class", SemanticType::String)
                .for_variants(&[THIRD_PARTY])
                .required(),
        )
        .attribute(
            AttributeSpec::new("extension_argument", SemanticType::StringSet)
                .for_variants(&[THIRD_PARTY])
                .replace_only(),
        )
}

/// Server-wide settings. Always present remotely; only ever edited.
fn global_configuration() -> ResourceSchema {
    ResourceSchema::new("global_configuration")
        .describe("Server-wide configuration singleton")
        .edit_only_singleton()
        .attribute(AttributeSpec::new("location", SemanticType::String).empty_is_null())
        .attribute(AttributeSpec::new("size_limit", SemanticType::Int).with_default(1000_i64))
        .attribute(AttributeSpec::new("time_limit", SemanticType::Duration).with_default("60 s"))
        .attribute(AttributeSpec::new("idle_time_limit", SemanticType::Duration))
        .attribute(
            AttributeSpec::new("writability_mode", SemanticType::Enum)
                .with_values(&["enabled", "disabled", "internal-only"])
                .with_default("enabled"),
        )
        .attribute(AttributeSpec::new("check_schema", SemanticType::Bool).with_default(true))
        .attribute(AttributeSpec::new("disabled_privilege", SemanticType::StringSet))
        .attribute(
            AttributeSpec::new("tracked_application", SemanticType::StringSet)
                .since(ProductVersion::new(9, 3, 0, 0)),
        )
        .attribute(AttributeSpec::new("instance_name", SemanticType::String).computed())
}

/// An attribute index nested under a backend.
fn local_db_index() -> ResourceSchema {
    ResourceSchema::new("local_db_index")
        .describe("Attribute index of a local database backend")
        .with_parents(&["backend_name"])
        .attribute(
            AttributeSpec::new("index_type", SemanticType::EnumSet)
                .with_values(INDEX_TYPES)
                .required(),
        )
        .attribute(AttributeSpec::new("index_entry_limit", SemanticType::Int))
        .attribute(AttributeSpec::new("prime_index", SemanticType::Bool).with_default(false))
        .attribute(AttributeSpec::new("substring_length", SemanticType::Int))
        .attribute(AttributeSpec::new("equality_index_filter", SemanticType::StringSet))
        .attribute(
            AttributeSpec::new("cache_mode", SemanticType::Enum)
                .with_values(&["cache-keys-and-values", "cache-keys-only", "no-caching"])
                .immutable(),
        )
}
