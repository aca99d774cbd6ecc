//! Plan fixtures for the builtin resources.

use converge_core::{ConfigurationObject, ObjectId, ReconcileOptions, Reconciler};
use converge_schema::{ProductVersion, SchemaRegistry, Value};

use crate::remote::InMemoryRemote;

/// Version most fixtures negotiate: new enough for every builtin attribute.
pub const CURRENT_VERSION: ProductVersion = ProductVersion::new(9, 3, 0, 0);

/// A reconciler over a clone of `remote`, using the builtin registry.
pub fn reconciler(remote: &InMemoryRemote) -> Reconciler<'static> {
    reconciler_with(remote, CURRENT_VERSION, ReconcileOptions::default())
}

pub fn reconciler_with(
    remote: &InMemoryRemote,
    version: ProductVersion,
    options: ReconcileOptions,
) -> Reconciler<'static> {
    Reconciler::new(Box::new(remote.clone()), SchemaRegistry::global(), version)
        .with_options(options)
}

/// `request_criteria` of type `simple` matching `operation_types`.
pub fn simple_criteria(key: &str, operation_types: &[&str]) -> ConfigurationObject {
    ConfigurationObject::new("request_criteria", ObjectId::new(key))
        .with_discriminant("simple")
        .with_attribute("operation_type", Value::set(operation_types.iter().copied()))
}

/// `request_criteria` of type `aggregate` requiring all of `criteria`.
pub fn aggregate_criteria(key: &str, criteria: &[&str]) -> ConfigurationObject {
    ConfigurationObject::new("request_criteria", ObjectId::new(key))
        .with_discriminant("aggregate")
        .with_attribute(
            "all_included_request_criteria",
            Value::set(criteria.iter().copied()),
        )
}

/// The `global_configuration` singleton with no attributes set.
pub fn global_configuration() -> ConfigurationObject {
    ConfigurationObject::new("global_configuration", ObjectId::singleton())
}

/// A `local_db_index` under `backend`.
pub fn db_index(backend: &str, attribute: &str, index_types: &[&str]) -> ConfigurationObject {
    ConfigurationObject::new("local_db_index", ObjectId::nested([backend], attribute))
        .with_attribute("index_type", Value::set(index_types.iter().copied()))
}
