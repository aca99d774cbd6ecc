//! The pre-flight pipeline shared by every controller operation.
//!
//! Version gate, variant resolution and canonicalization run here, before
//! anything touches the remote service. Problems from every stage are
//! collected into one [`Error::Validation`].

use converge_schema::{ProductVersion, ResourceSchema};
use serde::Serialize;
use tracing::debug;

use crate::canonical::{self, CanonicalMap};
use crate::diff::{self, Operation};
use crate::error::{Error, Result};
use crate::gate;
use crate::object::ConfigurationObject;
use crate::request;
use crate::variant::{self, ResolvedObject};

/// A plan that passed every pre-flight check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedPlan {
    pub resolved: ResolvedObject,
    pub canonical: CanonicalMap,
}

impl PreparedPlan {
    pub fn variant(&self) -> Option<&str> {
        self.resolved.variant_name()
    }
}

/// What an update of an existing object needs to do.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "details", rename_all = "kebab-case")]
pub enum UpdatePlan {
    /// Plan and state already agree
    NoChanges,
    /// One batched update carrying these operations
    InPlace(Vec<Operation>),
    /// The object must be destroyed and recreated, for these reasons
    Replace(Vec<String>),
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoChanges)
    }
}

/// Gate, resolve and canonicalize `plan`.
pub fn prepare(
    plan: &ConfigurationObject,
    schema: &ResourceSchema,
    version: &ProductVersion,
) -> Result<PreparedPlan> {
    let mut errors = gate::check_supported(&plan.attributes, version, schema);

    let (resolved, resolve_errors) =
        variant::resolve(plan.discriminant.as_deref(), &plan.attributes, schema);
    errors.extend(resolve_errors);

    if !errors.is_empty() {
        debug!(resource = %schema.name, id = %plan.id, count = errors.len(), "plan rejected");
        return Err(Error::Validation(errors));
    }

    let canonical = canonical::canonicalize_plan(&resolved.to_attribute_map(), schema)
        .map_err(Error::Validation)?;

    debug!(
        resource = %schema.name,
        id = %plan.id,
        variant = resolved.variant_name().unwrap_or("-"),
        attributes = canonical.len(),
        "plan prepared"
    );
    Ok(PreparedPlan {
        resolved,
        canonical,
    })
}

/// Operations converging `state` to an already prepared plan, in remote form.
pub fn operations_for(
    prepared: &PreparedPlan,
    state: &ConfigurationObject,
    schema: &ResourceSchema,
) -> Result<Vec<Operation>> {
    let state = canonical::canonicalize_state(&state.attributes, schema);
    let operations = diff::diff(&prepared.canonical, &state, schema, prepared.variant());
    request::check_operations(&operations, schema)
}

/// Decide how to move `prior` to `plan`.
pub fn plan_update(
    plan: &ConfigurationObject,
    prior: &ConfigurationObject,
    schema: &ResourceSchema,
    version: &ProductVersion,
) -> Result<UpdatePlan> {
    let prepared = prepare(plan, schema, version)?;

    let reasons = diff::replacement_reasons(plan, prepared.variant(), prior, schema);
    if !reasons.is_empty() {
        // The recreate must be able to succeed before anything is deleted.
        if !schema.is_edit_only() {
            request::build_add_request(&plan.id, prepared.variant(), &prepared.canonical, schema)?;
        }
        return Ok(UpdatePlan::Replace(reasons));
    }

    let operations = operations_for(&prepared, prior, schema)?;
    if operations.is_empty() {
        Ok(UpdatePlan::NoChanges)
    } else {
        Ok(UpdatePlan::InPlace(operations))
    }
}
