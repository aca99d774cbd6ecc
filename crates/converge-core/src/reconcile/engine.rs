//! Reconciler implementation
//!
//! The Reconciler drives one object at a time through the lifecycle:
//! pre-flight checks, remote calls, and the refresh read that makes the
//! remote's answer the new authoritative state.

use converge_schema::{ProductVersion, ResourceSchema, SchemaRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diff::Operation;
use crate::error::{Error, Result, ValidationError, ValidationKind};
use crate::import::{self, DEFAULT_DELIMITER};
use crate::object::{ConfigurationObject, ObjectId, PassState};
use crate::pipeline::{self, PreparedPlan, UpdatePlan};
use crate::remote::{RemoteFailure, RemoteService};
use crate::request;

use super::report::{LifecycleState, ReadOutcome, ReconcileReport};

/// Options for controller operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Re-diff after Add and apply whatever the Add endpoint ignored
    pub second_pass: bool,
    /// Compute and report everything, call nothing that mutates
    pub dry_run: bool,
    /// Separator between segments of an import identifier
    pub import_delimiter: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            second_pass: true,
            dry_run: false,
            import_delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

/// Reconciliation controller for objects managed against one remote service
///
/// Holds no per-object state: independent objects can be reconciled
/// concurrently by an outer orchestrator.
pub struct Reconciler<'r> {
    remote: Box<dyn RemoteService>,
    registry: &'r SchemaRegistry,
    /// Version negotiated with the remote service
    version: ProductVersion,
    options: ReconcileOptions,
}

impl<'r> Reconciler<'r> {
    pub fn new(
        remote: Box<dyn RemoteService>,
        registry: &'r SchemaRegistry,
        version: ProductVersion,
    ) -> Self {
        Self {
            remote,
            registry,
            version,
            options: ReconcileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    pub fn version(&self) -> &ProductVersion {
        &self.version
    }

    fn schema(&self, resource: &str) -> Result<&'r ResourceSchema> {
        Ok(self.registry.require(resource)?)
    }

    fn remote_error(
        operation: &'static str,
        schema: &ResourceSchema,
        id: &ObjectId,
        failure: RemoteFailure,
    ) -> Error {
        match failure {
            RemoteFailure::NotFound => Error::NotFound {
                resource: schema.name.clone(),
                id: id.to_string(),
                edit_only: schema.is_edit_only(),
            },
            other => Error::Remote {
                operation,
                resource: schema.name.clone(),
                id: id.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// GET that must succeed.
    fn fetch(&self, schema: &ResourceSchema, id: &ObjectId) -> Result<ConfigurationObject> {
        debug!(resource = %schema.name, %id, "reading");
        self.remote
            .get(&schema.name, id)
            .map(|object| object.into_object(&schema.name))
            .map_err(|e| Self::remote_error("read", schema, id, e))
    }

    /// Send one batched update and refresh.
    fn apply(
        &self,
        schema: &ResourceSchema,
        id: &ObjectId,
        operations: Vec<Operation>,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        report.transition(LifecycleState::Updating);
        report.action(format!(
            "update {} '{id}' with {} operation(s)",
            schema.name,
            operations.len()
        ));

        if !self.options.dry_run {
            info!(resource = %schema.name, %id, operations = operations.len(), "updating");
            self.remote
                .update(&schema.name, id, &operations)
                .map_err(|e| Self::remote_error("update", schema, id, e))?;
            report.object = Some(self.fetch(schema, id)?);
            report.transition(LifecycleState::Reconciled);
        }
        report.applied.extend(operations);
        Ok(())
    }

    /// Create `plan` on the remote service.
    ///
    /// Owned objects are added, read back and, when the Add endpoint ignored
    /// some attributes, brought in line by a second-pass update. Edit-only
    /// objects are adopted instead: read, diffed and updated if needed.
    pub fn create(&self, plan: &ConfigurationObject) -> Result<ReconcileReport> {
        let schema = self.schema(&plan.resource)?;
        let prepared = pipeline::prepare(plan, schema, &self.version)?;

        if schema.is_edit_only() {
            return self.adopt(plan, schema, &prepared);
        }

        let request = request::build_add_request(&plan.id, prepared.variant(), &prepared.canonical, schema)?;
        let mut report = ReconcileReport::starting_at(LifecycleState::Absent, self.options.dry_run);
        report.transition(LifecycleState::Creating);
        report.action(format!("add {} '{}'", schema.name, plan.id));
        if self.options.dry_run {
            return Ok(report);
        }

        info!(resource = %schema.name, id = %plan.id, attributes = request.attributes.len(), "adding");
        let created = self
            .remote
            .add(&schema.name, &request)
            .map_err(|e| Self::remote_error("add", schema, &plan.id, e))?;
        let id = created.id;
        let current = self.fetch(schema, &id)?;

        if self.options.second_pass {
            let residual = pipeline::operations_for(&prepared, &current, schema)?;
            if !residual.is_empty() {
                warn!(
                    resource = %schema.name,
                    %id,
                    operations = residual.len(),
                    "add left attributes unset; applying second pass"
                );
                report.object = Some(current);
                self.apply(schema, &id, residual, &mut report)?;
                return Ok(report);
            }
        }

        report.object = Some(current);
        report.transition(LifecycleState::Reconciled);
        Ok(report)
    }

    fn adopt(
        &self,
        plan: &ConfigurationObject,
        schema: &ResourceSchema,
        prepared: &PreparedPlan,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::starting_at(LifecycleState::Absent, self.options.dry_run);
        let current = self.fetch(schema, &plan.id)?;
        report.note(format!("Adopted {} '{}'", schema.name, plan.id));
        report.transition(LifecycleState::Reconciled);

        let operations = pipeline::operations_for(prepared, &current, schema)?;
        report.object = Some(current);
        if !operations.is_empty() {
            self.apply(schema, &plan.id, operations, &mut report)?;
        }
        Ok(report)
    }

    /// Read the current remote state of an object.
    ///
    /// A missing owned object yields [`ReadOutcome::Gone`]. A missing
    /// edit-only object is an error: it must always exist.
    pub fn read(&self, resource: &str, id: &ObjectId) -> Result<ReadOutcome> {
        let schema = self.schema(resource)?;
        match self.remote.get(&schema.name, id) {
            Ok(object) => Ok(ReadOutcome::Found(object.into_object(&schema.name))),
            Err(RemoteFailure::NotFound) if !schema.is_edit_only() => {
                warn!(resource = %schema.name, %id, "object no longer exists; dropping from state");
                Ok(ReadOutcome::Gone)
            }
            Err(e) => Err(Self::remote_error("read", schema, id, e)),
        }
    }

    /// Converge `prior` to `plan`.
    ///
    /// No remote call is made when nothing differs. Changes that cannot be
    /// made in place recreate owned objects and are rejected for edit-only
    /// ones.
    pub fn update(
        &self,
        plan: &ConfigurationObject,
        prior: &ConfigurationObject,
    ) -> Result<ReconcileReport> {
        let schema = self.schema(&plan.resource)?;
        let mut report =
            ReconcileReport::starting_at(LifecycleState::Reconciled, self.options.dry_run);

        match pipeline::plan_update(plan, prior, schema, &self.version)? {
            UpdatePlan::NoChanges => {
                debug!(resource = %schema.name, id = %prior.id, "no changes");
                report.object = Some(prior.clone());
                Ok(report)
            }
            UpdatePlan::InPlace(operations) => {
                report.object = Some(prior.clone());
                self.apply(schema, &prior.id, operations, &mut report)?;
                Ok(report)
            }
            UpdatePlan::Replace(reasons) if schema.is_edit_only() => {
                Err(Error::from(ValidationError::new(
                    &schema.name,
                    ValidationKind::Immutable,
                    format!(
                        "edit-only {} cannot be replaced: {}",
                        schema.name,
                        reasons.join("; ")
                    ),
                )))
            }
            UpdatePlan::Replace(reasons) => {
                info!(resource = %schema.name, id = %prior.id, ?reasons, "replacing");
                for reason in &reasons {
                    report.note(format!("Replacement required: {reason}"));
                }
                report.absorb(self.delete(prior)?);
                report.absorb(self.create(plan)?);
                Ok(report)
            }
        }
    }

    /// Delete an object.
    ///
    /// A 404 from the remote counts as already deleted. Edit-only objects are
    /// only released from local tracking.
    pub fn delete(&self, object: &ConfigurationObject) -> Result<ReconcileReport> {
        let schema = self.schema(&object.resource)?;
        let mut report =
            ReconcileReport::starting_at(LifecycleState::Reconciled, self.options.dry_run);

        if schema.is_edit_only() {
            report.note(format!(
                "Detached {} '{}'; remote object left in place",
                schema.name, object.id
            ));
            report.transition(LifecycleState::Detached);
            return Ok(report);
        }

        report.action(format!("delete {} '{}'", schema.name, object.id));
        if self.options.dry_run {
            return Ok(report);
        }

        info!(resource = %schema.name, id = %object.id, "deleting");
        match self.remote.delete(&schema.name, &object.id) {
            Ok(()) => {}
            Err(RemoteFailure::NotFound) => {
                debug!(resource = %schema.name, id = %object.id, "already deleted");
                report.note("Remote object was already gone");
            }
            Err(e) => return Err(Self::remote_error("delete", schema, &object.id, e)),
        }
        report.transition(LifecycleState::Deleted);
        report.transition(LifecycleState::Absent);
        Ok(report)
    }

    /// Parse an import identifier into a seed object ready for [`read`](Self::read).
    pub fn import(&self, resource: &str, raw_id: &str) -> Result<ConfigurationObject> {
        let schema = self.schema(resource)?;
        let id = import::parse_import_id(schema, raw_id, &self.options.import_delimiter)?;
        debug!(resource = %schema.name, %id, "imported");
        Ok(ConfigurationObject::new(&schema.name, id))
    }

    /// List remote objects under `parents`.
    pub fn list(
        &self,
        resource: &str,
        parents: &[String],
        filter: Option<&str>,
    ) -> Result<Vec<ConfigurationObject>> {
        let schema = self.schema(resource)?;
        let scope = ObjectId::nested(parents.iter().cloned(), "");
        let objects = self
            .remote
            .list(&schema.name, parents, filter)
            .map_err(|e| Self::remote_error("list", schema, &scope, e))?;
        Ok(objects
            .into_iter()
            .map(|object| object.into_object(&schema.name))
            .collect())
    }

    /// Run a full reconciliation pass for one object.
    ///
    /// Without prior state the object is created (or adopted). Otherwise the
    /// remote is read first; an owned object that disappeared is recreated,
    /// and the fresh state is then updated toward the plan.
    pub fn reconcile(&self, pass: &PassState) -> Result<ReconcileReport> {
        let Some(prior) = &pass.prior else {
            return self.create(&pass.plan);
        };

        match self.read(&prior.resource, &prior.id)? {
            ReadOutcome::Found(current) => self.update(&pass.plan, &current),
            ReadOutcome::Gone => {
                let mut report =
                    ReconcileReport::starting_at(LifecycleState::Absent, self.options.dry_run);
                report.note(format!(
                    "{} '{}' disappeared from the remote service",
                    prior.resource, prior.id
                ));
                report.absorb(self.create(&pass.plan)?);
                Ok(report)
            }
        }
    }
}
