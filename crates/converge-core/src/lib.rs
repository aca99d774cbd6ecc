//! Registry-driven configuration reconciliation engine
//!
//! Given the desired configuration of a remotely managed object and its last
//! observed state, the engine computes and applies the minimal ordered set of
//! operations that converges one to the other.
//!
//! # Architecture
//!
//! Every object passes through the same strict pipeline:
//!
//! ```text
//!  plan + prior state
//!        |
//!   version gate  ->  variant resolver  ->  canonicalizer
//!        |                                        |
//!        +------------- pre-flight ---------------+
//!                           |
//!                      diff engine
//!                           |
//!                      reconciler  ->  RemoteService  ->  refresh read
//! ```
//!
//! - **canonical**: empty-equals-absent, case-folded enums, normalized
//!   durations, order-free sets
//! - **gate**: rejects attributes newer than the negotiated remote version
//! - **variant**: resolves sum-typed objects to one shape
//! - **diff**: pure, deterministic operation lists
//! - **reconcile**: Create/Read/Update/Delete/Import over a [`RemoteService`]
//!
//! Nothing here is specific to one resource type: behaviour comes from the
//! [`converge_schema::SchemaRegistry`].
//!
//! # Example
//!
//! ```
//! use converge_core::{ConfigurationObject, ObjectId, pipeline};
//! use converge_schema::{ProductVersion, SchemaRegistry, Value};
//!
//! let schema = SchemaRegistry::global().require("request_criteria").unwrap();
//! let plan = ConfigurationObject::new("request_criteria", ObjectId::new("writes"))
//!     .with_discriminant("simple")
//!     .with_attribute("operation_type", Value::set(["add", "delete"]));
//!
//! let prepared = pipeline::prepare(&plan, schema, &ProductVersion::new(9, 2, 0, 0)).unwrap();
//! assert_eq!(prepared.variant(), Some("simple"));
//! ```

pub mod canonical;
pub mod config;
pub mod diff;
pub mod duration;
pub mod error;
pub mod gate;
pub mod import;
pub mod logging;
pub mod object;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod request;
pub mod resources;
pub mod variant;

pub use canonical::{CanonicalMap, CanonicalValue};
pub use config::EngineConfig;
pub use diff::{Operation, OperationKind};
pub use error::{Error, Result, ValidationError, ValidationKind};
pub use object::{ConfigurationObject, ObjectId, PassState};
pub use pipeline::{PreparedPlan, UpdatePlan};
pub use reconcile::{LifecycleState, ReadOutcome, ReconcileOptions, ReconcileReport, Reconciler};
pub use remote::{AddRequest, RemoteFailure, RemoteObject, RemoteService};
pub use resources::RequestCriteria;
pub use variant::{ResolvedObject, Variant};
