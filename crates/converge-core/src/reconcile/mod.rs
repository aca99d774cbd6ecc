//! Reconciliation controller
//!
//! This module provides:
//! - **engine**: the [`Reconciler`], driving Create/Read/Update/Delete/Import
//!   against a [`RemoteService`](crate::remote::RemoteService)
//! - **report**: lifecycle states and the per-operation [`ReconcileReport`]

mod engine;
mod report;

pub use engine::{ReconcileOptions, Reconciler};
pub use report::{LifecycleState, ReadOutcome, ReconcileReport};
