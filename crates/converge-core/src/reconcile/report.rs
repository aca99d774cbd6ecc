//! Reconciliation report types

use serde::{Deserialize, Serialize};

use crate::diff::Operation;
use crate::object::ConfigurationObject;

/// Where an object is in its lifecycle.
///
/// `Absent -> Creating -> Reconciled -> Updating -> Reconciled`, ending in
/// `Deleted` for owned objects or `Detached` for edit-only ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    /// Not present on the remote service
    Absent,
    /// Add issued (or pending, in a dry run)
    Creating,
    /// Remote state matches the plan
    Reconciled,
    /// Update issued (or pending, in a dry run)
    Updating,
    /// Edit-only object released from local tracking; still exists remotely
    Detached,
    /// Owned object removed from the remote service
    Deleted,
}

/// Outcome of a [`Reconciler::read`](super::Reconciler::read).
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Found(ConfigurationObject),
    /// Owned object no longer exists; the caller should stop tracking it
    Gone,
}

/// Report from a controller operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Final state
    pub state: LifecycleState,
    /// Every state passed through, starting state first
    pub transitions: Vec<LifecycleState>,
    /// Authoritative remote view after the operation, when there is one
    pub object: Option<ConfigurationObject>,
    /// Operations sent in update requests (or that would be, in a dry run)
    pub applied: Vec<Operation>,
    /// Actions taken, in order. Dry-run entries start with "[dry-run]".
    pub actions: Vec<String>,
    pub dry_run: bool,
}

impl ReconcileReport {
    pub fn starting_at(state: LifecycleState, dry_run: bool) -> Self {
        Self {
            state,
            transitions: vec![state],
            object: None,
            applied: Vec::new(),
            actions: Vec::new(),
            dry_run,
        }
    }

    /// Move to `state`, recording the transition.
    pub fn transition(&mut self, state: LifecycleState) {
        if self.state != state {
            self.transitions.push(state);
        }
        self.state = state;
    }

    /// Record an action, prefixed when nothing is actually being done.
    pub fn action(&mut self, description: impl AsRef<str>) {
        let description = description.as_ref();
        if self.dry_run {
            self.actions.push(format!("[dry-run] Would {description}"));
        } else {
            self.actions.push(capitalize(description));
        }
    }

    /// Record an observation that is not a remote mutation.
    pub fn note(&mut self, message: impl Into<String>) {
        self.actions.push(message.into());
    }

    /// Append the history of a follow-up operation.
    pub fn absorb(&mut self, other: ReconcileReport) {
        for state in other.transitions {
            self.transition(state);
        }
        self.object = other.object;
        self.applied.extend(other.applied);
        self.actions.extend(other.actions);
    }

    /// True when the operation changed (or would change) the remote service.
    pub fn has_changes(&self) -> bool {
        !self.applied.is_empty()
            || self
                .transitions
                .iter()
                .any(|s| matches!(s, LifecycleState::Creating | LifecycleState::Deleted))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
