//! [`InMemoryRemote`]: a fake remote configuration service.
//!
//! Objects live in a shared map, so a clone handed to a
//! [`Reconciler`](converge_core::Reconciler) and the clone kept by the test
//! observe the same state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use converge_core::diff::apply_operations;
use converge_core::{AddRequest, ObjectId, Operation, RemoteFailure, RemoteObject, RemoteService};
use converge_schema::AttributeMap;
use tracing::debug;

/// Kind of remote call, used to target failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Get,
    Add,
    Update,
    Delete,
    List,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Get { resource: String, id: ObjectId },
    Add { resource: String, request: AddRequest },
    Update { resource: String, id: ObjectId, operations: Vec<Operation> },
    Delete { resource: String, id: ObjectId },
    List { resource: String, parents: Vec<String> },
}

impl RemoteCall {
    pub fn kind(&self) -> CallKind {
        match self {
            Self::Get { .. } => CallKind::Get,
            Self::Add { .. } => CallKind::Add,
            Self::Update { .. } => CallKind::Update,
            Self::Delete { .. } => CallKind::Delete,
            Self::List { .. } => CallKind::List,
        }
    }

    /// True for Add, Update and Delete.
    pub fn is_mutation(&self) -> bool {
        !matches!(self.kind(), CallKind::Get | CallKind::List)
    }
}

type Key = (String, ObjectId);

#[derive(Default)]
struct Inner {
    objects: BTreeMap<Key, RemoteObject>,
    calls: Vec<RemoteCall>,
    ignored_on_add: BTreeSet<String>,
    failures: Vec<(CallKind, RemoteFailure)>,
}

impl Inner {
    fn take_failure(&mut self, kind: CallKind) -> Result<(), RemoteFailure> {
        match self.failures.iter().position(|(k, _)| *k == kind) {
            Some(index) => Err(self.failures.remove(index).1),
            None => Ok(()),
        }
    }
}

/// In-memory stand-in for the remote service.
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("InMemoryRemote: state poisoned")
    }

    /// Put an object on the remote without recording a call.
    pub fn seed(&self, resource: &str, id: ObjectId, attributes: AttributeMap) {
        self.seed_object(
            resource,
            RemoteObject {
                id,
                discriminant: None,
                attributes,
            },
        );
    }

    pub fn seed_object(&self, resource: &str, object: RemoteObject) {
        self.lock()
            .objects
            .insert((resource.to_string(), object.id.clone()), object);
    }

    /// Remove an object behind the controller's back.
    pub fn forget(&self, resource: &str, id: &ObjectId) {
        self.lock().objects.remove(&(resource.to_string(), id.clone()));
    }

    /// Current remote copy of an object.
    pub fn object(&self, resource: &str, id: &ObjectId) -> Option<RemoteObject> {
        self.lock()
            .objects
            .get(&(resource.to_string(), id.clone()))
            .cloned()
    }

    /// Make Add silently drop `attribute`, like endpoints that only accept a
    /// subset of fields on creation.
    pub fn ignore_on_add(&self, attribute: &str) {
        self.lock().ignored_on_add.insert(attribute.to_string());
    }

    /// Fail the next call of `kind` with `failure`.
    pub fn fail_next(&self, kind: CallKind, failure: RemoteFailure) {
        self.lock().failures.push((kind, failure));
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<RemoteCall> {
        self.calls().into_iter().filter(RemoteCall::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

impl RemoteService for InMemoryRemote {
    fn get(&self, resource: &str, id: &ObjectId) -> Result<RemoteObject, RemoteFailure> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Get {
            resource: resource.to_string(),
            id: id.clone(),
        });
        inner.take_failure(CallKind::Get)?;
        inner
            .objects
            .get(&(resource.to_string(), id.clone()))
            .cloned()
            .ok_or(RemoteFailure::NotFound)
    }

    fn add(&self, resource: &str, request: &AddRequest) -> Result<RemoteObject, RemoteFailure> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Add {
            resource: resource.to_string(),
            request: request.clone(),
        });
        inner.take_failure(CallKind::Add)?;

        let key = (resource.to_string(), request.id.clone());
        if inner.objects.contains_key(&key) {
            return Err(RemoteFailure::Status {
                code: 409,
                message: format!("{resource} '{}' already exists", request.id),
            });
        }

        let attributes = request
            .attributes
            .iter()
            .filter(|(name, _)| !inner.ignored_on_add.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let object = RemoteObject {
            id: request.id.clone(),
            discriminant: request.discriminant.clone(),
            attributes,
        };
        debug!(resource, id = %request.id, "fake remote: added");
        inner.objects.insert(key, object.clone());
        Ok(object)
    }

    fn update(
        &self,
        resource: &str,
        id: &ObjectId,
        operations: &[Operation],
    ) -> Result<RemoteObject, RemoteFailure> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Update {
            resource: resource.to_string(),
            id: id.clone(),
            operations: operations.to_vec(),
        });
        inner.take_failure(CallKind::Update)?;

        let object = inner
            .objects
            .get_mut(&(resource.to_string(), id.clone()))
            .ok_or(RemoteFailure::NotFound)?;
        apply_operations(&mut object.attributes, operations);
        Ok(object.clone())
    }

    fn delete(&self, resource: &str, id: &ObjectId) -> Result<(), RemoteFailure> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Delete {
            resource: resource.to_string(),
            id: id.clone(),
        });
        inner.take_failure(CallKind::Delete)?;
        inner
            .objects
            .remove(&(resource.to_string(), id.clone()))
            .map(|_| ())
            .ok_or(RemoteFailure::NotFound)
    }

    fn list(
        &self,
        resource: &str,
        parents: &[String],
        filter: Option<&str>,
    ) -> Result<Vec<RemoteObject>, RemoteFailure> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::List {
            resource: resource.to_string(),
            parents: parents.to_vec(),
        });
        inner.take_failure(CallKind::List)?;
        Ok(inner
            .objects
            .iter()
            .filter(|((r, id), _)| r == resource && id.parents == parents)
            .filter(|((_, id), _)| filter.is_none_or(|f| id.key.contains(f)))
            .map(|(_, object)| object.clone())
            .collect())
    }
}
