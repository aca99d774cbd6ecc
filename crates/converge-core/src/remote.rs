//! The remote configuration service, as seen by the controller.
//!
//! Transport, authentication, timeouts and retries all live behind
//! [`RemoteService`]. The controller makes at most one call per logical step
//! and maps [`RemoteFailure`] onto its own error taxonomy.

use converge_schema::AttributeMap;
use serde::{Deserialize, Serialize};

use crate::diff::Operation;
use crate::object::{ConfigurationObject, ObjectId};

/// Failure reported by a [`RemoteService`] call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteFailure {
    /// The object does not exist (HTTP 404)
    #[error("not found")]
    NotFound,

    /// Any other non-success response
    #[error("status {code}: {message}")]
    Status { code: u16, message: String },

    /// The request never got a response
    #[error("transport error: {0}")]
    Transport(String),
}

/// An object as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteObject {
    pub id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminant: Option<String>,
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl RemoteObject {
    pub fn into_object(self, resource: &str) -> ConfigurationObject {
        ConfigurationObject {
            resource: resource.to_string(),
            id: self.id,
            discriminant: self.discriminant,
            attributes: self.attributes,
        }
    }
}

/// Payload of an ADD call: identifier, variant and every attribute to set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AddRequest {
    pub id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminant: Option<String>,
    pub attributes: AttributeMap,
}

/// Remote Configuration Service collaborator.
///
/// Implementations are expected to give read-after-update consistency: a
/// `get` issued after `update` returns must observe the update.
pub trait RemoteService: Send + Sync {
    /// Fetch one object by identifier.
    fn get(&self, resource: &str, id: &ObjectId) -> Result<RemoteObject, RemoteFailure>;

    /// Create an object.
    fn add(&self, resource: &str, request: &AddRequest) -> Result<RemoteObject, RemoteFailure>;

    /// Apply a batch of operations in one request.
    fn update(
        &self,
        resource: &str,
        id: &ObjectId,
        operations: &[Operation],
    ) -> Result<RemoteObject, RemoteFailure>;

    /// Delete an object.
    fn delete(&self, resource: &str, id: &ObjectId) -> Result<(), RemoteFailure>;

    /// List objects under `parents`, optionally filtered by the remote.
    fn list(
        &self,
        resource: &str,
        parents: &[String],
        filter: Option<&str>,
    ) -> Result<Vec<RemoteObject>, RemoteFailure>;
}
