//! Import identifier parsing.
//!
//! An import identifier joins the parent keys and the object's own key with
//! a fixed delimiter, e.g. `userRoot/uid` for an index under a backend.

use tracing::debug;

use converge_schema::ResourceSchema;

use crate::error::{Error, Result};
use crate::object::ObjectId;

/// Delimiter used when none is configured.
pub const DEFAULT_DELIMITER: &str = "/";

/// Split `raw` into an [`ObjectId`] for `schema`.
///
/// Unkeyed singletons have exactly one instance, so any identifier is
/// accepted and ignored.
pub fn parse_import_id(schema: &ResourceSchema, raw: &str, delimiter: &str) -> Result<ObjectId> {
    if delimiter.is_empty() {
        return Err(Error::Config {
            message: "import delimiter must not be empty".to_string(),
        });
    }

    if schema.id_segments() == 0 {
        if !raw.is_empty() {
            debug!(resource = %schema.name, id = raw, "ignoring identifier for singleton import");
        }
        return Ok(ObjectId::singleton());
    }

    let mut segments: Vec<&str> = raw.split(delimiter).collect();
    if segments.len() != schema.id_segments() || segments.iter().any(|s| s.trim().is_empty()) {
        return Err(Error::InvalidImportId {
            resource: schema.name.clone(),
            id: raw.to_string(),
            expected: schema.import_format(delimiter),
        });
    }

    let key = if schema.keyed {
        segments.pop().unwrap_or_default()
    } else {
        ""
    };

    Ok(ObjectId::nested(segments, key))
}
