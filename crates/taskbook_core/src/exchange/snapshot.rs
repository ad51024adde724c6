//! Snapshot documents for backup and transfer.
//!
//! # Responsibility
//! - Serialize lists, tags and tasks into one pretty-printed JSON document.
//! - Parse and structurally validate documents before any state is replaced.
//!
//! # Invariants
//! - A document has exactly the top-level fields `lists`, `tags`, `tasks`;
//!   extra fields are ignored on import.
//! - Import either yields a complete `StoreState` or an error, never a
//!   partial result.

use crate::model::state::{Collection, StoreState};
use crate::model::task::Task;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Suggested file name for exported snapshots.
pub const SNAPSHOT_FILE_NAME: &str = "taskbook.json";

/// Structural failures while reading a snapshot document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Not parseable JSON, not an object, or a field has the wrong shape.
    MalformedDocument(String),
    /// A required top-level field is absent or `null`.
    MissingField(&'static str),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedDocument(reason) => write!(f, "malformed snapshot document: {reason}"),
            Self::MissingField(field) => write!(f, "snapshot document is missing `{field}`"),
        }
    }
}

impl Error for ImportError {}

#[derive(Serialize)]
struct SnapshotDocument<'a> {
    lists: &'a [String],
    tags: &'a [String],
    tasks: &'a [Task],
}

/// Renders the three collections as a human-readable JSON document.
pub fn export_snapshot(
    lists: &[String],
    tags: &[String],
    tasks: &[Task],
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&SnapshotDocument { lists, tags, tasks })
}

/// Parses a snapshot document into a complete replacement state.
///
/// # Errors
/// - `MalformedDocument` when the text is not a JSON object or a field
///   cannot be decoded.
/// - `MissingField` naming the first absent collection field.
pub fn import_snapshot(document: &str) -> Result<StoreState, ImportError> {
    let value: Value = serde_json::from_str(document)
        .map_err(|err| ImportError::MalformedDocument(err.to_string()))?;
    let object = value.as_object().ok_or_else(|| {
        ImportError::MalformedDocument("top-level value is not an object".to_string())
    })?;

    for collection in Collection::ALL {
        let field = collection.key();
        if object.get(field).map_or(true, Value::is_null) {
            return Err(ImportError::MissingField(field));
        }
    }

    serde_json::from_value(value).map_err(|err| ImportError::MalformedDocument(err.to_string()))
}
