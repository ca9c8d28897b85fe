use indexmap::IndexMap;

use crate::model::schema::{LookupSet, Schema};
use crate::model::task::{FieldValue, Task};

/// Error type for remote collaborator calls
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Child-list fetch or lookup search failed; the affected node stays
    /// in a retryable empty state.
    #[error("fetch failed: {0}")]
    TransientFetch(String),
    /// A single-field or full-entity save failed; not retried
    /// automatically.
    #[error("save failed: {0}")]
    SaveFailed(String),
    /// The store rejected one field's value; blocks only that save.
    #[error("{field}: {message}")]
    ValidationRejected { field: String, message: String },
}

/// A completed collaborator call, delivered through `DataStore::poll_event`.
/// Completions are drained by the event loop each tick; nothing in the
/// engine blocks on them.
#[derive(Debug, Clone)]
pub enum DataEvent {
    ChildrenLoaded {
        parent: String,
        result: Result<Vec<Task>, RemoteError>,
    },
    TaskSaved {
        id: String,
        result: Result<Task, RemoteError>,
    },
    BulkUpdated {
        ids: Vec<String>,
        result: Result<(), RemoteError>,
    },
    BulkDeleted {
        ids: Vec<String>,
        result: Result<(), RemoteError>,
    },
    SearchResults {
        collection: String,
        query: String,
        result: Result<Vec<Task>, RemoteError>,
    },
}

/// The data collaborator. Every request is fire-and-forget; the matching
/// `DataEvent` arrives later via `poll_event`. Batch calls are atomic from
/// the caller's perspective — one result for the whole id list.
pub trait DataStore {
    fn request_children(&mut self, parent_id: &str);
    fn request_update_one(&mut self, id: &str, fields: IndexMap<String, FieldValue>);
    fn request_update_many(&mut self, ids: &[String], fields: IndexMap<String, FieldValue>);
    fn request_delete_many(&mut self, ids: &[String]);
    fn request_search(&mut self, collection: &str, query: &str, limit: usize);
    /// Next completed call, if any. Returns None when nothing has resolved.
    fn poll_event(&mut self) -> Option<DataEvent>;
}

/// The schema collaborator: one ordered field schema per collection,
/// read-only for the session.
pub trait SchemaProvider {
    fn schema(&self, collection: &str) -> Result<Schema, RemoteError>;
}

/// Fixed-choice lookups (statuses, urgencies, assignees)
pub trait LookupSource {
    fn lookup_set(&self, id: &str) -> Option<&LookupSet>;
}
