use std::collections::{HashSet, VecDeque};
use std::path::Path;

use chrono::Utc;
use indexmap::IndexMap;

use crate::model::schema::{
    FieldDescriptor, FieldType, LookupOption, LookupSet, Schema,
};
use crate::model::task::{FieldValue, Task, TaskKind};

use super::contract::{DataEvent, DataStore, LookupSource, RemoteError, SchemaProvider};

/// In-process data store backing the console and the engine tests.
///
/// Mutations apply to the task map at request time; the completion event is
/// queued and only becomes visible once `poll_event` drains it, which is
/// what lets tests (and the event loop) observe calls as in-flight.
pub struct MemoryStore {
    tasks: IndexMap<String, Task>,
    schema: Schema,
    lookups: Vec<LookupSet>,
    queue: VecDeque<DataEvent>,
    /// Parents whose next child fetch should fail (consumed on use)
    fail_children: HashSet<String>,
    /// Fail the next update_one call (consumed on use)
    fail_next_save: bool,
    /// Reject the next update_one with a field-local validation error
    /// (consumed on use)
    reject_save: Option<(String, String)>,
    /// When true, completions queue up but poll_event returns None until
    /// `release` is called — simulates slow in-flight calls.
    held: bool,
}

impl MemoryStore {
    pub fn new(tasks: Vec<Task>, schema: Schema, lookups: Vec<LookupSet>) -> Self {
        let tasks = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        MemoryStore {
            tasks,
            schema,
            lookups,
            queue: VecDeque::new(),
            fail_children: HashSet::new(),
            fail_next_save: false,
            reject_save: None,
            held: false,
        }
    }

    /// Load tasks from a JSON array file, with the default schema/lookups
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let tasks: Vec<Task> = serde_json::from_str(&content)?;
        Ok(MemoryStore::new(tasks, default_schema(), default_lookups()))
    }

    /// Root tasks in insertion order
    pub fn roots(&self) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|t| t.parent.is_none())
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// All tasks in insertion order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn lookups(&self) -> &[LookupSet] {
        &self.lookups
    }

    fn children_of(&self, parent_id: &str) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|t| t.parent.as_deref() == Some(parent_id))
            .cloned()
            .collect()
    }

    // --- test knobs ---

    pub fn fail_next_children(&mut self, parent_id: &str) {
        self.fail_children.insert(parent_id.to_string());
    }

    pub fn fail_next_save(&mut self) {
        self.fail_next_save = true;
    }

    /// Reject the next update_one as a validation failure on one field
    pub fn reject_next_save(&mut self, field: &str, message: &str) {
        self.reject_save = Some((field.to_string(), message.to_string()));
    }

    /// Hold completions undelivered until `release`
    pub fn hold(&mut self) {
        self.held = true;
    }

    pub fn release(&mut self) {
        self.held = false;
    }

    /// Number of queued (undelivered) completions
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }
}

impl DataStore for MemoryStore {
    fn request_children(&mut self, parent_id: &str) {
        let result = if self.fail_children.remove(parent_id) {
            Err(RemoteError::TransientFetch(format!(
                "children of {parent_id} unavailable"
            )))
        } else {
            Ok(self.children_of(parent_id))
        };
        self.queue.push_back(DataEvent::ChildrenLoaded {
            parent: parent_id.to_string(),
            result,
        });
    }

    fn request_update_one(&mut self, id: &str, fields: IndexMap<String, FieldValue>) {
        let result = if self.fail_next_save {
            self.fail_next_save = false;
            Err(RemoteError::SaveFailed(format!("write to {id} refused")))
        } else if let Some((field, message)) = self.reject_save.take() {
            Err(RemoteError::ValidationRejected { field, message })
        } else {
            match self.tasks.get_mut(id) {
                None => Err(RemoteError::SaveFailed(format!("no such task: {id}"))),
                Some(task) => {
                    for (path, value) in fields {
                        task.set_field(&path, value);
                    }
                    task.updated_at = Utc::now().to_rfc3339();
                    Ok(task.clone())
                }
            }
        };
        self.queue.push_back(DataEvent::TaskSaved {
            id: id.to_string(),
            result,
        });
    }

    fn request_update_many(&mut self, ids: &[String], fields: IndexMap<String, FieldValue>) {
        for id in ids {
            if let Some(task) = self.tasks.get_mut(id) {
                for (path, value) in &fields {
                    task.set_field(path, value.clone());
                }
                task.updated_at = Utc::now().to_rfc3339();
            }
        }
        self.queue.push_back(DataEvent::BulkUpdated {
            ids: ids.to_vec(),
            result: Ok(()),
        });
    }

    fn request_delete_many(&mut self, ids: &[String]) {
        let mut removed: HashSet<String> = HashSet::new();
        for id in ids {
            if self.tasks.shift_remove(id).is_some() {
                removed.insert(id.clone());
            }
        }
        // Drop orphaned descendants transitively
        loop {
            let orphans: Vec<String> = self
                .tasks
                .values()
                .filter(|t| t.parent.as_ref().is_some_and(|p| removed.contains(p)))
                .map(|t| t.id.clone())
                .collect();
            if orphans.is_empty() {
                break;
            }
            for id in orphans {
                self.tasks.shift_remove(&id);
                removed.insert(id);
            }
        }
        self.queue.push_back(DataEvent::BulkDeleted {
            ids: ids.to_vec(),
            result: Ok(()),
        });
    }

    fn request_search(&mut self, collection: &str, query: &str, limit: usize) {
        let needle = query.to_lowercase();
        let hits: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect();
        self.queue.push_back(DataEvent::SearchResults {
            collection: collection.to_string(),
            query: query.to_string(),
            result: Ok(hits),
        });
    }

    fn poll_event(&mut self) -> Option<DataEvent> {
        if self.held {
            return None;
        }
        self.queue.pop_front()
    }
}

impl SchemaProvider for MemoryStore {
    fn schema(&self, _collection: &str) -> Result<Schema, RemoteError> {
        Ok(self.schema.clone())
    }
}

impl LookupSource for MemoryStore {
    fn lookup_set(&self, id: &str) -> Option<&LookupSet> {
        self.lookups.iter().find(|s| s.id == id)
    }
}

/// The stock task schema used when no deployment schema is supplied
pub fn default_schema() -> Schema {
    let mut title = FieldDescriptor::new("title", FieldType::Text);
    title.required = true;
    title.sortable = true;

    Schema {
        collection: "tasks".into(),
        fields: vec![
            title,
            FieldDescriptor::new("status", FieldType::Select).with_lookup("statuses"),
            FieldDescriptor::new("urgency", FieldType::Select).with_lookup("urgencies"),
            FieldDescriptor::new("assignee", FieldType::Reference).with_reference("users", false),
            FieldDescriptor::new("due", FieldType::DateTime),
            FieldDescriptor::new("tags", FieldType::Tags),
            FieldDescriptor::new("estimate", FieldType::Number),
            FieldDescriptor::new("billable", FieldType::Boolean),
            {
                let mut d = FieldDescriptor::new("summary", FieldType::Textarea);
                d.visible = false;
                d
            },
            {
                let mut d =
                    FieldDescriptor::new("parent", FieldType::Reference).with_reference("tasks", true);
                d.visible = false;
                d
            },
        ],
    }
}

pub fn default_lookups() -> Vec<LookupSet> {
    vec![
        LookupSet {
            id: "statuses".into(),
            options: vec![
                opt("open", "Open", "#44DD88"),
                opt("in_progress", "In progress", "#44AAFF"),
                opt("blocked", "Blocked", "#FF4444"),
                opt("done", "Done", "#999999"),
                opt("archived", "Archived", "#666666"),
            ],
        },
        LookupSet {
            id: "urgencies".into(),
            options: vec![
                opt("low", "Low", "#66AA66"),
                opt("normal", "Normal", "#CCCCCC"),
                opt("high", "High", "#FFAA44"),
                opt("critical", "Critical", "#FF4444"),
            ],
        },
        LookupSet {
            id: "users".into(),
            options: vec![
                opt("ana", "Ana", "#44DDFF"),
                opt("kai", "Kai", "#CC66FF"),
                opt("mori", "Mori", "#FFD700"),
            ],
        },
    ]
}

fn opt(code: &str, name: &str, color: &str) -> LookupOption {
    LookupOption {
        code: code.into(),
        display_name: name.into(),
        color: Some(color.into()),
    }
}

/// Small seeded dataset for running `tg` without a data file
pub fn sample_store() -> MemoryStore {
    let mut tasks = Vec::new();

    let mut t1 = Task::new("T-001", "Quarterly onboarding review");
    t1.children = vec!["T-001.1".into(), "T-001.2".into()];
    t1.tags = vec!["review".into()];
    t1.urgency = "high".into();
    tasks.push(t1);

    let mut t11 = Task::new("T-001.1", "Collect team feedback");
    t11.parent = Some("T-001".into());
    tasks.push(t11);

    let mut t12 = Task::new("T-001.2", "Draft summary deck");
    t12.parent = Some("T-001".into());
    t12.children = vec!["T-001.2.1".into()];
    tasks.push(t12);

    let mut t121 = Task::new("T-001.2.1", "Pull usage numbers");
    t121.parent = Some("T-001.2".into());
    tasks.push(t121);

    let mut flow = Task::new("T-002", "Escalation workflow");
    flow.kind = TaskKind::Flow;
    flow.children = vec!["T-002.1".into()];
    tasks.push(flow);

    let mut f1 = Task::new("T-002.1", "Page the on-call");
    f1.parent = Some("T-002".into());
    tasks.push(f1);

    let mut ext = Task::new("T-003", "Notify the vendor");
    ext.kind = TaskKind::External;
    ext.config = Some(crate::model::task::TaskConfig::OutboundCall {
        endpoint: "https://vendor.example/hooks/notify".into(),
        payload: serde_json::json!({ "channel": "ops" }),
    });
    tasks.push(ext);

    MemoryStore::new(tasks, default_schema(), default_lookups())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn children_fetch_resolves_with_direct_children() {
        let mut store = sample_store();
        store.request_children("T-001");
        match store.poll_event() {
            Some(DataEvent::ChildrenLoaded { parent, result }) => {
                assert_eq!(parent, "T-001");
                let kids = result.unwrap();
                let ids: Vec<&str> = kids.iter().map(|t| t.id.as_str()).collect();
                assert_eq!(ids, vec!["T-001.1", "T-001.2"]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn held_completions_stay_queued() {
        let mut store = sample_store();
        store.hold();
        store.request_children("T-001");
        assert!(store.poll_event().is_none());
        assert_eq!(store.pending_events(), 1);
        store.release();
        assert!(store.poll_event().is_some());
    }

    #[test]
    fn failed_fetch_is_one_shot() {
        let mut store = sample_store();
        store.fail_next_children("T-001");
        store.request_children("T-001");
        assert!(matches!(
            store.poll_event(),
            Some(DataEvent::ChildrenLoaded { result: Err(RemoteError::TransientFetch(_)), .. })
        ));
        // Retry succeeds
        store.request_children("T-001");
        assert!(matches!(
            store.poll_event(),
            Some(DataEvent::ChildrenLoaded { result: Ok(_), .. })
        ));
    }

    #[test]
    fn update_one_applies_fields_and_returns_task() {
        let mut store = sample_store();
        let mut fields = IndexMap::new();
        fields.insert("status".to_string(), FieldValue::Text("blocked".into()));
        store.request_update_one("T-001", fields);
        match store.poll_event() {
            Some(DataEvent::TaskSaved { result: Ok(task), .. }) => {
                assert_eq!(task.status, "blocked");
                assert!(!task.updated_at.is_empty());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn rejected_save_names_the_field_and_leaves_the_task_untouched() {
        let mut store = sample_store();
        store.reject_next_save("due", "not a valid timestamp");
        let mut fields = IndexMap::new();
        fields.insert("due".to_string(), FieldValue::Text("soonish".into()));
        store.request_update_one("T-001", fields);
        match store.poll_event() {
            Some(DataEvent::TaskSaved {
                result: Err(RemoteError::ValidationRejected { field, message }),
                ..
            }) => {
                assert_eq!(field, "due");
                assert_eq!(message, "not a valid timestamp");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(store.get("T-001").unwrap().due, None);

        // The knob is one-shot; the retry lands
        let mut fields = IndexMap::new();
        fields.insert(
            "due".to_string(),
            FieldValue::DateTime("2026-09-01T00:00:00Z".into()),
        );
        store.request_update_one("T-001", fields);
        assert!(matches!(
            store.poll_event(),
            Some(DataEvent::TaskSaved { result: Ok(_), .. })
        ));
    }

    #[test]
    fn delete_many_drops_descendants() {
        let mut store = sample_store();
        store.request_delete_many(&["T-001.2".to_string()]);
        store.poll_event();
        assert!(store.get("T-001.2").is_none());
        assert!(store.get("T-001.2.1").is_none());
        assert!(store.get("T-001.1").is_some());
    }

    #[test]
    fn default_schema_is_valid() {
        default_schema().validate().unwrap();
    }
}
