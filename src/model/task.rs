use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Work-item variant. Determines inline-expansion behavior and which
/// configuration payload (if any) the task carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Standard,
    /// Delegated sub-workflow. Children are viewed in a dedicated scoped
    /// view, never expanded inline.
    Flow,
    /// Outbound-call task.
    External,
    /// Batch task that fans out over a collection.
    ForEach,
}

impl TaskKind {
    /// Flow tasks never expand inline and never trigger a child fetch.
    pub fn expands_inline(self) -> bool {
        self != TaskKind::Flow
    }
}

/// Kind-specific configuration payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskConfig {
    /// Outbound-call configuration for External tasks
    OutboundCall {
        endpoint: String,
        payload: serde_json::Value,
    },
    /// Batch counters for ForEach tasks
    Batch { total: u32, completed: u32 },
}

/// A typed field value. Closed union over the schema's field-type
/// vocabulary; dates are kept as ISO strings (validation is server-side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(String),
    DateTime(String),
    Tags(Vec<String>),
    Reference(Option<String>),
}

impl FieldValue {
    /// Plain display form for read-mode cells
    pub fn display(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FieldValue::Bool(b) => if *b { "yes" } else { "no" }.to_string(),
            FieldValue::Date(s) | FieldValue::DateTime(s) => s.clone(),
            FieldValue::Tags(tags) => tags.join(", "),
            FieldValue::Reference(r) => r.clone().unwrap_or_default(),
        }
    }

    /// Raw text form used to pre-fill an inline editor buffer
    pub fn edit_text(&self) -> String {
        self.display()
    }
}

/// A work item. Core fields are first-class; deployment-specific fields
/// live in `fields` keyed by schema path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub urgency: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub kind: TaskKind,
    /// Schema-defined additional fields, in schema order
    #[serde(default)]
    pub fields: IndexMap<String, FieldValue>,
    #[serde(default)]
    pub parent: Option<String>,
    /// Shallow snapshot of child ids, possibly stale. Only consulted to
    /// decide whether a collapsed row shows a toggle affordance; the
    /// fetched child list is authoritative.
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub config: Option<TaskConfig>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Task {
    /// Create a task with the given id and title; everything else default
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            prompt: String::new(),
            notes: String::new(),
            status: "open".to_string(),
            urgency: "normal".to_string(),
            assignee: None,
            due: None,
            tags: Vec::new(),
            kind: TaskKind::Standard,
            fields: IndexMap::new(),
            parent: None,
            children: Vec::new(),
            config: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    /// Read a field by schema path. Core fields map to their typed values;
    /// anything else comes from the extras map (Null when absent).
    pub fn field(&self, path: &str) -> FieldValue {
        match path {
            "title" => FieldValue::Text(self.title.clone()),
            "summary" => FieldValue::Text(self.summary.clone()),
            "prompt" => FieldValue::Text(self.prompt.clone()),
            "notes" => FieldValue::Text(self.notes.clone()),
            "status" => FieldValue::Text(self.status.clone()),
            "urgency" => FieldValue::Text(self.urgency.clone()),
            "assignee" => FieldValue::Reference(self.assignee.clone()),
            "due" => match &self.due {
                Some(d) => FieldValue::DateTime(d.clone()),
                None => FieldValue::Null,
            },
            "tags" => FieldValue::Tags(self.tags.clone()),
            other => self.fields.get(other).cloned().unwrap_or_default(),
        }
    }

    /// Write a field by schema path. Values of the wrong shape for a core
    /// field are coerced through their display form rather than rejected.
    pub fn set_field(&mut self, path: &str, value: FieldValue) {
        match path {
            "title" => self.title = value.display(),
            "summary" => self.summary = value.display(),
            "prompt" => self.prompt = value.display(),
            "notes" => self.notes = value.display(),
            "status" => self.status = value.display(),
            "urgency" => self.urgency = value.display(),
            "assignee" => {
                self.assignee = match value {
                    FieldValue::Reference(r) => r,
                    FieldValue::Null => None,
                    other => Some(other.display()),
                }
            }
            "due" => {
                self.due = match value {
                    FieldValue::Null => None,
                    other => Some(other.display()),
                }
            }
            "tags" => {
                self.tags = match value {
                    FieldValue::Tags(t) => t,
                    FieldValue::Null => Vec::new(),
                    other => vec![other.display()],
                }
            }
            other => {
                self.fields.insert(other.to_string(), value);
            }
        }
    }

    /// Whether the embedded child snapshot suggests children exist.
    /// Affordance only — never authoritative.
    pub fn snapshot_has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn field_round_trip_core_paths() {
        let mut task = Task::new("T-1", "Call the vendor");
        task.set_field("status", FieldValue::Text("blocked".into()));
        task.set_field("tags", FieldValue::Tags(vec!["a".into(), "b".into()]));
        task.set_field("assignee", FieldValue::Reference(Some("U-9".into())));

        assert_eq!(task.field("status"), FieldValue::Text("blocked".into()));
        assert_eq!(
            task.field("tags"),
            FieldValue::Tags(vec!["a".into(), "b".into()])
        );
        assert_eq!(task.field("assignee"), FieldValue::Reference(Some("U-9".into())));
    }

    #[test]
    fn extra_fields_live_in_the_map() {
        let mut task = Task::new("T-1", "x");
        assert_eq!(task.field("estimate"), FieldValue::Null);
        task.set_field("estimate", FieldValue::Number(3.0));
        assert_eq!(task.field("estimate"), FieldValue::Number(3.0));
        assert!(task.fields.contains_key("estimate"));
    }

    #[test]
    fn due_null_clears() {
        let mut task = Task::new("T-1", "x");
        task.set_field("due", FieldValue::DateTime("2026-01-01T09:00:00Z".into()));
        assert!(task.due.is_some());
        task.set_field("due", FieldValue::Null);
        assert!(task.due.is_none());
    }

    #[test]
    fn flow_kind_never_expands_inline() {
        assert!(!TaskKind::Flow.expands_inline());
        assert!(TaskKind::Standard.expands_inline());
        assert!(TaskKind::External.expands_inline());
    }

    #[test]
    fn number_display_drops_integral_fraction() {
        assert_eq!(FieldValue::Number(12.5).display(), "12.5");
        assert_eq!(FieldValue::Number(3.0).display(), "3");
    }
}
