use serde::{Deserialize, Serialize};

use crate::model::task::FieldValue;

/// Field-type vocabulary. Closed set; every editor behavior in the cell
/// state machine dispatches over this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Boolean,
    Date,
    DateTime,
    Select,
    Tags,
    Reference,
}

/// Schema metadata for one field path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub field_path: String,
    pub field_type: FieldType,
    #[serde(default = "default_true")]
    pub editable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Lookup-set id backing a Select field
    #[serde(default)]
    pub lookup_set: Option<String>,
    /// Collection id backing a Reference field
    #[serde(default)]
    pub reference_collection: Option<String>,
    /// Searchable references open a debounced search box; fixed-choice
    /// references behave like Select.
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub default_value: Option<FieldValue>,
}

fn default_true() -> bool {
    true
}

impl FieldDescriptor {
    pub fn new(path: impl Into<String>, field_type: FieldType) -> Self {
        FieldDescriptor {
            field_path: path.into(),
            field_type,
            editable: true,
            sortable: false,
            required: false,
            visible: true,
            lookup_set: None,
            reference_collection: None,
            searchable: false,
            default_value: None,
        }
    }

    pub fn with_lookup(mut self, set: impl Into<String>) -> Self {
        self.lookup_set = Some(set.into());
        self
    }

    pub fn with_reference(mut self, collection: impl Into<String>, searchable: bool) -> Self {
        self.reference_collection = Some(collection.into());
        self.searchable = searchable;
        self
    }
}

/// Schema validation error
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate field path: {0}")]
    DuplicatePath(String),
    #[error("schema has no title field")]
    MissingTitle,
    #[error("title field must be required and editable")]
    BadTitle,
    #[error("select field {0} names no lookup set")]
    SelectWithoutLookup(String),
    #[error("reference field {0} names no collection")]
    ReferenceWithoutCollection(String),
}

/// An ordered field schema for one collection. Provided wholesale at
/// mount time and immutable for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub collection: String,
    pub fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn descriptor(&self, path: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|d| d.field_path == path)
    }

    /// Visible fields in schema order — these become the tree columns
    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|d| d.visible)
    }

    /// Editable fields in schema order — the detail form and full-payload
    /// autosave are built over exactly this set.
    pub fn editable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|d| d.editable)
    }

    /// Check structural invariants: unique paths, exactly one title
    /// (required, editable), lookup/reference backing declared.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (i, d) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|p| p.field_path == d.field_path) {
                return Err(SchemaError::DuplicatePath(d.field_path.clone()));
            }
            match d.field_type {
                FieldType::Select if d.lookup_set.is_none() => {
                    return Err(SchemaError::SelectWithoutLookup(d.field_path.clone()));
                }
                FieldType::Reference if d.reference_collection.is_none() => {
                    return Err(SchemaError::ReferenceWithoutCollection(d.field_path.clone()));
                }
                _ => {}
            }
        }
        match self.descriptor("title") {
            None => Err(SchemaError::MissingTitle),
            Some(t) if !t.required || !t.editable => Err(SchemaError::BadTitle),
            Some(_) => Ok(()),
        }
    }
}

/// One option in a lookup set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupOption {
    pub code: String,
    pub display_name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A named, finite list of options backing a Select field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupSet {
    pub id: String,
    pub options: Vec<LookupOption>,
}

impl LookupSet {
    pub fn display_name(&self, code: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.code == code)
            .map(|o| o.display_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_schema() -> Schema {
        Schema {
            collection: "tasks".into(),
            fields: vec![{
                let mut t = FieldDescriptor::new("title", FieldType::Text);
                t.required = true;
                t
            }],
        }
    }

    #[test]
    fn minimal_schema_validates() {
        assert!(minimal_schema().validate().is_ok());
    }

    #[test]
    fn missing_title_rejected() {
        let s = Schema {
            collection: "tasks".into(),
            fields: vec![FieldDescriptor::new("status", FieldType::Text)],
        };
        assert!(matches!(s.validate(), Err(SchemaError::MissingTitle)));
    }

    #[test]
    fn non_editable_title_rejected() {
        let mut s = minimal_schema();
        s.fields[0].editable = false;
        assert!(matches!(s.validate(), Err(SchemaError::BadTitle)));
    }

    #[test]
    fn duplicate_path_rejected() {
        let mut s = minimal_schema();
        s.fields.push(FieldDescriptor::new("title", FieldType::Text));
        assert!(matches!(s.validate(), Err(SchemaError::DuplicatePath(_))));
    }

    #[test]
    fn select_needs_lookup_set() {
        let mut s = minimal_schema();
        s.fields.push(FieldDescriptor::new("status", FieldType::Select));
        assert!(matches!(s.validate(), Err(SchemaError::SelectWithoutLookup(_))));

        s.fields.pop();
        s.fields
            .push(FieldDescriptor::new("status", FieldType::Select).with_lookup("statuses"));
        assert!(s.validate().is_ok());
    }
}
