use indexmap::{IndexMap, IndexSet};

use crate::model::task::FieldValue;

use super::tree::Row;

/// A batch operation over the current selection
#[derive(Debug, Clone, PartialEq)]
pub enum BulkAction {
    SetStatus(String),
    SetUrgency(String),
    SetAssignee(Option<String>),
    /// Alias for SetStatus("archived")
    Archive,
    /// Irreversible; gated behind an explicit confirmation
    Delete,
}

impl BulkAction {
    /// The field write this action carries, or None for Delete
    pub fn fields(&self) -> Option<IndexMap<String, FieldValue>> {
        let mut fields = IndexMap::new();
        match self {
            BulkAction::SetStatus(code) => {
                fields.insert("status".to_string(), FieldValue::Text(code.clone()));
            }
            BulkAction::SetUrgency(code) => {
                fields.insert("urgency".to_string(), FieldValue::Text(code.clone()));
            }
            BulkAction::SetAssignee(who) => {
                fields.insert("assignee".to_string(), FieldValue::Reference(who.clone()));
            }
            BulkAction::Archive => {
                fields.insert("status".to_string(), FieldValue::Text("archived".into()));
            }
            BulkAction::Delete => return None,
        }
        Some(fields)
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, BulkAction::Delete)
    }
}

/// A dispatched batch whose resolution is still outstanding. The id list
/// was captured before dispatch and never re-read from the live set.
#[derive(Debug, Clone)]
pub struct PendingBulk {
    pub ids: Vec<String>,
    pub action: BulkAction,
}

/// Tracks selected node ids over the flat, currently rendered projection.
/// One controller per tree instance.
#[derive(Debug, Default)]
pub struct SelectionController {
    selected: IndexSet<String>,
    in_flight: Option<PendingBulk>,
}

impl SelectionController {
    pub fn new() -> Self {
        SelectionController::default()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in selection order
    pub fn ids(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn toggle_one(&mut self, id: &str) {
        if !self.selected.shift_remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Select every currently rendered root-level row, or clear if all of
    /// them are already selected. Collapsed children are never reached.
    pub fn toggle_all(&mut self, rows: &[Row]) {
        let roots: Vec<&str> = rows
            .iter()
            .filter(|r| r.depth == 0)
            .map(|r| r.id.as_str())
            .collect();
        let all_selected = !roots.is_empty() && roots.iter().all(|id| self.selected.contains(*id));
        if all_selected {
            self.selected.clear();
        } else {
            for id in roots {
                self.selected.insert(id.to_string());
            }
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Capture the selection as a fixed id list for a batch dispatch.
    /// Returns None when nothing is selected or a batch is already
    /// outstanding. Selection is NOT cleared here — only on resolution.
    pub fn begin_bulk(&mut self, action: BulkAction) -> Option<PendingBulk> {
        if self.selected.is_empty() || self.in_flight.is_some() {
            return None;
        }
        let pending = PendingBulk {
            ids: self.selected.iter().cloned().collect(),
            action,
        };
        self.in_flight = Some(pending.clone());
        Some(pending)
    }

    pub fn bulk_in_flight(&self) -> Option<&PendingBulk> {
        self.in_flight.as_ref()
    }

    /// The batch resolved. Selection clears only on success; on failure it
    /// stays so the user can retry.
    pub fn bulk_resolved(&mut self, success: bool) {
        self.in_flight = None;
        if success {
            self.selected.clear();
        }
    }
}
