use std::time::{Duration, Instant};

use chrono::NaiveDate;
use unicode_segmentation::UnicodeSegmentation;

use crate::model::schema::{FieldDescriptor, FieldType, LookupOption};
use crate::model::task::FieldValue;

use super::debounce::Debouncer;

/// Per-cell editing phase. Boolean cells skip Editing entirely; a commit
/// in flight (Committing) blocks any new edit of the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPhase {
    Viewing,
    Editing,
    Committing,
}

/// Which region counts as the editor's boundary for dismissal. Editors
/// rendered in an overlay outside the cell (picker, search) must not use
/// outside-click-to-cancel — the overlay itself would register as outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissBoundary {
    WithinCell,
    Overlay,
}

impl DismissBoundary {
    pub fn for_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Select | FieldType::Reference => DismissBoundary::Overlay,
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Number
            | FieldType::Boolean
            | FieldType::Date
            | FieldType::DateTime
            | FieldType::Tags => DismissBoundary::WithinCell,
        }
    }
}

/// What activation opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Inline,
    Picker,
    Search,
    /// Boolean: activation committed directly, no Editing phase
    Committed,
}

/// A side effect for the composition root to dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum CellCommand {
    Save {
        field_path: String,
        value: FieldValue,
    },
    Search {
        collection: String,
        query: String,
    },
}

/// Option-list editor state (Select and fixed-choice Reference)
#[derive(Debug, Clone)]
pub struct PickerState {
    pub options: Vec<LookupOption>,
    pub cursor: usize,
}

impl PickerState {
    pub fn move_cursor(&mut self, delta: isize) {
        if self.options.is_empty() {
            return;
        }
        let len = self.options.len() as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
    }
}

/// Debounced search-box state for searchable references
#[derive(Debug, Clone)]
pub struct SearchState {
    pub collection: String,
    pub query: String,
    pub results: Vec<(String, String)>,
    pub cursor: usize,
    debounce: Debouncer,
    last_dispatched: Option<String>,
}

/// One in-progress edit. Destroyed on commit or cancel, never persisted.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub field_path: String,
    pub field_type: FieldType,
    /// The entity's value when editing began; restored on cancel
    pub persisted: FieldValue,
    /// Inline text candidate
    pub buffer: String,
    /// Byte offset into `buffer`
    pub cursor: usize,
    pub phase: CellPhase,
    pub boundary: DismissBoundary,
    pub picker: Option<PickerState>,
    pub search: Option<SearchState>,
}

/// The cell edit state machine. Owns at most one session at a time (one
/// cell edits at once per surface).
#[derive(Debug, Default)]
pub struct CellEditor {
    session: Option<EditSession>,
    search_window: Duration,
}

impl CellEditor {
    pub fn new(search_window: Duration) -> Self {
        CellEditor {
            session: None,
            search_window,
        }
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn phase(&self) -> CellPhase {
        self.session
            .as_ref()
            .map_or(CellPhase::Viewing, |s| s.phase)
    }

    /// Activate a cell. Returns the editor shape that opened plus any
    /// command to dispatch (boolean activation commits immediately).
    ///
    /// Refused while a prior commit is in flight or the field is not
    /// editable.
    pub fn activate(
        &mut self,
        desc: &FieldDescriptor,
        current: FieldValue,
        options: Vec<LookupOption>,
    ) -> Option<(Activation, Option<CellCommand>)> {
        if !desc.editable || self.session.is_some() {
            return None;
        }

        match desc.field_type {
            FieldType::Boolean => {
                // Toggle-and-save: there is no intermediate value to stage
                let negated = match current {
                    FieldValue::Bool(b) => !b,
                    _ => true,
                };
                self.session = Some(EditSession {
                    field_path: desc.field_path.clone(),
                    field_type: desc.field_type,
                    persisted: current,
                    buffer: String::new(),
                    cursor: 0,
                    phase: CellPhase::Committing,
                    boundary: DismissBoundary::for_type(desc.field_type),
                    picker: None,
                    search: None,
                });
                Some((
                    Activation::Committed,
                    Some(CellCommand::Save {
                        field_path: desc.field_path.clone(),
                        value: FieldValue::Bool(negated),
                    }),
                ))
            }
            FieldType::Select => {
                self.session = Some(EditSession {
                    field_path: desc.field_path.clone(),
                    field_type: desc.field_type,
                    persisted: current,
                    buffer: String::new(),
                    cursor: 0,
                    phase: CellPhase::Editing,
                    boundary: DismissBoundary::Overlay,
                    picker: Some(PickerState { options, cursor: 0 }),
                    search: None,
                });
                Some((Activation::Picker, None))
            }
            FieldType::Reference => {
                if desc.searchable {
                    let collection = desc
                        .reference_collection
                        .clone()
                        .unwrap_or_default();
                    self.session = Some(EditSession {
                        field_path: desc.field_path.clone(),
                        field_type: desc.field_type,
                        persisted: current,
                        buffer: String::new(),
                        cursor: 0,
                        phase: CellPhase::Editing,
                        boundary: DismissBoundary::Overlay,
                        picker: None,
                        search: Some(SearchState {
                            collection,
                            query: String::new(),
                            results: Vec::new(),
                            cursor: 0,
                            debounce: Debouncer::new(self.search_window),
                            last_dispatched: None,
                        }),
                    });
                    Some((Activation::Search, None))
                } else {
                    self.session = Some(EditSession {
                        field_path: desc.field_path.clone(),
                        field_type: desc.field_type,
                        persisted: current,
                        buffer: String::new(),
                        cursor: 0,
                        phase: CellPhase::Editing,
                        boundary: DismissBoundary::Overlay,
                        picker: Some(PickerState { options, cursor: 0 }),
                        search: None,
                    });
                    Some((Activation::Picker, None))
                }
            }
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Number
            | FieldType::Date
            | FieldType::DateTime
            | FieldType::Tags => {
                let buffer = current.edit_text();
                let cursor = buffer.len();
                self.session = Some(EditSession {
                    field_path: desc.field_path.clone(),
                    field_type: desc.field_type,
                    persisted: current,
                    buffer,
                    cursor,
                    phase: CellPhase::Editing,
                    boundary: DismissBoundary::WithinCell,
                    picker: None,
                    search: None,
                });
                Some((Activation::Inline, None))
            }
        }
    }

    // --- inline buffer editing ---

    pub fn insert_char(&mut self, c: char) {
        if let Some(s) = self.editing_session_mut()
            && s.picker.is_none()
        {
            if let Some(search) = &mut s.search {
                search.query.push(c);
                // Re-dispatch happens via poll_search after the quiet window
            } else {
                s.buffer.insert(s.cursor, c);
                s.cursor += c.len_utf8();
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(s) = self.editing_session_mut() {
            if let Some(search) = &mut s.search {
                search.query.pop();
            } else if s.cursor > 0 {
                let prev = prev_grapheme_boundary(&s.buffer, s.cursor);
                s.buffer.replace_range(prev..s.cursor, "");
                s.cursor = prev;
            }
        }
    }

    pub fn move_left(&mut self) {
        if let Some(s) = self.editing_session_mut() {
            s.cursor = prev_grapheme_boundary(&s.buffer, s.cursor);
        }
    }

    pub fn move_right(&mut self) {
        if let Some(s) = self.editing_session_mut() {
            s.cursor = next_grapheme_boundary(&s.buffer, s.cursor);
        }
    }

    pub fn move_home(&mut self) {
        if let Some(s) = self.editing_session_mut() {
            s.cursor = 0;
        }
    }

    pub fn move_end(&mut self) {
        if let Some(s) = self.editing_session_mut() {
            s.cursor = s.buffer.len();
        }
    }

    /// Mark the search debounce on every query edit
    pub fn note_search_input(&mut self, now: Instant) {
        if let Some(s) = self.editing_session_mut()
            && let Some(search) = &mut s.search
        {
            search.debounce.trigger(now);
        }
    }

    /// Emit the debounced search command once the quiet window elapses and
    /// the query actually changed since the last dispatch.
    pub fn poll_search(&mut self, now: Instant) -> Option<CellCommand> {
        let s = self.editing_session_mut()?;
        let search = s.search.as_mut()?;
        if !search.debounce.fire(now) {
            return None;
        }
        if search.last_dispatched.as_deref() == Some(search.query.as_str()) {
            return None;
        }
        search.last_dispatched = Some(search.query.clone());
        Some(CellCommand::Search {
            collection: search.collection.clone(),
            query: search.query.clone(),
        })
    }

    /// Install results for the open search box
    pub fn search_results(&mut self, query: &str, results: Vec<(String, String)>) {
        if let Some(s) = self.editing_session_mut()
            && let Some(search) = &mut s.search
            && search.query == query
        {
            search.results = results;
            search.cursor = 0;
        }
    }

    pub fn picker_move(&mut self, delta: isize) {
        if let Some(s) = self.editing_session_mut() {
            if let Some(p) = &mut s.picker {
                p.move_cursor(delta);
            } else if let Some(search) = &mut s.search {
                if !search.results.is_empty() {
                    let len = search.results.len() as isize;
                    search.cursor = (search.cursor as isize + delta).rem_euclid(len) as usize;
                }
            }
        }
    }

    // --- commit / cancel ---

    /// Commit the inline buffer. Fires at most once per session: a second
    /// trigger (blur after Enter) finds the phase already Committing and
    /// does nothing.
    pub fn commit(&mut self) -> Option<CellCommand> {
        let s = self.session.as_mut()?;
        if s.phase != CellPhase::Editing || s.picker.is_some() || s.search.is_some() {
            return None;
        }
        s.phase = CellPhase::Committing;
        Some(CellCommand::Save {
            field_path: s.field_path.clone(),
            value: parse_candidate(s.field_type, &s.buffer),
        })
    }

    /// Choose the highlighted picker option or search result: commits and
    /// exits in one step.
    pub fn pick(&mut self) -> Option<CellCommand> {
        let s = self.session.as_mut()?;
        if s.phase != CellPhase::Editing {
            return None;
        }
        let value = if let Some(p) = &s.picker {
            let option = p.options.get(p.cursor)?;
            match s.field_type {
                FieldType::Reference => FieldValue::Reference(Some(option.code.clone())),
                _ => FieldValue::Text(option.code.clone()),
            }
        } else if let Some(search) = &s.search {
            let (id, _) = search.results.get(search.cursor)?;
            FieldValue::Reference(Some(id.clone()))
        } else {
            return None;
        };
        s.phase = CellPhase::Committing;
        Some(CellCommand::Save {
            field_path: s.field_path.clone(),
            value,
        })
    }

    /// Escape: discard the candidate, restore the persisted value. A
    /// commit in flight cannot be cancelled.
    pub fn cancel(&mut self) {
        if self.phase() == CellPhase::Editing {
            self.session = None;
        }
    }

    /// A pointer event landed outside the cell. Cancels only editors whose
    /// boundary is the cell's own subtree; overlay editors rely solely on
    /// their explicit selection/close events. Returns whether it cancelled.
    pub fn outside_click(&mut self) -> bool {
        match self.session.as_ref() {
            Some(s) if s.phase == CellPhase::Editing && s.boundary == DismissBoundary::WithinCell => {
                self.session = None;
                true
            }
            _ => false,
        }
    }

    /// The dispatched save resolved. Success closes the session; failure
    /// returns to Editing with the candidate intact so re-committing
    /// retries (the user's value is never silently reverted).
    pub fn commit_resolved(&mut self, success: bool) {
        match self.session.as_mut() {
            Some(s) if s.phase == CellPhase::Committing => {
                if success {
                    self.session = None;
                } else if s.field_type == FieldType::Boolean {
                    // Nothing staged to return to
                    self.session = None;
                } else {
                    s.phase = CellPhase::Editing;
                }
            }
            _ => {}
        }
    }

    fn editing_session_mut(&mut self) -> Option<&mut EditSession> {
        self.session
            .as_mut()
            .filter(|s| s.phase == CellPhase::Editing)
    }
}

/// Parse an inline buffer into a typed value. Tolerant by design: edits
/// are never blocked by transient invalid input.
pub fn parse_candidate(field_type: FieldType, raw: &str) -> FieldValue {
    match field_type {
        FieldType::Text | FieldType::Textarea => FieldValue::Text(raw.to_string()),
        // Non-parseable numeric input commits as 0
        FieldType::Number => FieldValue::Number(raw.trim().parse::<f64>().unwrap_or(0.0)),
        FieldType::Boolean => FieldValue::Bool(matches!(raw.trim(), "true" | "yes" | "1")),
        FieldType::Date => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                FieldValue::Null
            } else {
                match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                    Ok(d) => FieldValue::Date(d.format("%Y-%m-%d").to_string()),
                    // Invalid date text commits as entered; the store validates
                    Err(_) => FieldValue::Date(trimmed.to_string()),
                }
            }
        }
        FieldType::DateTime => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::DateTime(trimmed.to_string())
            }
        }
        // Comma-separated: trimmed, empties dropped, order kept, dupes kept
        FieldType::Tags => FieldValue::Tags(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        FieldType::Select | FieldType::Reference => FieldValue::Text(raw.to_string()),
    }
}

fn prev_grapheme_boundary(s: &str, at: usize) -> usize {
    s.grapheme_indices(true)
        .map(|(i, _)| i)
        .take_while(|&i| i < at)
        .last()
        .unwrap_or(0)
}

fn next_grapheme_boundary(s: &str, at: usize) -> usize {
    s.grapheme_indices(true)
        .map(|(i, _)| i)
        .find(|&i| i > at)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn editor() -> CellEditor {
        CellEditor::new(Duration::from_millis(300))
    }

    fn desc(path: &str, ft: FieldType) -> FieldDescriptor {
        FieldDescriptor::new(path, ft)
    }

    fn save_value(cmd: CellCommand) -> FieldValue {
        match cmd {
            CellCommand::Save { value, .. } => value,
            other => panic!("expected Save, got {:?}", other),
        }
    }

    #[test]
    fn number_parse_is_tolerant() {
        assert_eq!(parse_candidate(FieldType::Number, "abc"), FieldValue::Number(0.0));
        assert_eq!(parse_candidate(FieldType::Number, "12.5"), FieldValue::Number(12.5));
        assert_eq!(parse_candidate(FieldType::Number, " 7 "), FieldValue::Number(7.0));
    }

    #[test]
    fn tags_split_trim_keep_duplicates() {
        assert_eq!(
            parse_candidate(FieldType::Tags, "a, b ,b"),
            FieldValue::Tags(vec!["a".into(), "b".into(), "b".into()])
        );
        assert_eq!(
            parse_candidate(FieldType::Tags, " , ,"),
            FieldValue::Tags(vec![])
        );
    }

    #[test]
    fn boolean_activation_commits_negation_without_editing_phase() {
        let mut ed = editor();
        let (activation, cmd) = ed
            .activate(&desc("billable", FieldType::Boolean), FieldValue::Bool(true), vec![])
            .unwrap();
        assert_eq!(activation, Activation::Committed);
        assert_eq!(save_value(cmd.unwrap()), FieldValue::Bool(false));
        assert_eq!(ed.phase(), CellPhase::Committing);
        ed.commit_resolved(true);
        assert!(!ed.is_open());
    }

    #[test]
    fn null_boolean_toggles_to_true() {
        let mut ed = editor();
        let (_, cmd) = ed
            .activate(&desc("billable", FieldType::Boolean), FieldValue::Null, vec![])
            .unwrap();
        assert_eq!(save_value(cmd.unwrap()), FieldValue::Bool(true));
    }

    #[test]
    fn commit_fires_exactly_once_per_session() {
        let mut ed = editor();
        ed.activate(&desc("title", FieldType::Text), FieldValue::Text("old".into()), vec![])
            .unwrap();
        for c in "!".chars() {
            ed.insert_char(c);
        }
        // Enter commits
        let first = ed.commit();
        assert_eq!(save_value(first.unwrap()), FieldValue::Text("old!".into()));
        // The blur that follows finds Committing and does nothing
        assert!(ed.commit().is_none());
    }

    #[test]
    fn no_new_edit_while_commit_in_flight() {
        let mut ed = editor();
        ed.activate(&desc("title", FieldType::Text), FieldValue::Text("x".into()), vec![])
            .unwrap();
        ed.commit().unwrap();
        assert!(
            ed.activate(&desc("title", FieldType::Text), FieldValue::Text("x".into()), vec![])
                .is_none()
        );
        ed.commit_resolved(true);
        assert!(
            ed.activate(&desc("title", FieldType::Text), FieldValue::Text("x".into()), vec![])
                .is_some()
        );
    }

    #[test]
    fn cancel_discards_without_save() {
        let mut ed = editor();
        ed.activate(&desc("title", FieldType::Text), FieldValue::Text("keep".into()), vec![])
            .unwrap();
        ed.insert_char('x');
        ed.cancel();
        assert!(!ed.is_open());
    }

    #[test]
    fn outside_click_cancels_inline_but_not_overlay_editors() {
        let mut ed = editor();
        ed.activate(&desc("title", FieldType::Text), FieldValue::Null, vec![])
            .unwrap();
        assert!(ed.outside_click());
        assert!(!ed.is_open());

        let opts = vec![LookupOption {
            code: "open".into(),
            display_name: "Open".into(),
            color: None,
        }];
        ed.activate(
            &desc("status", FieldType::Select).with_lookup("statuses"),
            FieldValue::Text("open".into()),
            opts,
        )
        .unwrap();
        assert!(!ed.outside_click());
        assert!(ed.is_open());
    }

    #[test]
    fn picking_an_option_commits_and_exits_in_one_step() {
        let mut ed = editor();
        let opts = vec![
            LookupOption { code: "open".into(), display_name: "Open".into(), color: None },
            LookupOption { code: "done".into(), display_name: "Done".into(), color: None },
        ];
        ed.activate(
            &desc("status", FieldType::Select).with_lookup("statuses"),
            FieldValue::Text("open".into()),
            opts,
        )
        .unwrap();
        ed.picker_move(1);
        let cmd = ed.pick().unwrap();
        assert_eq!(save_value(cmd), FieldValue::Text("done".into()));
        assert_eq!(ed.phase(), CellPhase::Committing);
        // No second pick while committing
        assert!(ed.pick().is_none());
    }

    #[test]
    fn fixed_reference_pick_yields_reference_value() {
        let mut ed = editor();
        let opts = vec![LookupOption {
            code: "ana".into(),
            display_name: "Ana".into(),
            color: None,
        }];
        ed.activate(
            &desc("assignee", FieldType::Reference).with_reference("users", false),
            FieldValue::Null,
            opts,
        )
        .unwrap();
        let cmd = ed.pick().unwrap();
        assert_eq!(save_value(cmd), FieldValue::Reference(Some("ana".into())));
    }

    #[test]
    fn search_queries_are_debounced() {
        let t0 = Instant::now();
        let mut ed = editor();
        ed.activate(
            &desc("parent", FieldType::Reference).with_reference("tasks", true),
            FieldValue::Null,
            vec![],
        )
        .unwrap();

        ed.insert_char('v');
        ed.note_search_input(t0);
        ed.insert_char('e');
        ed.note_search_input(t0 + Duration::from_millis(100));

        // Quiet window not yet elapsed since the last keystroke
        assert!(ed.poll_search(t0 + Duration::from_millis(350)).is_none());
        let cmd = ed.poll_search(t0 + Duration::from_millis(400)).unwrap();
        assert_eq!(
            cmd,
            CellCommand::Search { collection: "tasks".into(), query: "ve".into() }
        );
        // Unchanged query does not re-dispatch
        ed.note_search_input(t0 + Duration::from_millis(500));
        assert!(ed.poll_search(t0 + Duration::from_millis(900)).is_none());
    }

    #[test]
    fn picking_a_search_result_commits_reference() {
        let mut ed = editor();
        ed.activate(
            &desc("parent", FieldType::Reference).with_reference("tasks", true),
            FieldValue::Null,
            vec![],
        )
        .unwrap();
        ed.search_results("", vec![("T-9".into(), "Vendor call".into())]);
        let cmd = ed.pick().unwrap();
        assert_eq!(save_value(cmd), FieldValue::Reference(Some("T-9".into())));
    }

    #[test]
    fn failed_save_returns_to_editing_with_candidate_intact() {
        let mut ed = editor();
        ed.activate(&desc("title", FieldType::Text), FieldValue::Text("old".into()), vec![])
            .unwrap();
        ed.insert_char('!');
        ed.commit().unwrap();
        ed.commit_resolved(false);
        assert_eq!(ed.phase(), CellPhase::Editing);
        assert_eq!(ed.session().unwrap().buffer, "old!");
        // Re-committing retries
        let cmd = ed.commit().unwrap();
        assert_eq!(save_value(cmd), FieldValue::Text("old!".into()));
    }

    #[test]
    fn non_editable_field_never_activates() {
        let mut ed = editor();
        let mut d = desc("created_at", FieldType::DateTime);
        d.editable = false;
        assert!(ed.activate(&d, FieldValue::Null, vec![]).is_none());
    }

    #[test]
    fn grapheme_aware_backspace() {
        let mut ed = editor();
        ed.activate(&desc("title", FieldType::Text), FieldValue::Text("héllo".into()), vec![])
            .unwrap();
        ed.backspace();
        ed.backspace();
        ed.backspace();
        ed.backspace();
        assert_eq!(ed.session().unwrap().buffer, "h");
    }
}
