use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use indexmap::IndexMap;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;

use crate::engine::{
    AutosaveScheduler, BulkAction, CellCommand, CellEditor, ExpandEffect, ExpansionController,
    Row, SelectionController, TreeStore,
};
use crate::io::state::{UiState, read_ui_state, write_ui_state};
use crate::model::schema::{FieldDescriptor, LookupOption, LookupSet, Schema};
use crate::model::task::{FieldValue, Task};
use crate::model::{ConsoleConfig, FieldType};
use crate::remote::{DataEvent, DataStore, RemoteError};

use super::input;
use super::render;
use super::theme::Theme;

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    Edit,
    Select,
    Confirm,
}

/// One tree view instance: the root console or a flow drill-down. Each
/// scope owns its tree, expansion, and selection — no cross-talk.
pub struct ScopeState {
    /// Flow task id this scope is rooted under (None = deployment roots)
    pub scope: Option<String>,
    pub tree: TreeStore,
    pub expansion: ExpansionController,
    pub selection: SelectionController,
    pub cursor: usize,
    pub col: usize,
    pub scroll_offset: usize,
}

impl ScopeState {
    fn new(scope: Option<String>, roots: Vec<Task>) -> Self {
        ScopeState {
            scope,
            tree: TreeStore::new(roots),
            expansion: ExpansionController::new(),
            selection: SelectionController::new(),
            cursor: 0,
            col: 0,
            scroll_offset: 0,
        }
    }
}

/// Detail-editing surface for one open entity
pub struct DetailState {
    pub task_id: String,
    pub field_cursor: usize,
    pub scroll_offset: usize,
    /// Full editable field set, in schema order
    pub draft: IndexMap<String, FieldValue>,
    pub autosave: AutosaveScheduler,
    pub editor: CellEditor,
    /// Field-local validation message
    pub field_error: Option<(String, String)>,
}

/// Pending confirmation (delete is irreversible)
pub enum ConfirmAction {
    BulkDelete { ids: Vec<String> },
}

/// Which bulk field a select-mode picker is choosing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkPickerKind {
    Status,
    Urgency,
    Assignee,
}

pub struct BulkPicker {
    pub kind: BulkPickerKind,
    pub options: Vec<LookupOption>,
    pub cursor: usize,
}

/// Tree body geometry from the last draw, for routing pointer presses to
/// rows and columns
#[derive(Debug, Clone, Copy)]
pub struct TreeLayout {
    pub body: Rect,
    pub title_width: usize,
}

/// Main application state
pub struct App {
    pub store: Box<dyn DataStore>,
    pub schema: Schema,
    pub lookups: Vec<LookupSet>,
    pub config: ConsoleConfig,
    pub theme: Theme,
    pub mode: Mode,
    pub should_quit: bool,
    /// The root console scope; always present
    pub root: ScopeState,
    /// Flow drill-down stack; the last entry (or `root`) is the active scope
    pub stack: Vec<ScopeState>,
    /// Inline tree-cell editor (the detail surface owns its own)
    pub editor: CellEditor,
    pub detail: Option<DetailState>,
    /// Fields of the last dispatched full-payload detail save
    pub pending_detail_save: Option<IndexMap<String, FieldValue>>,
    pub confirm: Option<ConfirmAction>,
    pub bulk_picker: Option<BulkPicker>,
    pub status_message: Option<String>,
    /// Screen region of the cell being edited inline, for the
    /// outside-click dismissal check
    pub editing_cell_rect: Option<Rect>,
    pub tree_layout: Option<TreeLayout>,
    /// Remembered expand-all preference. Persisted as-is; on large trees
    /// it is stored without being applied, and only an explicit toggle
    /// changes it.
    pub expand_all_pref: bool,
    pub state_dir: PathBuf,
}

impl App {
    pub fn new(
        store: Box<dyn DataStore>,
        schema: Schema,
        lookups: Vec<LookupSet>,
        roots: Vec<Task>,
        config: ConsoleConfig,
        state_dir: PathBuf,
    ) -> Self {
        let theme = Theme::from_config(&config.ui);
        let search_window = Duration::from_millis(config.behavior.search_debounce_ms);
        let mut app = App {
            store,
            schema,
            lookups,
            theme,
            mode: Mode::Navigate,
            should_quit: false,
            root: ScopeState::new(None, roots),
            stack: Vec::new(),
            editor: CellEditor::new(search_window),
            detail: None,
            pending_detail_save: None,
            confirm: None,
            bulk_picker: None,
            status_message: None,
            editing_cell_rect: None,
            tree_layout: None,
            expand_all_pref: false,
            state_dir,
            config,
        };
        app.restore_ui_state();
        app
    }

    fn restore_ui_state(&mut self) {
        let Some(state) = read_ui_state(&self.state_dir) else {
            return;
        };
        // The remembered preference is not auto-applied on large trees —
        // still stored, just not eagerly expanded.
        self.expand_all_pref = state.expand_all;
        let threshold = self.config.behavior.expand_all_auto_threshold;
        let scope = &mut self.root;
        if state.expand_all && scope.tree.root_count() <= threshold {
            let effects = scope.expansion.set_expand_all(true, &scope.tree);
            self.dispatch_effects(effects);
        }
    }

    pub fn save_ui_state(&self) {
        let state = UiState {
            expand_all: self.expand_all_pref,
            last_scope: self
                .scope()
                .scope
                .clone()
                .unwrap_or_default(),
        };
        let _ = write_ui_state(&self.state_dir, &state);
    }

    // --- scope access ---

    pub fn scope(&self) -> &ScopeState {
        self.stack.last().unwrap_or(&self.root)
    }

    pub fn scope_mut(&mut self) -> &mut ScopeState {
        self.stack.last_mut().unwrap_or(&mut self.root)
    }

    fn all_scopes_mut(&mut self) -> impl Iterator<Item = &mut ScopeState> {
        std::iter::once(&mut self.root).chain(self.stack.iter_mut())
    }

    pub fn visible_rows(&self) -> Vec<Row> {
        let scope = self.scope();
        scope.tree.visible_rows(&scope.expansion)
    }

    pub fn cursor_row(&self) -> Option<Row> {
        let rows = self.visible_rows();
        rows.get(self.scope().cursor).cloned()
    }

    pub fn clamp_cursor(&mut self) {
        let len = self.visible_rows().len();
        let scope = self.scope_mut();
        if len == 0 {
            scope.cursor = 0;
        } else {
            scope.cursor = scope.cursor.min(len - 1);
        }
    }

    /// Visible schema fields, in order — the tree columns
    pub fn columns(&self) -> Vec<FieldDescriptor> {
        self.schema.visible_fields().cloned().collect()
    }

    pub fn current_column(&self) -> Option<FieldDescriptor> {
        self.columns().get(self.scope().col).cloned()
    }

    pub fn lookup_options(&self, desc: &FieldDescriptor) -> Vec<LookupOption> {
        let set_id = match desc.field_type {
            FieldType::Select => desc.lookup_set.as_deref(),
            FieldType::Reference if !desc.searchable => desc.reference_collection.as_deref(),
            _ => None,
        };
        set_id
            .and_then(|id| self.lookups.iter().find(|s| s.id == id))
            .map(|s| s.options.clone())
            .unwrap_or_default()
    }

    pub fn lookup_display(&self, set_id: &str, code: &str) -> Option<String> {
        self.lookups
            .iter()
            .find(|s| s.id == set_id)
            .and_then(|s| s.display_name(code))
            .map(str::to_string)
    }

    // --- expansion ---

    pub fn toggle_expansion(&mut self, id: &str) {
        let scope = self.scope_mut();
        let effects = scope.expansion.toggle(id, &scope.tree);
        self.dispatch_effects(effects);
    }

    pub fn toggle_expand_all(&mut self) {
        let scope = self.scope_mut();
        let enable = !scope.expansion.expand_all_active();
        let effects = scope.expansion.set_expand_all(enable, &scope.tree);
        self.dispatch_effects(effects);
        // The persisted preference tracks the root console only; a flow
        // drill-down toggle does not rewrite it.
        if self.stack.is_empty() {
            self.expand_all_pref = enable;
        }
        self.save_ui_state();
        self.clamp_cursor();
    }

    pub fn dispatch_effects(&mut self, effects: Vec<ExpandEffect>) {
        for effect in effects {
            match effect {
                ExpandEffect::FetchChildren(id) => {
                    self.scope_mut().tree.mark_fetch_pending(&id);
                    self.store.request_children(&id);
                }
                ExpandEffect::OpenFlowView(id) => self.open_flow_scope(&id),
            }
        }
    }

    /// Flow tasks drill into a dedicated scoped view; children arrive via
    /// the same lazy fetch path.
    fn open_flow_scope(&mut self, id: &str) {
        self.stack.push(ScopeState::new(Some(id.to_string()), Vec::new()));
        self.store.request_children(id);
    }

    /// Pop back out of a flow drill-down
    pub fn pop_scope(&mut self) {
        self.stack.pop();
    }

    /// Retry a failed child fetch for the cursor row
    pub fn retry_fetch(&mut self) {
        if let Some(row) = self.cursor_row()
            && self.scope().tree.fetch_failed(&row.id)
        {
            self.scope_mut().tree.mark_fetch_pending(&row.id);
            self.store.request_children(&row.id);
        }
    }

    // --- inline cell editing (tree view) ---

    /// Activate the cell under the cursor. Single-cell edits save
    /// immediately on commit; booleans commit right here.
    pub fn activate_cursor_cell(&mut self) {
        let Some(row) = self.cursor_row() else { return };
        let Some(desc) = self.current_column() else { return };
        let Some(task) = self.scope().tree.get(&row.id) else { return };
        let current = task.field(&desc.field_path);
        let options = self.lookup_options(&desc);
        if let Some((_, cmd)) = self.editor.activate(&desc, current, options) {
            if let Some(cmd) = cmd {
                self.dispatch_cell_command(&row.id, cmd);
            } else {
                self.mode = Mode::Edit;
            }
        }
    }

    pub fn dispatch_cell_command(&mut self, task_id: &str, cmd: CellCommand) {
        match cmd {
            CellCommand::Save { field_path, value } => {
                let mut fields = IndexMap::new();
                fields.insert(field_path, value);
                self.store.request_update_one(task_id, fields);
            }
            CellCommand::Search {
                collection,
                query,
            } => {
                self.store.request_search(&collection, &query, 10);
            }
        }
    }

    /// The task id whose cell (tree or detail surface) is being edited
    pub fn editing_task_id(&self) -> Option<String> {
        if let Some(detail) = &self.detail
            && detail.editor.is_open()
        {
            return Some(detail.task_id.clone());
        }
        if self.editor.is_open() {
            return self.cursor_row().map(|r| r.id);
        }
        None
    }

    // --- detail surface ---

    pub fn open_detail(&mut self, task_id: &str) {
        let Some(task) = self.scope().tree.get(task_id) else {
            return;
        };
        let draft: IndexMap<String, FieldValue> = self
            .schema
            .editable_fields()
            .map(|d| (d.field_path.clone(), task.field(&d.field_path)))
            .collect();
        let window = Duration::from_millis(self.config.behavior.autosave_debounce_ms);
        let search_window = Duration::from_millis(self.config.behavior.search_debounce_ms);
        self.detail = Some(DetailState {
            task_id: task_id.to_string(),
            field_cursor: 0,
            scroll_offset: 0,
            autosave: AutosaveScheduler::open(task_id, &draft, window),
            draft,
            editor: CellEditor::new(search_window),
            field_error: None,
        });
    }

    /// Close the detail editor, flushing any pending debounced save —
    /// an edit made just before closing is never dropped.
    pub fn close_detail(&mut self) {
        if let Some(mut detail) = self.detail.take() {
            if let Some(payload) = detail.autosave.flush(&detail.draft) {
                self.pending_detail_save = Some(payload.fields.clone());
                self.store
                    .request_update_one(&payload.entity_id, payload.fields);
            }
        }
        self.mode = Mode::Navigate;
    }

    /// Apply a committed detail-field edit to the draft and route it to
    /// the right save path: status narrow-saves immediately, title saves
    /// on commit through the full-payload path, everything else arms the
    /// debounce.
    pub fn detail_field_committed(&mut self, field_path: &str, value: FieldValue, now: Instant) {
        let Some(detail) = &mut self.detail else { return };
        detail.draft.insert(field_path.to_string(), value.clone());
        if let Some((f, _)) = &detail.field_error
            && f == field_path
        {
            detail.field_error = None;
        }

        match field_path {
            // Operationally significant: its own single-field update, no timer
            "status" => {
                let task_id = detail.task_id.clone();
                detail.autosave.sync_snapshot(&detail.draft);
                let mut fields = IndexMap::new();
                fields.insert("status".to_string(), value);
                self.store.request_update_one(&task_id, fields);
            }
            // Most likely the last thing edited before closing
            "title" => {
                if let Some(payload) = detail.autosave.immediate(&detail.draft) {
                    self.pending_detail_save = Some(payload.fields.clone());
                    self.store
                        .request_update_one(&payload.entity_id, payload.fields);
                }
            }
            _ => detail.autosave.note_change(now),
        }
    }

    // --- bulk operations ---

    pub fn begin_bulk(&mut self, action: BulkAction) {
        if action.is_delete() {
            let ids = self.scope().selection.ids();
            if ids.is_empty() {
                return;
            }
            self.confirm = Some(ConfirmAction::BulkDelete { ids });
            self.mode = Mode::Confirm;
            return;
        }

        let Some(pending) = self.scope_mut().selection.begin_bulk(action) else {
            return;
        };
        if let Some(fields) = pending.action.fields() {
            self.store.request_update_many(&pending.ids, fields);
        }
    }

    /// Confirmed delete: capture through the selection controller so the
    /// resolution path (clear-on-success) is the same as other batches.
    pub fn dispatch_confirmed_delete(&mut self) {
        let Some(ConfirmAction::BulkDelete { .. }) = self.confirm.take() else {
            return;
        };
        if let Some(pending) = self.scope_mut().selection.begin_bulk(BulkAction::Delete) {
            self.store.request_delete_many(&pending.ids);
        }
        self.mode = Mode::Select;
    }

    // --- data event application ---

    pub fn apply_data_event(&mut self, event: DataEvent) {
        match event {
            DataEvent::ChildrenLoaded { parent, result } => {
                self.apply_children_loaded(&parent, result);
            }
            DataEvent::TaskSaved { id, result } => self.apply_task_saved(&id, result),
            DataEvent::BulkUpdated { ids, result } => self.apply_bulk_updated(&ids, result),
            DataEvent::BulkDeleted { ids, result } => self.apply_bulk_deleted(&ids, result),
            DataEvent::SearchResults { query, result, .. } => {
                let results: Vec<(String, String)> = match result {
                    Ok(tasks) => tasks.into_iter().map(|t| (t.id, t.title)).collect(),
                    Err(_) => Vec::new(),
                };
                if let Some(detail) = &mut self.detail {
                    detail.editor.search_results(&query, results);
                } else {
                    self.editor.search_results(&query, results);
                }
            }
        }
    }

    fn apply_children_loaded(&mut self, parent: &str, result: Result<Vec<Task>, RemoteError>) {
        match result {
            Ok(tasks) => {
                for scope in self.all_scopes_mut() {
                    if scope.scope.as_deref() == Some(parent) && scope.tree.root_count() == 0 {
                        scope.tree = TreeStore::new(tasks.clone());
                    }
                }
                let mut effects = Vec::new();
                {
                    let scope = self.scope_mut();
                    if scope.tree.get(parent).is_some() {
                        scope.tree.insert_children(parent, tasks);
                        effects = scope.expansion.children_loaded(parent, &scope.tree);
                        scope.expansion.recompute_flag(&scope.tree);
                    }
                }
                self.dispatch_effects(effects);
            }
            Err(e) => {
                // Node stays expanded in a retryable empty state; the
                // render path never sees the error itself.
                for scope in self.all_scopes_mut() {
                    if scope.tree.get(parent).is_some() {
                        scope.tree.mark_fetch_failed(parent);
                    }
                }
                self.status_message = Some(format!("fetch failed: {e}"));
            }
        }
    }

    fn apply_task_saved(&mut self, id: &str, result: Result<Task, RemoteError>) {
        match result {
            Ok(task) => {
                for scope in self.all_scopes_mut() {
                    if scope.tree.get(id).is_some() {
                        scope.tree.apply_saved(task.clone());
                    }
                }
                self.editor.commit_resolved(true);
                if self.mode == Mode::Edit && !self.editor.is_open() && self.detail.is_none() {
                    self.mode = Mode::Navigate;
                }
                if let Some(detail) = &mut self.detail {
                    detail.editor.commit_resolved(true);
                    if detail.task_id == id
                        && let Some(fields) = self.pending_detail_save.take()
                    {
                        detail.autosave.save_succeeded(&fields);
                    }
                }
            }
            Err(e) => {
                // The candidate stays visible so re-committing retries
                self.editor.commit_resolved(false);
                if let Some(detail) = &mut self.detail {
                    detail.editor.commit_resolved(false);
                    if let RemoteError::ValidationRejected { field, message } = &e {
                        detail.field_error = Some((field.clone(), message.clone()));
                    }
                }
                if self.detail.as_ref().is_some_and(|d| d.task_id == id) {
                    self.pending_detail_save = None;
                }
                self.status_message = Some(format!("{e}"));
            }
        }
    }

    fn apply_bulk_updated(&mut self, ids: &[String], result: Result<(), RemoteError>) {
        let success = result.is_ok();
        let scope = self.scope_mut();
        let matched = scope
            .selection
            .bulk_in_flight()
            .filter(|p| p.ids == ids)
            .and_then(|p| p.action.fields());
        if let Some(fields) = matched {
            if success {
                scope.tree.apply_fields(ids, &fields);
            }
            scope.selection.bulk_resolved(success);
        }
        if let Err(e) = result {
            self.status_message = Some(format!("{e}"));
        }
    }

    fn apply_bulk_deleted(&mut self, ids: &[String], result: Result<(), RemoteError>) {
        let success = result.is_ok();
        for scope in self.all_scopes_mut() {
            if success {
                scope.tree.remove_many(ids);
            }
        }
        let scope = self.scope_mut();
        if scope.selection.bulk_in_flight().is_some() {
            scope.selection.bulk_resolved(success);
        }
        if let Err(e) = result {
            self.status_message = Some(format!("{e}"));
        } else {
            self.clamp_cursor();
        }
    }

    // --- timers ---

    /// Drive the debounced paths: detail autosave and reference search
    pub fn poll_timers(&mut self, now: Instant) {
        if let Some(detail) = &mut self.detail {
            if let Some(payload) = detail.autosave.poll(now, &detail.draft) {
                self.pending_detail_save = Some(payload.fields.clone());
                self.store
                    .request_update_one(&payload.entity_id, payload.fields);
            }
            if let Some(cmd) = detail.editor.poll_search(now) {
                let task_id = detail.task_id.clone();
                self.dispatch_cell_command(&task_id, cmd);
            }
        }
        if let Some(cmd) = self.editor.poll_search(now) {
            if let Some(row) = self.cursor_row() {
                self.dispatch_cell_command(&row.id, cmd);
            }
        }
    }

    /// A pointer press at (x, y). A press outside the editing cell
    /// dismisses inline editors (overlay editors keep their own close
    /// events); otherwise a press on a tree cell places the cursor there
    /// and activates it.
    pub fn pointer_down(&mut self, x: u16, y: u16) {
        let inside = self
            .editing_cell_rect
            .is_some_and(|r| x >= r.x && x < r.x + r.width && y >= r.y && y < r.y + r.height);
        if inside {
            return;
        }
        let cancelled = if let Some(detail) = &mut self.detail {
            detail.editor.outside_click()
        } else {
            self.editor.outside_click()
        };
        if cancelled {
            if self.mode == Mode::Edit {
                self.mode = Mode::Navigate;
            }
            return;
        }

        if self.mode != Mode::Navigate || self.detail.is_some() {
            return;
        }
        let Some(layout) = self.tree_layout else { return };
        let body = layout.body;
        if x < body.x || x >= body.x + body.width || y < body.y || y >= body.y + body.height {
            return;
        }
        let idx = self.scope().scroll_offset + (y - body.y) as usize;
        if idx >= self.visible_rows().len() {
            return;
        }
        let col = render::tree_view::column_at(
            (x - body.x) as usize,
            self.columns().len(),
            layout.title_width,
        );
        {
            let scope = self.scope_mut();
            scope.cursor = idx;
            scope.col = col;
        }
        self.activate_cursor_cell();
    }
}

/// Run the console
pub fn run(
    store: Box<dyn DataStore>,
    schema: Schema,
    lookups: Vec<LookupSet>,
    roots: Vec<Task>,
    config: ConsoleConfig,
    state_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(store, schema, lookups, roots, config, state_dir);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, event::EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, event::DisableMouseCapture);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app);

    app.save_ui_state();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    input::handle_key(app, key);
                }
                Event::Mouse(mouse) => {
                    if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                        app.pointer_down(mouse.column, mouse.row);
                    }
                }
                _ => {}
            }
        }

        // Collaborator completions and debounce deadlines, every tick
        while let Some(event) = app.store.poll_event() {
            app.apply_data_event(event);
        }
        app.poll_timers(Instant::now());

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::{MemoryStore, default_lookups, default_schema, sample_store};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn console(store: MemoryStore, dir: &TempDir, threshold: usize) -> App {
        let roots = store.roots();
        let mut config = ConsoleConfig::default();
        config.behavior.expand_all_auto_threshold = threshold;
        App::new(
            Box::new(store),
            default_schema(),
            default_lookups(),
            roots,
            config,
            dir.path().to_path_buf(),
        )
    }

    fn drain(app: &mut App) {
        while let Some(event) = app.store.poll_event() {
            app.apply_data_event(event);
        }
    }

    fn tree_layout() -> TreeLayout {
        TreeLayout {
            body: Rect {
                x: 0,
                y: 1,
                width: 120,
                height: 20,
            },
            title_width: 40,
        }
    }

    #[test]
    fn expand_all_preference_survives_a_session_over_a_large_tree() {
        let dir = TempDir::new().unwrap();
        let stored = UiState {
            expand_all: true,
            last_scope: String::new(),
        };
        write_ui_state(dir.path(), &stored).unwrap();

        // Root count above the threshold: stored preference is not applied
        let app = console(sample_store(), &dir, 1);
        assert!(!app.root.expansion.expand_all_active());

        // A session that never toggles must not rewrite the preference
        app.save_ui_state();
        assert!(read_ui_state(dir.path()).unwrap().expand_all);
    }

    #[test]
    fn toggling_expand_all_rewrites_the_stored_preference() {
        let dir = TempDir::new().unwrap();
        let mut app = console(sample_store(), &dir, 200);

        app.toggle_expand_all();
        assert!(read_ui_state(dir.path()).unwrap().expand_all);

        app.toggle_expand_all();
        assert!(!read_ui_state(dir.path()).unwrap().expand_all);
    }

    #[test]
    fn click_places_the_cursor_and_opens_the_cell_editor() {
        let dir = TempDir::new().unwrap();
        let mut app = console(sample_store(), &dir, 200);
        app.tree_layout = Some(tree_layout());

        app.pointer_down(5, 1);

        assert_eq!(app.scope().cursor, 0);
        assert_eq!(app.scope().col, 0);
        assert_eq!(app.mode, Mode::Edit);
        let session = app.editor.session().expect("editor open");
        assert_eq!(session.buffer, "Quarterly onboarding review");
    }

    #[test]
    fn click_on_a_select_cell_opens_the_picker() {
        let dir = TempDir::new().unwrap();
        let mut app = console(sample_store(), &dir, 200);
        app.tree_layout = Some(tree_layout());

        // Third row, first column right of the title
        app.pointer_down(43, 3);

        assert_eq!(app.scope().cursor, 2);
        assert_eq!(app.scope().col, 1);
        let session = app.editor.session().expect("editor open");
        let picker = session.picker.as_ref().expect("picker open");
        assert_eq!(picker.options.len(), 5);
    }

    #[test]
    fn click_outside_the_tree_body_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut app = console(sample_store(), &dir, 200);
        app.tree_layout = Some(tree_layout());

        app.pointer_down(5, 0); // header line
        app.pointer_down(5, 10); // below the last row

        assert_eq!(app.mode, Mode::Navigate);
        assert!(!app.editor.is_open());
        assert_eq!(app.scope().cursor, 0);
    }

    #[test]
    fn validation_rejection_sets_and_clears_the_field_error() {
        let dir = TempDir::new().unwrap();
        let mut store = sample_store();
        store.reject_next_save("status", "unknown status code");
        let mut app = console(store, &dir, 200);

        app.open_detail("T-001");
        app.detail_field_committed("status", FieldValue::Text("bogus".into()), Instant::now());
        drain(&mut app);
        assert_eq!(
            app.detail.as_ref().and_then(|d| d.field_error.clone()),
            Some(("status".to_string(), "unknown status code".to_string()))
        );

        // Committing the field again clears the message; the save lands
        app.detail_field_committed("status", FieldValue::Text("blocked".into()), Instant::now());
        drain(&mut app);
        assert!(app.detail.as_ref().is_some_and(|d| d.field_error.is_none()));
    }
}
