use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};

use crate::engine::CellCommand;
use crate::tui::app::{App, Mode};

/// Keys while a cell editor is open (tree cell or detail field)
pub(super) fn handle_edit(app: &mut App, key: KeyEvent) {
    let in_detail = app.detail.is_some();
    match key.code {
        KeyCode::Esc => {
            active_cancel(app);
            if !active_is_open(app) {
                app.mode = Mode::Navigate;
            }
        }
        // Enter commits the buffer, or picks the highlighted option —
        // picking commits and exits in one step.
        KeyCode::Enter => {
            if in_detail {
                commit_detail(app);
            } else {
                commit_tree_cell(app);
            }
        }
        // Tab behaves as blur: same single commit path
        KeyCode::Tab => {
            if in_detail {
                commit_detail(app);
            } else {
                commit_tree_cell(app);
            }
        }
        KeyCode::Up => active_picker_move(app, -1),
        KeyCode::Down => active_picker_move(app, 1),
        KeyCode::Left => with_active(app, |e| e.move_left()),
        KeyCode::Right => with_active(app, |e| e.move_right()),
        KeyCode::Home => with_active(app, |e| e.move_home()),
        KeyCode::End => with_active(app, |e| e.move_end()),
        KeyCode::Backspace => {
            let now = Instant::now();
            with_active(app, |e| {
                e.backspace();
                e.note_search_input(now);
            });
        }
        KeyCode::Char(c) => {
            let now = Instant::now();
            with_active(app, |e| {
                e.insert_char(c);
                e.note_search_input(now);
            });
        }
        _ => {}
    }
}

fn with_active(app: &mut App, f: impl FnOnce(&mut crate::engine::CellEditor)) {
    match &mut app.detail {
        Some(detail) => f(&mut detail.editor),
        None => f(&mut app.editor),
    }
}

fn active_is_open(app: &App) -> bool {
    match &app.detail {
        Some(detail) => detail.editor.is_open(),
        None => app.editor.is_open(),
    }
}

fn active_cancel(app: &mut App) {
    with_active(app, |e| e.cancel());
}

fn active_picker_move(app: &mut App, delta: isize) {
    with_active(app, |e| e.picker_move(delta));
}

fn active_has_options(app: &App) -> bool {
    let session = match &app.detail {
        Some(detail) => detail.editor.session(),
        None => app.editor.session(),
    };
    session.is_some_and(|s| s.picker.is_some() || s.search.is_some())
}

/// Commit the tree-view inline editor. Single-cell edits save
/// immediately; the editor stays in Committing until the store resolves.
fn commit_tree_cell(app: &mut App) {
    let Some(row) = app.cursor_row() else { return };
    let cmd = if active_has_options(app) {
        app.editor.pick()
    } else {
        app.editor.commit()
    };
    if let Some(cmd) = cmd {
        app.dispatch_cell_command(&row.id, cmd);
    }
}

/// Commit a detail-field editor. Persistence belongs to the autosave
/// scheduler (or the title/status exception paths), so the session
/// closes as soon as the draft is updated.
fn commit_detail(app: &mut App) {
    let cmd = {
        let Some(detail) = &mut app.detail else { return };
        if active_session_has_options(detail) {
            detail.editor.pick()
        } else {
            detail.editor.commit()
        }
    };
    let Some(CellCommand::Save { field_path, value }) = cmd else {
        return;
    };
    if let Some(detail) = &mut app.detail {
        detail.editor.commit_resolved(true);
    }
    app.detail_field_committed(&field_path, value, Instant::now());
    app.mode = Mode::Navigate;
}

fn active_session_has_options(detail: &crate::tui::app::DetailState) -> bool {
    detail
        .editor
        .session()
        .is_some_and(|s| s.picker.is_some() || s.search.is_some())
}
