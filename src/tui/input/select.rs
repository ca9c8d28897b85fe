use crossterm::event::{KeyCode, KeyEvent};

use crate::engine::BulkAction;
use crate::tui::app::{App, BulkPicker, BulkPickerKind, Mode};

pub(super) fn handle_select(app: &mut App, key: KeyEvent) {
    if app.bulk_picker.is_some() {
        handle_bulk_picker(app, key);
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.scope_mut().selection.clear();
            app.mode = Mode::Navigate;
        }
        KeyCode::Char('j') | KeyCode::Down => move_cursor(app, 1),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(app, -1),
        KeyCode::Char('x') | KeyCode::Char(' ') => {
            if let Some(row) = app.cursor_row() {
                app.scope_mut().selection.toggle_one(&row.id);
            }
        }
        // Select every rendered root row, or clear if all are selected
        KeyCode::Char('a') => {
            let rows = app.visible_rows();
            app.scope_mut().selection.toggle_all(&rows);
        }
        KeyCode::Char('s') => open_bulk_picker(app, BulkPickerKind::Status, "statuses"),
        KeyCode::Char('u') => open_bulk_picker(app, BulkPickerKind::Urgency, "urgencies"),
        KeyCode::Char('@') => open_bulk_picker(app, BulkPickerKind::Assignee, "users"),
        KeyCode::Char('A') => app.begin_bulk(BulkAction::Archive),
        KeyCode::Char('D') => app.begin_bulk(BulkAction::Delete),
        _ => {}
    }
}

fn move_cursor(app: &mut App, delta: isize) {
    let len = app.visible_rows().len();
    if len == 0 {
        return;
    }
    let scope = app.scope_mut();
    let next = scope.cursor as isize + delta;
    scope.cursor = next.clamp(0, len as isize - 1) as usize;
}

fn open_bulk_picker(app: &mut App, kind: BulkPickerKind, set_id: &str) {
    if app.scope().selection.is_empty() {
        return;
    }
    let options = app
        .lookups
        .iter()
        .find(|s| s.id == set_id)
        .map(|s| s.options.clone())
        .unwrap_or_default();
    if options.is_empty() {
        return;
    }
    app.bulk_picker = Some(BulkPicker {
        kind,
        options,
        cursor: 0,
    });
}

fn handle_bulk_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.bulk_picker = None,
        KeyCode::Char('j') | KeyCode::Down => picker_move(app, 1),
        KeyCode::Char('k') | KeyCode::Up => picker_move(app, -1),
        KeyCode::Enter => {
            let Some(picker) = app.bulk_picker.take() else { return };
            let Some(option) = picker.options.get(picker.cursor) else {
                return;
            };
            let action = match picker.kind {
                BulkPickerKind::Status => BulkAction::SetStatus(option.code.clone()),
                BulkPickerKind::Urgency => BulkAction::SetUrgency(option.code.clone()),
                BulkPickerKind::Assignee => BulkAction::SetAssignee(Some(option.code.clone())),
            };
            app.begin_bulk(action);
        }
        _ => {}
    }
}

fn picker_move(app: &mut App, delta: isize) {
    if let Some(picker) = &mut app.bulk_picker {
        let len = picker.options.len() as isize;
        if len > 0 {
            picker.cursor = (picker.cursor as isize + delta).rem_euclid(len) as usize;
        }
    }
}
