use crossterm::event::{KeyCode, KeyEvent};

use crate::model::task::TaskKind;
use crate::tui::app::{App, Mode};

pub(super) fn handle_navigate(app: &mut App, key: KeyEvent) {
    if app.detail.is_some() {
        handle_detail_navigate(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => {
            app.save_ui_state();
            app.should_quit = true;
        }
        KeyCode::Char('j') | KeyCode::Down => move_cursor(app, 1),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(app, -1),
        KeyCode::Char('g') | KeyCode::Home => {
            app.scope_mut().cursor = 0;
        }
        KeyCode::Char('G') | KeyCode::End => {
            let len = app.visible_rows().len();
            app.scope_mut().cursor = len.saturating_sub(1);
        }
        KeyCode::Char('h') | KeyCode::Left => move_col(app, -1),
        KeyCode::Char('l') | KeyCode::Right => move_col(app, 1),
        KeyCode::Enter => activate_or_toggle(app),
        KeyCode::Char(' ') => toggle_row(app),
        KeyCode::Char('i') => app.activate_cursor_cell(),
        KeyCode::Char('o') => {
            if let Some(row) = app.cursor_row() {
                app.open_detail(&row.id);
            }
        }
        KeyCode::Char('E') => app.toggle_expand_all(),
        KeyCode::Char('r') => app.retry_fetch(),
        KeyCode::Char('v') | KeyCode::Char('x') => {
            if let Some(row) = app.cursor_row() {
                app.scope_mut().selection.toggle_one(&row.id);
                app.mode = Mode::Select;
            }
        }
        KeyCode::Esc | KeyCode::Backspace => {
            app.pop_scope();
            app.clamp_cursor();
        }
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

fn move_col(app: &mut App, delta: isize) {
    let cols = app.columns().len();
    if cols == 0 {
        return;
    }
    let scope = app.scope_mut();
    let next = scope.col as isize + delta;
    scope.col = next.clamp(0, cols as isize - 1) as usize;
}

/// Enter on the title column toggles expansion when a toggle affordance
/// is present (Flow rows drill into their scoped view); otherwise the
/// cell under the cursor activates.
fn activate_or_toggle(app: &mut App) {
    let Some(row) = app.cursor_row() else { return };
    if app.scope().col == 0 {
        let is_flow = app
            .scope()
            .tree
            .get(&row.id)
            .is_some_and(|t| t.kind == TaskKind::Flow);
        if is_flow || row.has_children {
            app.toggle_expansion(&row.id);
            app.clamp_cursor();
            return;
        }
    }
    app.activate_cursor_cell();
}

fn toggle_row(app: &mut App) {
    let Some(row) = app.cursor_row() else { return };
    if app.scope().col == 0 {
        app.toggle_expansion(&row.id);
        app.clamp_cursor();
    } else {
        app.activate_cursor_cell();
    }
}

/// Field-list navigation inside the detail surface
fn handle_detail_navigate(app: &mut App, key: KeyEvent) {
    let field_count = app.schema.editable_fields().count();
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.close_detail(),
        KeyCode::Char('j') | KeyCode::Down => {
            if field_count > 0
                && let Some(detail) = &mut app.detail
            {
                detail.field_cursor = (detail.field_cursor + 1).min(field_count - 1);
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(detail) = &mut app.detail {
                detail.field_cursor = detail.field_cursor.saturating_sub(1);
            }
        }
        KeyCode::Enter | KeyCode::Char('i') => activate_detail_field(app),
        _ => {}
    }
}

fn activate_detail_field(app: &mut App) {
    let Some(detail) = &app.detail else { return };
    let Some(desc) = app
        .schema
        .editable_fields()
        .nth(detail.field_cursor)
        .cloned()
    else {
        return;
    };
    let current = detail.draft.get(&desc.field_path).cloned().unwrap_or_default();
    let options = app.lookup_options(&desc);

    let activated = match &mut app.detail {
        Some(detail) => detail.editor.activate(&desc, current, options),
        None => return,
    };
    match activated {
        // Boolean: committed on activation; apply through the draft
        Some((_, Some(crate::engine::CellCommand::Save { field_path, value }))) => {
            if let Some(detail) = &mut app.detail {
                detail.editor.commit_resolved(true);
            }
            app.detail_field_committed(&field_path, value, std::time::Instant::now());
        }
        Some((_, _)) => app.mode = Mode::Edit,
        None => {}
    }
}
