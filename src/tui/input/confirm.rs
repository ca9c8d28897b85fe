use crossterm::event::{KeyCode, KeyEvent};

use crate::tui::app::{App, Mode};

/// Delete is irreversible: dispatch only on an explicit `y`
pub(super) fn handle_confirm(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') => app.dispatch_confirmed_delete(),
        KeyCode::Char('n') | KeyCode::Esc => {
            app.confirm = None;
            app.mode = Mode::Select;
        }
        _ => {}
    }
}
