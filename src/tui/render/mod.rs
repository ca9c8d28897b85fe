pub mod detail_view;
pub mod helpers;
pub mod status_row;
pub mod tree_view;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::app::{App, ConfirmAction};
use helpers::centered_rect;

/// Main render function — dispatches to sub-renderers
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    // Layout: header (1 row) | content | status row (1 row)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, app, chunks[0]);

    app.editing_cell_rect = None;
    app.tree_layout = None;
    if app.detail.is_some() {
        detail_view::render_detail_view(frame, app, chunks[1]);
    } else {
        tree_view::render_tree_view(frame, app, chunks[1]);
    }

    status_row::render_status_row(frame, app, chunks[2]);

    if app.bulk_picker.is_some() {
        render_bulk_picker(frame, app, area);
    }
    if let Some(ConfirmAction::BulkDelete { ids }) = &app.confirm {
        render_delete_confirm(frame, app, area, ids.len());
    }
}

fn render_header(frame: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let bg = app.theme.background;
    let scope_label = match &app.scope().scope {
        Some(id) => format!(" flow: {id}"),
        None => " tasks".to_string(),
    };
    let mut spans = vec![Span::styled(
        scope_label,
        Style::default()
            .fg(app.theme.text_bright)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )];
    if app.scope().expansion.expand_all_active() {
        spans.push(Span::styled(
            "  [all expanded]",
            Style::default().fg(app.theme.dim).bg(bg),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)), area);
}

fn render_bulk_picker(frame: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let Some(picker) = &app.bulk_picker else { return };
    let title = match picker.kind {
        super::app::BulkPickerKind::Status => " set status ",
        super::app::BulkPickerKind::Urgency => " set urgency ",
        super::app::BulkPickerKind::Assignee => " set assignee ",
    };
    let height = (picker.options.len() as u16 + 2).min(area.height);
    let popup = centered_rect(30, height, area);
    frame.render_widget(Clear, popup);

    let mut lines = Vec::new();
    for (i, opt) in picker.options.iter().enumerate() {
        let style = if i == picker.cursor {
            Style::default()
                .fg(app.theme.text_bright)
                .bg(app.theme.selection_bg)
        } else {
            Style::default().fg(app.theme.text)
        };
        lines.push(Line::from(Span::styled(
            format!(" {} ", opt.display_name),
            style,
        )));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(Style::default().bg(app.theme.background).fg(app.theme.header));
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn render_delete_confirm(frame: &mut Frame, app: &App, area: ratatui::layout::Rect, count: usize) {
    let popup = centered_rect(44, 5, area);
    frame.render_widget(Clear, popup);
    let noun = if count == 1 { "task" } else { "tasks" };
    let lines = vec![
        Line::from(Span::styled(
            format!(" Delete {count} {noun}? This cannot be undone."),
            Style::default().fg(app.theme.text_bright),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " y confirm   n cancel",
            Style::default().fg(app.theme.dim),
        )),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" confirm delete ")
        .style(Style::default().bg(app.theme.background).fg(app.theme.red));
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}
