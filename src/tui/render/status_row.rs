use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::{App, Mode};

/// Render the status row (bottom of screen)
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;

    let mut spans: Vec<Span> = Vec::new();

    if let Some(message) = &app.status_message {
        spans.push(Span::styled(
            format!(" {message}"),
            Style::default().fg(app.theme.yellow).bg(bg),
        ));
    } else {
        match app.mode {
            Mode::Navigate => {
                if app
                    .detail
                    .as_ref()
                    .is_some_and(|d| d.autosave.save_pending())
                {
                    spans.push(Span::styled(
                        " saving…",
                        Style::default().fg(app.theme.dim).bg(bg),
                    ));
                }
            }
            Mode::Edit => {
                spans.push(Span::styled(
                    " EDIT",
                    Style::default().fg(app.theme.green).bg(bg),
                ));
                spans.push(Span::styled(
                    "  Enter commit · Esc cancel",
                    Style::default().fg(app.theme.dim).bg(bg),
                ));
            }
            Mode::Select => {
                let count = app.scope().selection.count();
                spans.push(Span::styled(
                    format!(" SELECT ({count})"),
                    Style::default().fg(app.theme.cyan).bg(bg),
                ));
                spans.push(Span::styled(
                    "  x toggle · a all · s status · u urgency · @ assignee · A archive · D delete",
                    Style::default().fg(app.theme.dim).bg(bg),
                ));
            }
            Mode::Confirm => {
                spans.push(Span::styled(
                    " CONFIRM",
                    Style::default().fg(app.theme.red).bg(bg),
                ));
            }
        }
    }

    let content_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    if content_width < width {
        spans.push(Span::styled(
            " ".repeat(width - content_width),
            Style::default().bg(bg),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)), area);
}
