use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::FieldType;
use crate::tui::app::{App, Mode};

use super::helpers::fit_to_width;

const LABEL_WIDTH: usize = 16;

/// Render the detail-editing surface for the open entity
pub fn render_detail_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let columns: Vec<_> = app.schema.editable_fields().cloned().collect();
    let Some(detail) = &app.detail else { return };

    let bg = app.theme.background;
    let mut lines: Vec<Line> = Vec::new();

    let title = detail
        .draft
        .get("title")
        .map(|v| v.display())
        .unwrap_or_default();
    lines.push(Line::from(Span::styled(
        format!(" {} — {}", detail.task_id, title),
        Style::default()
            .fg(app.theme.text_bright)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));

    let editing = app.mode == Mode::Edit && detail.editor.is_open();
    let mut edit_line: Option<usize> = None;
    for (i, desc) in columns.iter().enumerate() {
        let is_cursor = i == detail.field_cursor;
        let label_style = if is_cursor {
            Style::default()
                .fg(app.theme.text_bright)
                .bg(bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.header).bg(bg)
        };
        let marker = if is_cursor { "▸ " } else { "  " };
        let label = fit_to_width(&desc.field_path, LABEL_WIDTH);

        let mut spans = vec![
            Span::styled(marker.to_string(), label_style),
            Span::styled(label, label_style),
        ];

        if is_cursor && editing {
            edit_line = Some(lines.len());
            spans.push(editor_span(app, detail));
        } else {
            let value = detail
                .draft
                .get(&desc.field_path)
                .cloned()
                .unwrap_or_default();
            let display = match desc.field_type {
                FieldType::Select => {
                    let code = value.display();
                    desc.lookup_set
                        .as_deref()
                        .and_then(|s| app.lookup_display(s, &code))
                        .unwrap_or(code)
                }
                FieldType::Reference if !desc.searchable => {
                    let code = value.display();
                    desc.reference_collection
                        .as_deref()
                        .and_then(|c| app.lookup_display(c, &code))
                        .unwrap_or(code)
                }
                _ => value.display(),
            };
            spans.push(Span::styled(display, Style::default().fg(app.theme.text).bg(bg)));
        }
        lines.push(Line::from(spans));

        // Field-local validation message
        if let Some((field, message)) = &detail.field_error
            && field == &desc.field_path
        {
            lines.push(Line::from(Span::styled(
                format!("  {}{}", " ".repeat(LABEL_WIDTH), message),
                Style::default().fg(app.theme.red).bg(bg),
            )));
        }

        // Picker options and search results render inline under the field
        if is_cursor && editing {
            push_option_lines(app, detail, &mut lines);
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Enter edit · Esc close (saves pending changes)",
        Style::default().fg(app.theme.dim).bg(bg),
    )));

    // Outside-click dismissal hit box for the field being edited
    if let Some(line) = edit_line {
        let x = area.x + 2 + LABEL_WIDTH as u16;
        app.editing_cell_rect = Some(Rect {
            x,
            y: area.y + line as u16,
            width: area.width.saturating_sub(2 + LABEL_WIDTH as u16),
            height: 1,
        });
    }

    let paragraph = Paragraph::new(lines).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

fn editor_span<'a>(app: &App, detail: &crate::tui::app::DetailState) -> Span<'a> {
    let Some(session) = detail.editor.session() else {
        return Span::raw("");
    };
    if session.picker.is_some() || session.search.is_some() {
        return Span::styled(
            "…".to_string(),
            Style::default().fg(app.theme.dim).bg(app.theme.background),
        );
    }
    Span::styled(
        format!("{}▌", session.buffer),
        Style::default()
            .fg(app.theme.text_bright)
            .bg(app.theme.edit_bg),
    )
}

fn push_option_lines(app: &App, detail: &crate::tui::app::DetailState, lines: &mut Vec<Line>) {
    let Some(session) = detail.editor.session() else { return };
    let indent = " ".repeat(LABEL_WIDTH + 2);

    if let Some(picker) = &session.picker {
        for (i, opt) in picker.options.iter().enumerate() {
            let style = if i == picker.cursor {
                Style::default()
                    .fg(app.theme.text_bright)
                    .bg(app.theme.selection_bg)
            } else {
                Style::default().fg(app.theme.text).bg(app.theme.background)
            };
            lines.push(Line::from(Span::styled(
                format!("{indent}{}", opt.display_name),
                style,
            )));
        }
    }

    if let Some(search) = &session.search {
        lines.push(Line::from(Span::styled(
            format!("{indent}search: {}▌", search.query),
            Style::default()
                .fg(app.theme.text_bright)
                .bg(app.theme.background),
        )));
        for (i, (id, title)) in search.results.iter().enumerate() {
            let style = if i == search.cursor {
                Style::default()
                    .fg(app.theme.text_bright)
                    .bg(app.theme.selection_bg)
            } else {
                Style::default().fg(app.theme.text).bg(app.theme.background)
            };
            lines.push(Line::from(Span::styled(
                format!("{indent}{id}  {title}"),
                style,
            )));
        }
    }
}
