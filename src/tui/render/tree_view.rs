use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::engine::Row;
use crate::model::FieldType;
use crate::model::schema::FieldDescriptor;
use crate::model::task::{Task, TaskKind};
use crate::tui::app::{App, Mode, TreeLayout};
use crate::tui::theme::parse_hex_color;

use super::helpers::{fit_to_width, truncate_to_width};

/// Fixed width for non-title columns
const COL_WIDTH: usize = 14;

/// Render the tree view content area
pub fn render_tree_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let rows = app.visible_rows();
    let columns = app.columns();

    // Adjust scroll for the cursor (header takes one line)
    let visible_height = (area.height as usize).saturating_sub(1);
    {
        let scope = app.scope_mut();
        let cursor = scope.cursor.min(rows.len().saturating_sub(1));
        scope.cursor = cursor;
        if cursor < scope.scroll_offset {
            scope.scroll_offset = cursor;
        } else if visible_height > 0 && cursor >= scope.scroll_offset + visible_height {
            scope.scroll_offset = cursor.saturating_sub(visible_height - 1);
        }
    }

    let title_width = title_column_width(&columns, area.width as usize);
    render_column_header(frame, app, area, &columns, title_width);

    let body = Rect {
        y: area.y + 1,
        height: area.height.saturating_sub(1),
        ..area
    };
    app.tree_layout = Some(TreeLayout { body, title_width });

    if rows.is_empty() {
        let msg = if app.scope().scope.is_some() {
            " loading…"
        } else {
            " no tasks"
        };
        let empty = Paragraph::new(msg)
            .style(Style::default().fg(app.theme.dim).bg(app.theme.background));
        frame.render_widget(empty, body);
        return;
    }

    let cursor = app.scope().cursor;
    let scroll = app.scope().scroll_offset;
    let end = rows.len().min(scroll + visible_height);

    let mut lines: Vec<Line> = Vec::with_capacity(visible_height);
    for (idx, row) in rows.iter().enumerate().take(end).skip(scroll) {
        lines.push(render_row(app, row, &columns, title_width, idx == cursor));
    }

    let paragraph = Paragraph::new(lines).style(Style::default().bg(app.theme.background));
    frame.render_widget(paragraph, body);

    // Inline editor bookkeeping and overlays for the cursor cell
    if app.editor.is_open() && app.mode == Mode::Edit {
        let row_y = body.y + (cursor - scroll) as u16;
        let (cell_x, cell_w) = column_offset(app.scope().col, title_width, area.x);
        app.editing_cell_rect = Some(Rect {
            x: cell_x,
            y: row_y,
            width: cell_w as u16,
            height: 1,
        });
        render_editor_overlay(frame, app, area, cell_x, row_y);
    }
}

fn title_column_width(columns: &[FieldDescriptor], total: usize) -> usize {
    let others = columns.len().saturating_sub(1) * COL_WIDTH;
    total.saturating_sub(others).max(20)
}

fn render_column_header(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    columns: &[FieldDescriptor],
    title_width: usize,
) {
    let mut spans = Vec::new();
    for (i, col) in columns.iter().enumerate() {
        let width = if i == 0 { title_width } else { COL_WIDTH };
        let style = if i == app.scope().col {
            Style::default()
                .fg(app.theme.text_bright)
                .bg(app.theme.background)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.header).bg(app.theme.background)
        };
        spans.push(Span::styled(fit_to_width(&col.field_path, width), style));
    }
    let header = Rect { height: 1, ..area };
    frame.render_widget(Paragraph::new(Line::from(spans)), header);
}

fn render_row<'a>(
    app: &App,
    row: &Row,
    columns: &[FieldDescriptor],
    title_width: usize,
    is_cursor: bool,
) -> Line<'a> {
    let scope = app.scope();
    let task = scope.tree.get(&row.id);
    let selected = scope.selection.is_selected(&row.id);

    let row_bg = if is_cursor {
        app.theme.selection_bg
    } else {
        app.theme.background
    };

    let mut spans = Vec::new();
    for (i, col) in columns.iter().enumerate() {
        let is_edit_cell = is_cursor && i == scope.col;
        if i == 0 {
            if is_edit_cell
                && app.mode == Mode::Edit
                && let Some(session) = app.editor.session()
                && session.picker.is_none()
                && session.search.is_none()
            {
                let text = format!(" {}▌", session.buffer);
                spans.push(Span::styled(
                    fit_to_width(&text, title_width),
                    Style::default().fg(app.theme.text_bright).bg(app.theme.edit_bg),
                ));
            } else {
                spans.push(title_span(app, row, task, selected, title_width, row_bg));
            }
            continue;
        }
        spans.push(value_span(app, task, col, is_edit_cell, row_bg));
    }
    Line::from(spans)
}

fn title_span<'a>(
    app: &App,
    row: &Row,
    task: Option<&Task>,
    selected: bool,
    width: usize,
    bg: ratatui::style::Color,
) -> Span<'a> {
    let mut text = String::new();
    text.push_str(if selected { "▎" } else { " " });

    // Tree continuation lines
    for last in &row.ancestor_last {
        text.push_str(if *last { "   " } else { "│  " });
    }
    if row.depth > 0 {
        text.push_str(if row.is_last_sibling { "└─ " } else { "├─ " });
    }

    let is_flow = task.is_some_and(|t| t.kind == TaskKind::Flow);
    if is_flow {
        text.push_str("» ");
    } else if row.has_children {
        text.push_str(if row.is_expanded { "▾ " } else { "▸ " });
    } else {
        text.push_str("  ");
    }

    match task {
        Some(t) => text.push_str(&t.title),
        None => text.push_str(&row.id),
    }
    if app.scope().tree.fetch_pending(&row.id) {
        text.push_str(" …");
    } else if app.scope().tree.fetch_failed(&row.id) {
        text.push_str("  (fetch failed · r retries)");
    }

    let fg = if selected {
        app.theme.highlight
    } else if is_flow {
        app.theme.cyan
    } else {
        app.theme.text
    };
    Span::styled(fit_to_width(&text, width), Style::default().fg(fg).bg(bg))
}

fn value_span<'a>(
    app: &App,
    task: Option<&Task>,
    col: &FieldDescriptor,
    is_edit_cell: bool,
    bg: ratatui::style::Color,
) -> Span<'a> {
    // The cell being edited inline shows the candidate buffer
    if is_edit_cell
        && app.mode == Mode::Edit
        && let Some(session) = app.editor.session()
        && session.picker.is_none()
        && session.search.is_none()
    {
        let text = format!("{}▌", session.buffer);
        return Span::styled(
            fit_to_width(&text, COL_WIDTH),
            Style::default().fg(app.theme.text_bright).bg(app.theme.edit_bg),
        );
    }

    let value = task.map(|t| t.field(&col.field_path)).unwrap_or_default();
    let mut fg = app.theme.text;
    let display = match col.field_type {
        FieldType::Select => {
            let code = value.display();
            let set = col.lookup_set.as_deref().unwrap_or_default();
            if let Some(set) = app.lookups.iter().find(|s| s.id == set)
                && let Some(option) = set.options.iter().find(|o| o.code == code)
            {
                if let Some(color) = option.color.as_deref().and_then(parse_hex_color) {
                    fg = color;
                }
                option.display_name.clone()
            } else {
                code
            }
        }
        FieldType::Reference => {
            let code = value.display();
            col.reference_collection
                .as_deref()
                .and_then(|c| app.lookup_display(c, &code))
                .unwrap_or(code)
        }
        _ => value.display(),
    };

    let style = if is_edit_cell {
        Style::default()
            .fg(app.theme.text_bright)
            .bg(bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(fg).bg(bg)
    };
    Span::styled(fit_to_width(&truncate_to_width(&display, COL_WIDTH - 1), COL_WIDTH), style)
}

fn column_offset(col: usize, title_width: usize, x0: u16) -> (u16, usize) {
    if col == 0 {
        (x0, title_width)
    } else {
        (x0 + (title_width + (col - 1) * COL_WIDTH) as u16, COL_WIDTH)
    }
}

/// Map an x offset inside the tree body to a column index
pub fn column_at(x: usize, column_count: usize, title_width: usize) -> usize {
    if column_count <= 1 || x < title_width {
        0
    } else {
        (1 + (x - title_width) / COL_WIDTH).min(column_count - 1)
    }
}

/// Picker and search popups for the inline editor, anchored at the cell
fn render_editor_overlay(frame: &mut Frame, app: &App, area: Rect, cell_x: u16, row_y: u16) {
    let Some(session) = app.editor.session() else { return };

    if let Some(picker) = &session.picker {
        let height = (picker.options.len() as u16 + 2).min(area.height.saturating_sub(row_y + 1));
        if height < 3 {
            return;
        }
        let popup = Rect {
            x: cell_x.min(area.width.saturating_sub(24)),
            y: row_y + 1,
            width: 24,
            height,
        };
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
            lines.push(Line::from(Span::styled(format!(" {}", opt.display_name), style)));
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .style(Style::default().bg(app.theme.background).fg(app.theme.header));
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }

    if let Some(search) = &session.search {
        let height = (search.results.len() as u16 + 3).min(area.height.saturating_sub(row_y + 1));
        if height < 3 {
            return;
        }
        let popup = Rect {
            x: cell_x.min(area.width.saturating_sub(36)),
            y: row_y + 1,
            width: 36,
            height,
        };
        frame.render_widget(Clear, popup);
        let mut lines = vec![Line::from(Span::styled(
            format!(" {}▌", search.query),
            Style::default().fg(app.theme.text_bright),
        ))];
        for (i, (id, title)) in search.results.iter().enumerate() {
            let style = if i == search.cursor {
                Style::default()
                    .fg(app.theme.text_bright)
                    .bg(app.theme.selection_bg)
            } else {
                Style::default().fg(app.theme.text)
            };
            lines.push(Line::from(Span::styled(format!(" {id}  {title}"), style)));
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" search ")
            .style(Style::default().bg(app.theme.background).fg(app.theme.header));
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }
}
