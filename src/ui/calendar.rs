//! Heat-map rendering.
//!
//! Rows are diagnostics, columns are days; each cell is a `●` in the color
//! of the day's summary severity. When the domain is wider than the
//! terminal, the visible window follows the cursor.

use std::ops::Range;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::App;
use crate::data::HeatMap;

use super::common::NO_DATA_MESSAGE;

/// Width of a day column, not counting spacing.
const DAY_WIDTH: u16 = 2;
/// Row labels are cut to this width.
const MAX_LABEL_WIDTH: u16 = 48;

/// Render the heat map of the active selection.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let Some(ref heatmap) = app.heatmap else {
        let message = if app.active.is_none() {
            "  Select a device first (1:Devices, Enter)"
        } else if app.is_loading() {
            "  Loading..."
        } else if app.load_error.is_some() {
            "  Request failed, see the status bar"
        } else {
            NO_DATA_MESSAGE
        };
        let placeholder = Paragraph::new(vec![
            Line::from(""),
            Line::styled(message, Style::default().add_modifier(Modifier::DIM)),
        ])
        .block(block.title(" Calendar "));
        frame.render_widget(placeholder, area);
        return;
    };

    let chunks = Layout::vertical([Constraint::Min(4), Constraint::Length(4)]).split(area);

    let label_width = heatmap
        .rows
        .iter()
        .map(|r| r.chars().count() as u16)
        .max()
        .unwrap_or(0)
        .min(MAX_LABEL_WIDTH);
    // Borders, highlight column and spacing around the label column
    let grid_width = chunks[0].width.saturating_sub(label_width + 4);
    let visible = (grid_width / (DAY_WIDTH + 1)).max(1) as usize;
    let days = visible_days(heatmap.day_count(), visible, app.cursor.day);

    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(days.clone().map(|d| {
                let label = heatmap
                    .day(d)
                    .map(|date| date.format("%d").to_string())
                    .unwrap_or_default();
                let style = if d == app.cursor.day {
                    app.theme.header.add_modifier(Modifier::REVERSED)
                } else {
                    app.theme.header
                };
                Cell::from(label).style(style)
            }))
            .collect::<Vec<_>>(),
    );

    let rows: Vec<Row> = heatmap
        .rows
        .iter()
        .enumerate()
        .map(|(row, label)| {
            let label_style = if row == app.cursor.row {
                app.theme.selected
            } else {
                Style::default()
            };
            let cells = std::iter::once(Cell::from(truncate(label, label_width)).style(label_style))
                .chain(days.clone().map(|day| day_cell(app, heatmap, day, row)));
            Row::new(cells.collect::<Vec<_>>())
        })
        .collect();

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(label_width))
        .chain(days.clone().map(|_| Constraint::Length(DAY_WIDTH)))
        .collect();

    let title = format!(
        " {} [{}-{} of {} days] ",
        month_span(heatmap, &days),
        days.start + 1,
        days.end,
        heatmap.day_count()
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(block.title(title));
    frame.render_widget(table, chunks[0]);

    render_cell_info(frame, app, chunks[1]);
}

fn day_cell<'a>(app: &App, heatmap: &'a HeatMap, day: usize, row: usize) -> Cell<'a> {
    let Some(summary) = heatmap.summary(day, row) else {
        return Cell::from("");
    };
    let mut style = app.theme.severity_style(summary.severity);
    if day == app.cursor.day && row == app.cursor.row {
        style = style.patch(app.theme.cursor);
    }
    Cell::from(" ●").style(style)
}

/// Date, diagnostic, state and message of the cell under the cursor.
fn render_cell_info(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let Some(summary) = app.selected_summary() else {
        frame.render_widget(block, area);
        return;
    };
    let row_label = app
        .heatmap
        .as_ref()
        .and_then(|m| m.rows.get(summary.row))
        .map(String::as_str)
        .unwrap_or_default();

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" {} ", summary.date.format("%Y-%m-%d")),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{} ", row_label)),
            Span::styled(
                format!("● {}", summary.severity.label()),
                app.theme.severity_style(summary.severity),
            ),
            Span::raw(format!(
                " │ Energy impact: {} │ {}/24 hours reported",
                summary.energy_impact,
                summary.reported_hours()
            )),
        ]),
        Line::from(format!(" {}", summary.diagnostic_message)),
    ];

    let info = Paragraph::new(lines)
        .block(block.title(" Selected "))
        .wrap(Wrap { trim: true });
    frame.render_widget(info, area);
}

/// The window of `visible` day columns that contains `cursor`.
pub fn visible_days(day_count: usize, visible: usize, cursor: usize) -> Range<usize> {
    if day_count <= visible {
        return 0..day_count;
    }
    let start = (cursor + 1).saturating_sub(visible).min(day_count - visible);
    start..start + visible
}

/// "Jan 2024" or "Jan 2024 - Feb 2024" for the visible days.
fn month_span(heatmap: &HeatMap, days: &Range<usize>) -> String {
    let first = heatmap.day(days.start);
    let last = heatmap.day(days.end.saturating_sub(1));
    match (first, last) {
        (Some(first), Some(last)) => {
            let a = first.format("%b %Y").to_string();
            let b = last.format("%b %Y").to_string();
            if a == b {
                a
            } else {
                format!("{} - {}", a, b)
            }
        }
        _ => String::new(),
    }
}

fn truncate(label: &str, width: u16) -> String {
    let width = width as usize;
    if label.chars().count() <= width {
        return label.to_string();
    }
    let mut cut: String = label.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
