//! Hourly overlay rendering.
//!
//! Displays the 24 hourly cells behind the summary under the cursor.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;

/// Minimum width required for the overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 16;

/// Render the hourly breakdown as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }
    let (Some(summary), Some(hourly)) = (app.selected_summary(), app.selected_hourly()) else {
        return;
    };
    let row_label = app
        .heatmap
        .as_ref()
        .and_then(|m| m.rows.get(summary.row))
        .map(String::as_str)
        .unwrap_or_default();

    // Hours, table header, borders and footer
    let overlay_width = (area.width * 95 / 100).clamp(MIN_OVERLAY_WIDTH, 120);
    let overlay_height = (hourly.len() as u16 + 5).min(area.height);
    let overlay_area = super::centered(area, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([Constraint::Min(4), Constraint::Length(1)]).split(overlay_area);

    let header = Row::new(vec![
        Cell::from("Hour"),
        Cell::from("State"),
        Cell::from("Energy"),
        Cell::from("Message"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = hourly
        .iter()
        .map(|cell| {
            let message_style = if cell.is_missing() {
                Style::default().add_modifier(Modifier::DIM)
            } else {
                Style::default()
            };
            Row::new(vec![
                // Hours display 1-based.
                Cell::from(format!("{:>4}", cell.hour + 1)),
                Cell::from(format!("● {}", cell.severity.label()))
                    .style(app.theme.severity_style(cell.severity)),
                Cell::from(cell.energy_impact.to_string()),
                Cell::from(cell.diagnostic_message.clone()).style(message_style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Length(14),
        Constraint::Length(8),
        Constraint::Fill(1),
    ];

    let title = format!(
        " {} · {} · ● {} ",
        summary.date.format("%Y-%m-%d"),
        row_label,
        summary.severity.label()
    );

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(app.theme.severity_style(summary.severity)),
    );
    frame.render_widget(table, chunks[0]);

    let footer = Paragraph::new(Line::from(vec![Span::styled(
        " ←→↑↓:move Esc:close ",
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[1]);
}
