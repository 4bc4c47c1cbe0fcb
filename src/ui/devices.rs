//! Device picker rendering.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;

/// Render the list of device selections.
///
/// The active selection is marked with `●`.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if app.selections.is_empty() {
        let message = if app.is_loading() {
            "  Loading..."
        } else {
            "  No devices configured or found in the data"
        };
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::styled(message, Style::default().add_modifier(Modifier::DIM)),
        ])
        .block(block.title(" Devices (0) "));
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from(""),
        Cell::from("Site"),
        Cell::from("Building"),
        Cell::from("Device"),
        Cell::from("Diagnostics"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = app
        .selections
        .iter()
        .map(|selection| {
            let marker = if app.active.as_ref() == Some(selection) {
                Cell::from("●").style(Style::default().fg(app.theme.highlight))
            } else {
                Cell::from(" ")
            };
            let known = app.analysis.catalog.get(&selection.category).is_some();
            let category = Cell::from(selection.category.clone());
            Row::new(vec![
                marker,
                Cell::from(selection.device.site.clone()),
                Cell::from(selection.device.building.clone()),
                Cell::from(selection.device.device.clone()),
                if known {
                    category
                } else {
                    category.style(Style::default().add_modifier(Modifier::DIM))
                },
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Fill(2),
    ];

    let selected = app
        .selected_device_index
        .min(app.selections.len().saturating_sub(1));
    let title = format!(
        " Devices ({}) [{}/{}] ",
        app.selections.len(),
        selected + 1,
        app.selections.len()
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(block.title(title))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}
