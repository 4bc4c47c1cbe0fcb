//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};

/// Shown in place of a heat map when the period holds no records.
pub const NO_DATA_MESSAGE: &str = "No data in this period";

/// Render the header bar.
///
/// Displays: active device, date domain, summary counts per severity.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mut spans = vec![Span::styled(" AFDD ", bold), Span::raw("│ ")];

    let Some(ref active) = app.active else {
        spans.push(Span::raw(format!("{} devices", app.selections.len())));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
        return;
    };
    spans.push(Span::styled(active.to_string(), bold));

    match app.heatmap {
        Some(ref heatmap) => {
            let (first, last) = heatmap.domain();
            spans.push(Span::raw(format!(" │ {} … {} │", first, last)));
            for (severity, count) in heatmap.severity_counts() {
                spans.push(Span::styled(" ● ", app.theme.severity_style(severity)));
                spans.push(Span::raw(format!("{} {}", count, severity.label())));
            }
        }
        None if app.is_loading() => spans.push(Span::raw(" │ Loading...")),
        None => {}
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the tab bar showing available views.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![Line::from(" 1:Devices "), Line::from(" 2:Calendar ")];

    let selected = match app.current_view {
        View::Devices => 0,
        View::Calendar => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Temporary messages take precedence, then load errors, then the
/// breadcrumb with the controls of the current view.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    if let Some(ref err) = app.load_error {
        let paragraph = Paragraph::new(format!(" Error: {} | r:retry q:quit", err))
            .style(Style::default().fg(app.theme.error));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = match app.current_view {
        View::Devices => "↑↓:select Enter:open Tab:switch ?:help q:quit",
        View::Calendar => "←→:day ↑↓:diagnostic Enter:hours e:export ?:help q:quit",
    };

    let state = if app.is_loading() {
        format!("Loading {}", app.source_description())
    } else if app.is_empty_period() {
        NO_DATA_MESSAGE.to_string()
    } else if app.skipped > 0 {
        format!("{} records skipped", app.skipped)
    } else {
        app.source_description().to_string()
    };

    let status = format!(" {} | {} | {}", app.breadcrumb(), state, controls);
    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let mut help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Devices"),
        Line::from("  ↑/↓ j/k     Select device"),
        Line::from("  PgUp/PgDn   Jump 10 devices"),
        Line::from("  Enter       Show heat map"),
        Line::from(""),
        section(" Calendar"),
        Line::from("  ←/→ h/l     Previous/next day"),
        Line::from("  ↑/↓ j/k     Previous/next diagnostic"),
        Line::from("  PgUp/PgDn   Jump a week"),
        Line::from("  Home/End    First/last day"),
        Line::from("  Enter       Hourly breakdown"),
        Line::from(""),
        section(" General"),
        Line::from("  Tab 1 2     Switch views"),
        Line::from("  Esc         Go back"),
        Line::from("  r           Reload data"),
        Line::from("  e           Export to JSON"),
        Line::from("  q           Quit"),
        Line::from(""),
    ];

    // Legend
    help_text.push(section(" Legend"));
    for severity in afdd_types::Severity::ALL {
        help_text.push(Line::from(vec![
            Span::styled("  ● ", app.theme.severity_style(severity)),
            Span::raw(severity.label()),
        ]));
    }
    help_text.push(Line::from(""));
    help_text.push(Line::from(vec![Span::styled(
        "Press any key to close",
        Style::default().add_modifier(Modifier::DIM),
    )]));

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let height = help_text.len() as u16 + 2;
    let help_area = super::centered(
        area,
        46u16.min(area.width.saturating_sub(4)),
        height.min(area.height.saturating_sub(2)),
    );

    frame.render_widget(Clear, help_area);
    frame.render_widget(Paragraph::new(help_text).block(block), help_area);
}
