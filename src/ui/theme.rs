//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.
//! Severity colors are the canonical heat-map colors in both themes.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use afdd_types::Severity;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Color for error text.
    pub error: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Background of the heat-map cell under the cursor.
    pub cursor: Style,
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            border: Color::Gray,
            error: Color::LightRed,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            cursor: Style::default().bg(Color::Gray),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            border: Color::DarkGray,
            error: Color::Red,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            cursor: Style::default().bg(Color::DarkGray),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn severity_color(&self, severity: Severity) -> Color {
        let (r, g, b) = severity.rgb();
        Color::Rgb(r, g, b)
    }

    /// Style for a severity marker; faults are bold.
    pub fn severity_style(&self, severity: Severity) -> Style {
        let style = Style::default().fg(self.severity_color(severity));
        match severity {
            Severity::Fault => style.add_modifier(Modifier::BOLD),
            Severity::Normal | Severity::NoDiagnosis => style,
        }
    }
}
