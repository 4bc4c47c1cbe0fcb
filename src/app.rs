//! Application state and navigation logic.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

use afdd_historian::HistorianValues;
use afdd_types::{DailySummary, HourlyCell};

use crate::data::{discover, filter_values, Analysis, DeviceSelection, HeatMap};
use crate::source::{DataSource, Loader};
use crate::ui::Theme;

/// How long a status message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Days moved by PageUp/PageDown in the calendar.
const DAYS_PER_PAGE: usize = 7;

/// The current view/tab in the TUI.
///
/// The hourly breakdown is shown as an overlay (controlled by
/// `App::show_hourly_overlay`) rather than as a separate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Configured and discovered devices with their diagnostic category.
    Devices,
    /// Heat map of the active selection: diagnostics by day.
    Calendar,
}

impl View {
    pub fn next(self) -> Self {
        match self {
            View::Devices => View::Calendar,
            View::Calendar => View::Devices,
        }
    }

    pub fn prev(self) -> Self {
        self.next()
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Devices => "Devices",
            View::Calendar => "Calendar",
        }
    }
}

/// Saved state for returning to a previous view.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub view: View,
    pub selected_device_index: usize,
}

/// Position of the highlighted heat-map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Column, counted from the first day of the domain.
    pub day: usize,
    pub row: usize,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub show_hourly_overlay: bool,

    // Data source. `None` until the first request when fetching remotely.
    source: Option<Box<dyn DataSource>>,
    loader: Option<Box<dyn Loader>>,
    pub analysis: Analysis,
    values: HistorianValues,
    pub heatmap: Option<HeatMap>,
    /// Records dropped while building the current heat map.
    pub skipped: usize,
    pub load_error: Option<String>,

    // Device picker
    configured: Vec<DeviceSelection>,
    pub selections: Vec<DeviceSelection>,
    pub active: Option<DeviceSelection>,

    // Navigation state
    pub selected_device_index: usize,
    pub cursor: Cursor,
    pub view_stack: Vec<ViewState>,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create an app that reads every batch from `source`.
    ///
    /// Devices are discovered from the batches; selecting one filters the
    /// latest batch instead of fetching.
    pub fn new(source: Box<dyn DataSource>, analysis: Analysis) -> Self {
        Self::with_source(Some(source), analysis)
    }

    /// Create an app that fetches each selection through `loader`.
    ///
    /// The first selection is requested right away.
    pub fn remote(
        loader: Box<dyn Loader>,
        selections: Vec<DeviceSelection>,
        analysis: Analysis,
    ) -> Self {
        let mut app = Self::with_source(None, analysis);
        app.loader = Some(loader);
        app = app.with_selections(selections);
        if !app.selections.is_empty() {
            app.open_selection(0);
        }
        app
    }

    fn with_source(source: Option<Box<dyn DataSource>>, analysis: Analysis) -> Self {
        Self {
            running: true,
            current_view: View::Devices,
            show_help: false,
            show_hourly_overlay: false,
            source,
            loader: None,
            analysis,
            values: HistorianValues::new(),
            heatmap: None,
            skipped: 0,
            load_error: None,
            configured: Vec::new(),
            selections: Vec::new(),
            active: None,
            selected_device_index: 0,
            cursor: Cursor::default(),
            view_stack: Vec::new(),
            theme: Theme::dark(),
            status_message: None,
        }
    }

    /// Devices listed ahead of the discovered ones.
    pub fn with_selections(mut self, selections: Vec<DeviceSelection>) -> Self {
        self.configured = selections;
        self.merge_selections();
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.source
            .as_deref()
            .map(|s| s.description())
            .unwrap_or("historian")
    }

    /// Whether a request is still in flight.
    pub fn is_loading(&self) -> bool {
        self.source.as_deref().is_some_and(|s| s.is_pending())
    }

    /// A device is selected, its data arrived and nothing was in range.
    pub fn is_empty_period(&self) -> bool {
        self.active.is_some()
            && self.heatmap.is_none()
            && self.load_error.is_none()
            && !self.is_loading()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    pub fn push_view(&mut self, view: View) {
        self.view_stack.push(ViewState {
            view: self.current_view,
            selected_device_index: self.selected_device_index,
        });
        self.current_view = view;
    }

    /// Pop the view stack and restore previous state.
    pub fn pop_view(&mut self) -> bool {
        if let Some(state) = self.view_stack.pop() {
            self.current_view = state.view;
            self.selected_device_index = state.selected_device_index;
            true
        } else {
            false
        }
    }

    /// Get breadcrumb trail for current navigation.
    pub fn breadcrumb(&self) -> String {
        let mut parts: Vec<&str> = self.view_stack.iter().map(|s| s.view.label()).collect();
        parts.push(self.current_view.label());
        if self.show_hourly_overlay {
            parts.push("Hourly");
        }
        parts.join(" > ")
    }

    /// Poll the data source for new data.
    ///
    /// Returns Ok(true) if a batch was received and the heat map rebuilt.
    /// A source error is kept for the status bar and leaves the current heat
    /// map in place.
    pub fn reload_data(&mut self) -> Result<bool> {
        let Some(source) = self.source.as_deref_mut() else {
            return Ok(false);
        };

        if let Some(values) = source.poll() {
            self.load_error = None;
            self.ingest(values);
            return Ok(true);
        }

        if let Some(err) = source.error() {
            if self.load_error.as_deref() != Some(err) {
                warn!(source = %source.description(), error = %err, "Data source error");
            }
            self.load_error = Some(err.to_string());
        }
        Ok(false)
    }

    fn ingest(&mut self, values: HistorianValues) {
        self.values = values;
        self.merge_selections();

        // A dump of a single device opens straight into its heat map.
        if self.active.is_none() && self.loader.is_none() && self.selections.len() == 1 {
            self.open_selection(0);
            return;
        }
        self.rebuild();
    }

    /// Configured selections first, then discovered ones not configured.
    fn merge_selections(&mut self) {
        let mut selections = self.configured.clone();
        for found in discover(&self.values) {
            if !selections.contains(&found) {
                selections.push(found);
            }
        }
        self.selections = selections;
        self.selected_device_index = self
            .selected_device_index
            .min(self.selections.len().saturating_sub(1));
    }

    fn rebuild(&mut self) {
        let Some(active) = self.active.as_ref() else {
            self.heatmap = None;
            return;
        };

        let values = filter_values(&self.values, active);
        let (heatmap, outcome) = self.analysis.build(&values, Some(active));
        self.skipped = outcome.skipped.len();
        self.heatmap = heatmap;
        self.clamp_cursor();
    }

    /// Make a selection active and show its calendar.
    ///
    /// With a loader this starts a new request; the previous one is dropped
    /// and can no longer deliver.
    pub fn open_selection(&mut self, index: usize) {
        let Some(selection) = self.selections.get(index).cloned() else {
            return;
        };
        info!(selection = %selection, "Opening device");

        self.selected_device_index = index;
        self.cursor = Cursor::default();
        self.show_hourly_overlay = false;
        self.active = Some(selection.clone());

        if let Some(loader) = self.loader.as_deref() {
            self.source = Some(loader.open(&selection));
            self.heatmap = None;
            self.skipped = 0;
            self.load_error = None;
            self.set_status_message(format!("Fetching {}", selection));
        } else {
            self.rebuild();
        }

        if self.current_view != View::Calendar {
            self.push_view(View::Calendar);
        }
    }

    /// Request the device highlighted in the picker.
    pub fn request_selected(&mut self) {
        self.open_selection(self.selected_device_index);
    }

    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move down by n devices, or n diagnostic rows in the calendar.
    pub fn select_next_n(&mut self, n: usize) {
        match self.current_view {
            View::Devices => {
                let max = self.selections.len().saturating_sub(1);
                self.selected_device_index = (self.selected_device_index + n).min(max);
            }
            View::Calendar => {
                let max = self.row_count().saturating_sub(1);
                self.cursor.row = (self.cursor.row + n).min(max);
            }
        }
    }

    pub fn select_prev_n(&mut self, n: usize) {
        match self.current_view {
            View::Devices => {
                self.selected_device_index = self.selected_device_index.saturating_sub(n);
            }
            View::Calendar => {
                self.cursor.row = self.cursor.row.saturating_sub(n);
            }
        }
    }

    /// First device, or the first day of the calendar.
    pub fn select_first(&mut self) {
        match self.current_view {
            View::Devices => self.selected_device_index = 0,
            View::Calendar => self.cursor.day = 0,
        }
    }

    /// Last device, or the last day of the calendar.
    pub fn select_last(&mut self) {
        match self.current_view {
            View::Devices => {
                self.selected_device_index = self.selections.len().saturating_sub(1);
            }
            View::Calendar => {
                self.cursor.day = self.day_count().saturating_sub(1);
            }
        }
    }

    pub fn next_day(&mut self, n: usize) {
        let max = self.day_count().saturating_sub(1);
        self.cursor.day = (self.cursor.day + n).min(max);
    }

    pub fn prev_day(&mut self, n: usize) {
        self.cursor.day = self.cursor.day.saturating_sub(n);
    }

    pub fn next_page(&mut self) {
        self.next_day(DAYS_PER_PAGE);
    }

    pub fn prev_page(&mut self) {
        self.prev_day(DAYS_PER_PAGE);
    }

    fn day_count(&self) -> usize {
        self.heatmap.as_ref().map_or(0, HeatMap::day_count)
    }

    fn row_count(&self) -> usize {
        self.heatmap.as_ref().map_or(0, |m| m.rows.len())
    }

    fn clamp_cursor(&mut self) {
        self.cursor.day = self.cursor.day.min(self.day_count().saturating_sub(1));
        self.cursor.row = self.cursor.row.min(self.row_count().saturating_sub(1));
    }

    /// The summary under the cursor.
    pub fn selected_summary(&self) -> Option<&DailySummary> {
        self.heatmap
            .as_ref()?
            .summary(self.cursor.day, self.cursor.row)
    }

    pub fn selected_hourly(&self) -> Option<&[HourlyCell]> {
        self.heatmap
            .as_ref()?
            .hourly(self.cursor.day, self.cursor.row)
    }

    /// Enter: request the highlighted device, or open the hourly overlay.
    pub fn enter(&mut self) {
        match self.current_view {
            View::Devices => self.request_selected(),
            View::Calendar => {
                if self.selected_summary().is_some() {
                    self.show_hourly_overlay = true;
                }
            }
        }
    }

    /// Navigate back: close overlay first, then pop view stack, then go to Devices.
    pub fn go_back(&mut self) {
        if self.show_hourly_overlay {
            self.show_hourly_overlay = false;
            return;
        }
        if !self.pop_view() {
            self.current_view = View::Devices;
        }
    }

    pub fn close_overlay(&mut self) {
        self.show_hourly_overlay = false;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Write the current heat map as JSON.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let Some(ref heatmap) = self.heatmap else {
            anyhow::bail!("No data to export");
        };
        let json = serde_json::to_string_pretty(heatmap)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ChannelSource;
    use afdd_types::{DevicePath, Severity};
    use serde_json::json;

    const AHU1_DX: &str =
        "Economizer_RCx/PNNL/BUILDING1/AHU1/Temperature Sensor Dx/diagnostic message";
    const AHU2_DX: &str =
        "Airside_RCx/PNNL/BUILDING1/AHU2/Low Duct Static Pressure Dx/diagnostic message";

    fn batch() -> HistorianValues {
        let mut values = HistorianValues::new();
        values.insert(
            AHU1_DX.to_string(),
            vec![
                json!(["2024-01-01T05:10:00", 0.0]),
                json!(["2024-01-03T07:10:00", 1.1]),
            ],
        );
        values.insert(
            AHU2_DX.to_string(),
            vec![json!(["2024-01-02T09:00:00", 0.0])],
        );
        values
    }

    fn ahu(device: &str, category: &str) -> DeviceSelection {
        DeviceSelection::new(DevicePath::new("PNNL", "BUILDING1", device), category)
    }

    fn sent(values: HistorianValues) -> Box<dyn DataSource> {
        let (tx, source) = ChannelSource::create("test");
        tx.send(Some(Ok(values))).unwrap();
        Box::new(source)
    }

    /// Serves each selection from a fixed batch.
    #[derive(Debug)]
    struct BatchLoader(HistorianValues);

    impl Loader for BatchLoader {
        fn open(&self, selection: &DeviceSelection) -> Box<dyn DataSource> {
            sent(filter_values(&self.0, selection))
        }
    }

    #[test]
    fn test_view_cycle() {
        assert_eq!(View::Devices.next(), View::Calendar);
        assert_eq!(View::Calendar.next(), View::Devices);
        assert_eq!(View::Devices.prev(), View::Calendar);
        assert_eq!(View::Calendar.label(), "Calendar");
    }

    #[test]
    fn test_discovers_devices() {
        let mut app = App::new(sent(batch()), Analysis::default());
        assert!(app.reload_data().unwrap());
        assert_eq!(app.selections.len(), 2);
        assert!(app.active.is_none());
        assert_eq!(app.current_view, View::Devices);

        // Nothing new on the next poll.
        assert!(!app.reload_data().unwrap());
    }

    #[test]
    fn test_configured_devices_come_first() {
        let configured = vec![ahu("AHU9", "Airside_RCx"), ahu("AHU2", "Airside_RCx")];
        let mut app = App::new(sent(batch()), Analysis::default()).with_selections(configured);
        app.reload_data().unwrap();

        let names: Vec<&str> = app
            .selections
            .iter()
            .map(|s| s.device.device.as_str())
            .collect();
        assert_eq!(names, ["AHU9", "AHU2", "AHU1"]);
    }

    #[test]
    fn test_single_device_opens_calendar() {
        let mut values = batch();
        values.remove(AHU2_DX);
        let mut app = App::new(sent(values), Analysis::default());
        app.reload_data().unwrap();

        assert_eq!(app.active, Some(ahu("AHU1", "Economizer_RCx")));
        assert_eq!(app.current_view, View::Calendar);
        assert_eq!(app.breadcrumb(), "Devices > Calendar");
        assert_eq!(app.heatmap.as_ref().unwrap().day_count(), 3);
    }

    #[test]
    fn test_open_and_navigate_calendar() {
        let mut app = App::new(sent(batch()), Analysis::default());
        app.reload_data().unwrap();

        // AHU1 sorts first.
        app.enter();
        assert_eq!(app.current_view, View::Calendar);
        let map = app.heatmap.as_ref().unwrap();
        assert_eq!(map.rows.len(), 5);
        assert_eq!(map.day_count(), 3);

        app.select_last();
        assert_eq!(app.cursor.day, 2);
        app.next_day(1);
        assert_eq!(app.cursor.day, 2);
        app.select_next_n(10);
        assert_eq!(app.cursor.row, 4);
        app.select_first();
        app.select_prev();
        assert_eq!(app.cursor, Cursor { day: 0, row: 3 });

        app.cursor = Cursor { day: 2, row: 0 };
        assert_eq!(app.selected_summary().unwrap().severity, Severity::Fault);
        assert_eq!(app.selected_hourly().unwrap().len(), 24);
    }

    #[test]
    fn test_hourly_overlay_and_back() {
        let mut app = App::new(sent(batch()), Analysis::default());
        app.reload_data().unwrap();
        app.enter();

        app.enter();
        assert!(app.show_hourly_overlay);
        assert_eq!(app.breadcrumb(), "Devices > Calendar > Hourly");

        app.go_back();
        assert!(!app.show_hourly_overlay);
        assert_eq!(app.current_view, View::Calendar);

        app.go_back();
        assert_eq!(app.current_view, View::Devices);
        app.go_back();
        assert_eq!(app.current_view, View::Devices);
    }

    #[test]
    fn test_remote_requests_per_selection() {
        let selections = vec![ahu("AHU1", "Economizer_RCx"), ahu("AHU2", "Airside_RCx")];
        let mut app = App::remote(
            Box::new(BatchLoader(batch())),
            selections,
            Analysis::default(),
        );
        assert_eq!(app.active, Some(ahu("AHU1", "Economizer_RCx")));
        assert!(app.heatmap.is_none());
        assert!(app.get_status_message().unwrap().starts_with("Fetching"));

        app.reload_data().unwrap();
        assert_eq!(app.heatmap.as_ref().unwrap().day_count(), 3);

        app.go_back();
        app.select_next();
        app.enter();
        assert_eq!(app.active, Some(ahu("AHU2", "Airside_RCx")));
        assert!(app.heatmap.is_none());

        app.reload_data().unwrap();
        let map = app.heatmap.as_ref().unwrap();
        assert_eq!(map.rows.len(), 9);
        assert_eq!(map.day_count(), 1);
    }

    #[test]
    fn test_empty_period() {
        let selections = vec![ahu("AHU7", "Airside_RCx")];
        let mut app = App::remote(
            Box::new(BatchLoader(batch())),
            selections,
            Analysis::default(),
        );
        app.reload_data().unwrap();
        assert!(app.heatmap.is_none());
        assert!(app.is_empty_period());
    }

    #[test]
    fn test_source_error_keeps_heatmap() {
        let (tx, source) = ChannelSource::create("test");
        let mut app = App::new(Box::new(source), Analysis::default());
        let mut values = batch();
        values.remove(AHU2_DX);
        tx.send(Some(Ok(values))).unwrap();
        app.reload_data().unwrap();
        assert!(app.heatmap.is_some());

        tx.send(Some(Err("connection refused".to_string()))).unwrap();
        assert!(!app.reload_data().unwrap());
        assert_eq!(app.load_error.as_deref(), Some("connection refused"));
        assert!(app.heatmap.is_some());
    }

    #[test]
    fn test_status_message() {
        let mut app = App::new(sent(HistorianValues::new()), Analysis::default());
        assert!(app.get_status_message().is_none());
        app.set_status_message("Exported".to_string());
        assert_eq!(app.get_status_message(), Some("Exported"));
    }

    #[test]
    fn test_export_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.json");

        let mut app = App::new(sent(batch()), Analysis::default());
        app.reload_data().unwrap();
        assert!(app.export_state(&path).is_err());

        app.enter();
        app.export_state(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["domain"][1], "2024-01-03");
        assert_eq!(json["summaries"].as_array().unwrap().len(), 15);
    }

    #[test]
    fn test_quit_and_help() {
        let mut app = App::new(sent(HistorianValues::new()), Analysis::default());
        app.toggle_help();
        assert!(app.show_help);
        app.quit();
        assert!(!app.running);
    }
}
