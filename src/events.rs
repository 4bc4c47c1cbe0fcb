use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{App, View};

/// File written by the export key.
pub const EXPORT_PATH: &str = "heatmap_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.show_hourly_overlay {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace | KeyCode::Char('q') => {
                app.close_overlay();
            }
            // Step through neighbouring cells while the overlay is open
            KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => app.select_next(),
            KeyCode::Left | KeyCode::Char('h') => app.prev_day(1),
            KeyCode::Right | KeyCode::Char('l') => app.next_day(1),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),

        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.prev_view();
            } else {
                app.next_view();
            }
        }
        KeyCode::BackTab => app.prev_view(),

        KeyCode::Char('1') => app.set_view(View::Devices),
        KeyCode::Char('2') => app.set_view(View::Calendar),

        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        // Left/right move through days in the calendar and switch tabs elsewhere
        KeyCode::Left | KeyCode::Char('h') => match app.current_view {
            View::Calendar => app.prev_day(1),
            View::Devices => app.prev_view(),
        },
        KeyCode::Right | KeyCode::Char('l') => match app.current_view {
            View::Calendar => app.next_day(1),
            View::Devices => app.next_view(),
        },
        KeyCode::PageUp => match app.current_view {
            View::Calendar => app.prev_page(),
            View::Devices => app.select_prev_n(10),
        },
        KeyCode::PageDown => match app.current_view {
            View::Calendar => app.next_page(),
            View::Devices => app.select_next_n(10),
        },
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        KeyCode::Enter => app.enter(),

        KeyCode::Esc | KeyCode::Backspace => app.go_back(),

        // Reload: poll now, or fetch the active device again
        KeyCode::Char('r') => {
            if app.current_view == View::Devices || app.active.is_none() {
                let _ = app.reload_data();
            } else {
                reload_active(app);
            }
        }

        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('e') => {
            let export_path = PathBuf::from(EXPORT_PATH);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}

/// Request the active selection again, keeping the current view.
fn reload_active(app: &mut App) {
    let Some(active) = app.active.clone() else {
        return;
    };
    if let Some(index) = app.selections.iter().position(|s| *s == active) {
        let cursor = app.cursor;
        app.open_selection(index);
        app.cursor = cursor;
    }
    let _ = app.reload_data();
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, content_start_row: u16) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.select_prev(),
        MouseEventKind::ScrollDown => app.select_next(),

        MouseEventKind::Down(MouseButton::Left) => {
            let clicked_row = mouse.row;

            // Content starts after header, tabs and the table header
            if clicked_row > content_start_row && app.current_view == View::Devices {
                let item_row = (clicked_row - content_start_row - 1) as usize;
                if item_row < app.selections.len() {
                    app.selected_device_index = item_row;
                }
            }

            // Tab bar is row 1: " 1:Devices " then " 2:Calendar "
            if clicked_row == 1 {
                if mouse.column < 12 {
                    app.set_view(View::Devices);
                } else if mouse.column < 25 {
                    app.set_view(View::Calendar);
                }
            }
        }

        MouseEventKind::Down(MouseButton::Right) => app.go_back(),

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Analysis;
    use crate::source::ChannelSource;
    use afdd_historian::HistorianValues;
    use serde_json::json;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with_two_devices() -> App {
        let mut values = HistorianValues::new();
        values.insert(
            "Economizer_RCx/PNNL/BUILDING1/AHU1/Temperature Sensor Dx/diagnostic message"
                .to_string(),
            vec![
                json!(["2024-01-01T05:10:00", 0.0]),
                json!(["2024-01-02T05:10:00", 0.0]),
            ],
        );
        values.insert(
            "Airside_RCx/PNNL/BUILDING1/AHU2/Low Duct Static Pressure Dx/diagnostic message"
                .to_string(),
            vec![json!(["2024-01-01T09:00:00", 0.0])],
        );
        let (tx, source) = ChannelSource::create("test");
        tx.send(Some(Ok(values))).unwrap();

        let mut app = App::new(Box::new(source), Analysis::default());
        app.reload_data().unwrap();
        app
    }

    #[test]
    fn test_help_swallows_next_key() {
        let mut app = app_with_two_devices();
        handle_key_event(&mut app, key(KeyCode::Char('?')));
        assert!(app.show_help);
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.show_help);
        assert!(app.running);
    }

    #[test]
    fn test_device_picker_keys() {
        let mut app = app_with_two_devices();
        handle_key_event(&mut app, key(KeyCode::Down));
        assert_eq!(app.selected_device_index, 1);
        handle_key_event(&mut app, key(KeyCode::Home));
        assert_eq!(app.selected_device_index, 0);

        handle_key_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.current_view, View::Calendar);
        assert_eq!(app.active.as_ref().unwrap().device.device, "AHU1");
    }

    #[test]
    fn test_calendar_keys() {
        let mut app = app_with_two_devices();
        handle_key_event(&mut app, key(KeyCode::Enter));

        handle_key_event(&mut app, key(KeyCode::Right));
        assert_eq!(app.cursor.day, 1);
        handle_key_event(&mut app, key(KeyCode::Char('j')));
        assert_eq!(app.cursor.row, 1);
        handle_key_event(&mut app, key(KeyCode::PageUp));
        assert_eq!(app.cursor.day, 0);

        handle_key_event(&mut app, key(KeyCode::Enter));
        assert!(app.show_hourly_overlay);
        handle_key_event(&mut app, key(KeyCode::Char('l')));
        assert_eq!(app.cursor.day, 1);
        handle_key_event(&mut app, key(KeyCode::Esc));
        assert!(!app.show_hourly_overlay);

        handle_key_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.current_view, View::Devices);
    }

    #[test]
    fn test_tab_and_quit() {
        let mut app = app_with_two_devices();
        handle_key_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.current_view, View::Calendar);
        handle_key_event(&mut app, key(KeyCode::Char('1')));
        assert_eq!(app.current_view, View::Devices);
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[test]
    fn test_export_without_heatmap_reports_failure() {
        let mut app = app_with_two_devices();
        handle_key_event(&mut app, key(KeyCode::Char('e')));
        assert!(app.get_status_message().unwrap().starts_with("Export failed"));
    }

    #[test]
    fn test_mouse_selects_device() {
        let mut app = app_with_two_devices();
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 5,
            row: 5,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse_event(&mut app, click, 3);
        assert_eq!(app.selected_device_index, 1);
    }
}
