use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tracing::{info, warn};

use afdd_historian::HistorianClient;
use afdd_types::DevicePath;
use afdd_viz::app::{App, View};
use afdd_viz::config::Settings;
use afdd_viz::data::{discover, filter_values, Analysis};
use afdd_viz::logging::{self, LogTarget};
use afdd_viz::source::{FileSource, HistorianLoader};
use afdd_viz::ui::{self, Theme};
use afdd_viz::{events, DeviceSelection};

#[derive(Parser, Debug)]
#[command(name = "afdd-viz")]
#[command(about = "Heat-map viewer for AFDD diagnostic results")]
struct Args {
    /// Saved historian response (JSON)
    #[arg(short, long, default_value = "historian.json", conflicts_with = "connect")]
    file: PathBuf,

    /// Fetch from the historian configured in the settings
    #[arg(short, long)]
    connect: bool,

    /// Settings file (TOML); AFDD_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// First day of the historian query (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the historian query (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Use the rows of this diagnostic category (e.g. Airside_RCx)
    #[arg(long)]
    category: Option<String>,

    /// Device to export (site/building/device)
    #[arg(long, value_parser = parse_device, requires = "export")]
    device: Option<DevicePath>,

    /// Refresh interval in seconds (only used with --file)
    #[arg(short, long, default_value = "1")]
    refresh: u64,

    /// Write the heat map to a JSON file and exit
    #[arg(short, long, conflicts_with = "connect")]
    export: Option<PathBuf>,
}

fn parse_device(s: &str) -> Result<DevicePath, String> {
    match s.split('/').collect::<Vec<_>>().as_slice() {
        [site, building, device] if !site.is_empty() && !building.is_empty() && !device.is_empty() => {
            Ok(DevicePath::new(*site, *building, *device))
        }
        _ => Err(format!("expected site/building/device, got '{}'", s)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;

    let target = if args.export.is_some() {
        LogTarget::Stderr
    } else {
        LogTarget::File
    };
    let _log_guard = logging::init(&settings.log, target)?;

    let analysis =
        Analysis::new(settings.error_code_tables()).with_category(args.category.clone());

    // Handle export mode (non-interactive)
    if let Some(ref export_path) = args.export {
        return export_to_file(&args.file, export_path, &analysis, &args);
    }

    if args.connect {
        return run_with_historian(&settings, &args, analysis);
    }

    run_with_file(&settings, &args, analysis)
}

/// Run with a saved historian response
fn run_with_file(settings: &Settings, args: &Args, analysis: Analysis) -> Result<()> {
    info!(path = %args.file.display(), "Reading historian dump");
    let source = Box::new(FileSource::new(&args.file));
    let app = App::new(source, analysis).with_selections(settings.selections());
    run_tui(app, Duration::from_secs(args.refresh))
}

/// Run against the historian, one fetch per selected device
fn run_with_historian(settings: &Settings, args: &Args, analysis: Analysis) -> Result<()> {
    let selections = settings.selections();
    if selections.is_empty() {
        anyhow::bail!("No devices configured; add a [[sites]] section to the settings");
    }

    let window = settings
        .query
        .window(args.start, args.end, Local::now().date_naive())?;

    let runtime = tokio::runtime::Runtime::new()?;

    let historian = &settings.historian;
    let mut builder = HistorianClient::builder()
        .endpoint(historian.endpoint.as_str())
        .timeout(historian.timeout());
    if let Some(ref token) = historian.token {
        builder = builder.token(token.as_str());
    }
    let mut client = builder.build()?;

    if !client.is_authenticated() {
        if let Some((username, password)) = historian.credentials() {
            runtime
                .block_on(client.authenticate(username, password))
                .with_context(|| format!("Failed to authenticate with {}", historian.endpoint))?;
            info!(endpoint = %historian.endpoint, "Authenticated with historian");
        }
    }

    let loader = HistorianLoader::new(
        runtime.handle().clone(),
        client,
        analysis.catalog.clone(),
        window,
    )
    .with_limits(settings.query.count, settings.query.order);

    // The runtime keeps running fetches in the background while the UI owns
    // the main thread.
    let app = App::remote(Box::new(loader), selections, analysis);
    run_tui(app, Duration::from_millis(100))
}

/// Run the TUI with the given app
fn run_tui(app: App, refresh_interval: Duration) -> Result<()> {
    // Detect the background before the terminal switches to raw mode
    let mut app = app.with_theme(Theme::auto_detect());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let _ = app.reload_data();

    let result = run_app(&mut terminal, &mut app, refresh_interval);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh_interval: Duration,
) -> Result<()> {
    let mut last_refresh = Instant::now();

    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(0, area.height / 2 - 2, area.width, 5);
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(8),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::common::render_tabs(frame, app, chunks[1]);

            match app.current_view {
                View::Devices => ui::devices::render(frame, app, chunks[2]),
                View::Calendar => ui::calendar::render(frame, app, chunks[2]),
            }

            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_hourly_overlay {
                ui::detail::render_overlay(frame, app, area);
            }

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => {
                    // Content starts after header (1) + tabs (1) + table header (1)
                    events::handle_mouse_event(app, mouse, 3);
                }
                _ => {}
            }
        }

        if last_refresh.elapsed() >= refresh_interval {
            let _ = app.reload_data();
            last_refresh = Instant::now();
        }
    }

    Ok(())
}

/// Aggregate a saved historian response and write the heat map as JSON
fn export_to_file(
    input_path: &Path,
    export_path: &Path,
    analysis: &Analysis,
    args: &Args,
) -> Result<()> {
    let values = FileSource::new(input_path)
        .load()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to read {}", input_path.display()))?;

    let candidates: Vec<DeviceSelection> = discover(&values)
        .into_iter()
        .filter(|s| args.device.as_ref().map_or(true, |d| s.device == *d))
        .filter(|s| args.category.as_ref().map_or(true, |c| s.category == *c))
        .collect();
    if candidates.len() > 1 {
        warn!(
            count = candidates.len(),
            using = %candidates[0],
            "Several devices match, pass --device and --category to choose"
        );
    }

    let heatmap = candidates.first().and_then(|selection| {
        let values = filter_values(&values, selection);
        analysis.build(&values, Some(selection)).0
    });
    let Some(heatmap) = heatmap else {
        println!("No data in this period");
        return Ok(());
    };

    let json = serde_json::to_string_pretty(&heatmap)?;
    std::fs::write(export_path, json)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    println!("Exported heat map to: {}", export_path.display());
    Ok(())
}
