//! # afdd-viz
//!
//! Heat-map viewer and library for automated fault detection and diagnostics
//! (AFDD) results of building HVAC equipment.
//!
//! Diagnostic algorithms publish an error code per run into a historian. This
//! crate fetches those series, maps every code to a severity and message,
//! keeps the worst result per hour, rolls the hours up per day and draws the
//! result as a `diagnostic × day` heat map in the terminal.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐  │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│  │
//! │  │ (state) │    │(heat map)│    │(render) │    │         │  │
//! │  └────┬────┘    └──────────┘    └─────────┘    └─────────┘  │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  ┌─────────┐                                                │
//! │  │ source  │◀── FileSource | ChannelSource | RemoteFetch    │
//! │  │ (input) │                                                │
//! │  └─────────┘                                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, device selection and calendar navigation
//! - **[`source`]**: Data source abstraction ([`DataSource`] trait) with
//!   implementations for saved historian dumps and background historian fetches
//! - **[`data`]**: Normalization, hourly/daily aggregation and the [`HeatMap`]
//!   view model
//! - **[`ui`]**: Terminal rendering using ratatui
//! - **[`config`]**: Settings from a TOML file and `AFDD_*` environment variables
//! - **[`logging`]**: `tracing` subscriber setup
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Browse a saved historian response
//! afdd-viz --file historian.json
//!
//! # Fetch from the historian configured in afdd.toml
//! afdd-viz --connect --config afdd.toml --start 2024-01-01 --end 2024-01-08
//!
//! # Write the heat map as JSON instead of opening the UI
//! afdd-viz --file historian.json --export heatmap.json
//! ```
//!
//! ### As a library with a file source
//!
//! ```
//! use afdd_viz::{Analysis, App, FileSource};
//!
//! let source = Box::new(FileSource::new("historian.json"));
//! let app = App::new(source, Analysis::default());
//! ```
//!
//! ### Aggregating without the UI
//!
//! ```
//! use afdd_historian::HistorianValues;
//! use afdd_types::Severity;
//! use afdd_viz::Analysis;
//! use serde_json::json;
//!
//! let mut values = HistorianValues::new();
//! values.insert(
//!     "Airside_RCx/PNNL/BUILDING1/AHU1/Low Duct Static Pressure Dx/diagnostic message".into(),
//!     vec![json!(["2024-01-01T08:00:00", 0.0])],
//! );
//!
//! let (heatmap, _) = Analysis::default().build(&values, None);
//! let heatmap = heatmap.unwrap();
//! assert_eq!(heatmap.day_count(), 1);
//! assert_eq!(heatmap.summary(0, 1).unwrap().severity, Severity::Normal);
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod logging;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::Settings;
pub use data::{Analysis, DeviceSelection, HeatMap};
pub use source::{ChannelSource, DataSource, FileSource, HistorianLoader, Loader, RemoteFetch};
