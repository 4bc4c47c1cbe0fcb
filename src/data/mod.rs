//! Diagnostic data processing.
//!
//! This module turns raw historian series into the gap-filled grid drawn by
//! the heat map.
//!
//! ## Submodules
//!
//! - [`normalize`]: Topic parsing, error-code lookup and the energy-impact join
//! - [`aggregate`]: Grouping by day/diagnostic/hour, tie resolution, gap filling
//!   and the daily roll-up
//! - [`heatmap`]: The renderer-facing [`HeatMap`] view model
//! - [`selection`]: Device/category selections and batch filtering
//! - [`analysis`]: Tables and row layouts tying the steps together
//!
//! ## Data Flow
//!
//! ```text
//! HistorianValues (topic -> [[ts, value], ...])
//!        │
//!        ▼
//! normalize_batch()  ──▶ skipped records (logged)
//!        │
//!        ▼
//! Vec<NormalizedRecord>
//!        │
//!        ▼
//! HeatMap::build(records, rows)
//!        │
//!        └──▶ Vec<DailySummary> (days × rows, 24 hourly cells each)
//! ```

pub mod aggregate;
pub mod analysis;
pub mod heatmap;
pub mod normalize;
pub mod selection;

pub use aggregate::{aggregate, DayGroups};
pub use analysis::Analysis;
pub use heatmap::HeatMap;
pub use normalize::{
    normalize, normalize_batch, split_series, DiagnosticEvent, NormalizeOutcome, SkipReason,
    SkippedRecord,
};
pub use selection::{discover, filter_values, DeviceSelection};
