//! # afdd-types
//!
//! Core types for automated fault detection and diagnostics (AFDD) heat maps.
//! This crate defines the vocabulary shared by the historian adapter, the
//! aggregation engine and any renderer that draws its output.
//!
//! ## Contents
//!
//! - **Severity model**: the fixed, totally ordered set of diagnostic states
//!   ([`Severity`]) with their colors and legend labels
//! - **Topics**: historian topic paths ([`Topic`], [`DevicePath`], [`PointKind`])
//! - **Records and cells**: normalized diagnostic records and the hourly/daily
//!   cells of the aggregated grid ([`NormalizedRecord`], [`HourlyCell`], [`DailySummary`])
//! - **Catalog**: error-code lookup tables and the per-category diagnostic
//!   row lists ([`ErrorCodeTables`], [`DiagnosticCatalog`])
//!
//! ## Features
//!
//! - `serde`: JSON/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use afdd_types::{ErrorCodeTables, Severity};
//!
//! let tables = ErrorCodeTables::builtin();
//! let entry = tables.lookup("Economizer_RCx", "21.1").unwrap();
//!
//! assert_eq!(entry.severity, Severity::Fault);
//! assert!(Severity::Fault > Severity::Normal);
//! assert_eq!(Severity::NoDiagnosis.label(), "No Diagnosis");
//! ```

mod catalog;
mod record;
mod severity;
mod topic;

pub use catalog::*;
pub use record::*;
pub use severity::*;
pub use topic::*;

/// Number of hourly cells in every daily summary.
pub const HOURS_PER_DAY: usize = 24;
