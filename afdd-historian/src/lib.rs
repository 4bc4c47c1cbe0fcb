//! # afdd-historian
//!
//! Adapter for the historian JSON-RPC API that stores AFDD diagnostic output.
//!
//! Diagnostic algorithms publish an error code (`diagnostic message`) and,
//! for some categories, an `energy impact` estimate per run. This crate builds
//! the queries that fetch those series for one device and hands back the raw
//! topic → `[[timestamp, value], ...]` map for normalization.
//!
//! ## Features
//!
//! - `http` (default): [`HistorianClient`], an async client built on `reqwest`
//!
//! Without `http` the crate still provides the query builder, the RPC
//! envelope and response parsing, so callers can bring their own transport.
//!
//! ## Quick Start
//!
//! ```rust
//! use afdd_historian::{parse_query_response, HistorianQuery};
//! use afdd_types::{DevicePath, DiagnosticCatalog};
//! use chrono::NaiveDate;
//!
//! let catalog = DiagnosticCatalog::builtin();
//! let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let query = HistorianQuery::for_device(
//!     &DevicePath::new("PNNL", "BUILDING1", "AHU1"),
//!     catalog.get("Airside_RCx").unwrap(),
//!     day.and_hms_opt(0, 0, 0).unwrap(),
//!     day.and_hms_opt(23, 59, 59).unwrap(),
//! );
//! assert_eq!(query.topics.len(), 9);
//!
//! let values = parse_query_response(r#"{"result": {"values": {}}}"#).unwrap();
//! assert!(values.is_empty());
//! ```

pub mod cache;
pub mod error;
pub mod query;

#[cfg(feature = "http")]
pub mod client;

pub use cache::RequestCache;
pub use error::HistorianError;
pub use query::{
    parse_auth_response, parse_query_response, HistorianQuery, HistorianValues, Order, RpcRequest,
};

#[cfg(feature = "http")]
pub use client::{HistorianClient, HistorianClientBuilder};
