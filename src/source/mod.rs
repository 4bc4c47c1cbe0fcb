//! Data source abstraction for receiving historian batches.
//!
//! A source hands the application raw historian values (topic to
//! `[[timestamp, value], ...]`). Sources are polled from the UI loop and must
//! never block.

mod channel;
mod file;
mod remote;

pub use channel::{ChannelSource, FetchResult};
pub use file::FileSource;
pub use remote::{FetchRequest, HistorianLoader, RemoteFetch};

use std::fmt::Debug;

use afdd_historian::HistorianValues;

use crate::data::DeviceSelection;

/// Trait for receiving historian batches from various sources.
///
/// # Example
///
/// ```
/// use afdd_viz::{DataSource, FileSource};
///
/// let mut source = FileSource::new("historian.json");
/// if let Some(values) = source.poll() {
///     println!("Got {} topics", values.len());
/// }
/// ```
pub trait DataSource: Send + Debug {
    /// Poll for the latest batch.
    ///
    /// Returns `Some(values)` if new data is available, `None` otherwise.
    fn poll(&mut self) -> Option<HistorianValues>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;

    /// The error of the last poll, if any.
    fn error(&self) -> Option<&str>;

    /// Whether a request is still in flight.
    fn is_pending(&self) -> bool {
        false
    }
}

/// Opens a source that fetches the data of one device selection.
pub trait Loader: Send + Debug {
    fn open(&self, selection: &DeviceSelection) -> Box<dyn DataSource>;
}
