//! Channel-based data source.
//!
//! Receives historian batches via a tokio watch channel. The producer is
//! usually a background fetch: it sends exactly one result when the request
//! completes, and the UI picks it up on its next poll.

use tokio::sync::watch;

use afdd_historian::HistorianValues;

use super::DataSource;

/// Outcome of a fetch as sent over the channel; errors are display strings.
pub type FetchResult = Result<HistorianValues, String>;

/// A data source that receives historian batches via a channel.
///
/// # Example
///
/// ```
/// use afdd_viz::{ChannelSource, DataSource};
///
/// let (tx, mut source) = ChannelSource::create("historian");
/// assert!(source.is_pending());
///
/// tx.send(Some(Ok(Default::default()))).unwrap();
/// assert!(source.poll().is_some());
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: watch::Receiver<Option<FetchResult>>,
    description: String,
    last_error: Option<String>,
    /// Set once any result (data or error) has been taken from the channel.
    received: bool,
}

impl ChannelSource {
    /// Create a new channel source.
    ///
    /// # Arguments
    ///
    /// * `receiver` - The receiving end of a watch channel
    /// * `source_description` - A description of where batches come from
    pub fn new(receiver: watch::Receiver<Option<FetchResult>>, source_description: &str) -> Self {
        let description = format!("channel: {}", source_description);
        Self {
            receiver,
            description,
            last_error: None,
            received: false,
        }
    }

    /// Create a channel pair for sending results to a ChannelSource.
    ///
    /// The channel starts empty (`None`); the sender publishes `Some(result)`.
    pub fn create(source_description: &str) -> (watch::Sender<Option<FetchResult>>, Self) {
        let (tx, rx) = watch::channel(None);
        let source = Self::new(rx, source_description);
        (tx, source)
    }

    /// A source that only reports `message` as its error.
    pub fn failed(source_description: &str, message: impl Into<String>) -> Self {
        let (tx, source) = Self::create(source_description);
        let _ = tx.send(Some(Err(message.into())));
        source
    }
}

impl DataSource for ChannelSource {
    fn poll(&mut self) -> Option<HistorianValues> {
        // A closed channel may still hold a value we have not read.
        let changed = match self.receiver.has_changed() {
            Ok(changed) => changed,
            Err(_) => !self.received,
        };
        if !changed {
            return None;
        }

        let latest = self.receiver.borrow_and_update().clone();
        match latest {
            Some(Ok(values)) => {
                self.received = true;
                self.last_error = None;
                Some(values)
            }
            Some(Err(e)) => {
                self.received = true;
                self.last_error = Some(e);
                None
            }
            None => {
                if self.receiver.has_changed().is_err() {
                    self.received = true;
                    self.last_error = Some("Fetch ended without a result".to_string());
                }
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn is_pending(&self) -> bool {
        !self.received
    }
}
