//! Background historian fetches.
//!
//! A visualization request becomes a [`RemoteFetch`]: the queries run on the
//! tokio runtime and the merged result comes back through a
//! [`ChannelSource`]. Dropping the fetch aborts the task, so a request that
//! has been superseded can never deliver stale data.

use chrono::NaiveDateTime;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use afdd_historian::{HistorianClient, HistorianQuery, HistorianValues, Order, RequestCache};
use afdd_types::DiagnosticCatalog;

use super::{ChannelSource, DataSource, FetchResult, Loader};
use crate::data::DeviceSelection;

/// One historian query and the cache key it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub key: String,
    pub query: HistorianQuery,
}

/// A historian fetch running in the background.
#[derive(Debug)]
pub struct RemoteFetch {
    source: ChannelSource,
    handle: JoinHandle<()>,
}

impl RemoteFetch {
    /// Start fetching `requests` on `runtime`.
    ///
    /// Requests sharing a key are fetched once. The first failure ends the
    /// fetch and is reported as the source error.
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// use afdd_historian::{HistorianClient, HistorianQuery};
    /// use afdd_types::{DevicePath, DiagnosticCatalog};
    /// use afdd_viz::source::{DataSource, FetchRequest, RemoteFetch};
    /// use chrono::NaiveDate;
    ///
    /// # tokio_test::block_on(async {
    /// let device = DevicePath::new("PNNL", "BUILDING1", "AHU1");
    /// let catalog = DiagnosticCatalog::builtin();
    /// let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    /// let query = HistorianQuery::for_device(
    ///     &device,
    ///     catalog.get("Airside_RCx").unwrap(),
    ///     day.and_hms_opt(0, 0, 0).unwrap(),
    ///     day.and_hms_opt(23, 59, 59).unwrap(),
    /// );
    ///
    /// let client = HistorianClient::builder().build().unwrap();
    /// let request = FetchRequest { key: device.cache_key("Airside_RCx"), query };
    /// let mut fetch = RemoteFetch::spawn(&tokio::runtime::Handle::current(), client, vec![request]);
    /// while fetch.is_pending() {
    ///     if let Some(values) = fetch.poll() {
    ///         println!("{} topics", values.len());
    ///     }
    ///     tokio::time::sleep(Duration::from_millis(50)).await;
    /// }
    /// # });
    /// ```
    pub fn spawn(runtime: &Handle, client: HistorianClient, requests: Vec<FetchRequest>) -> Self {
        let keys: Vec<&str> = requests.iter().map(|r| r.key.as_str()).collect();
        let (tx, source) = ChannelSource::create(&format!("historian: {}", keys.join(", ")));

        let handle = runtime.spawn(async move {
            let result = fetch_all(&client, &requests).await;
            // The receiver is gone when the fetch was superseded.
            let _ = tx.send(Some(result));
        });

        Self { source, handle }
    }
}

async fn fetch_all(client: &HistorianClient, requests: &[FetchRequest]) -> FetchResult {
    let mut cache = RequestCache::new();

    for request in requests {
        info!(
            key = %request.key,
            topics = request.query.topics.len(),
            "Fetching historian series"
        );
        if let Err(e) = cache
            .get_or_fetch(&request.key, || client.query(&request.query))
            .await
        {
            warn!(key = %request.key, error = %e, "Historian fetch failed");
            return Err(e.to_string());
        }
    }

    let values: HistorianValues = cache.merged();
    info!(topics = values.len(), "Historian fetch complete");
    Ok(values)
}

impl Drop for RemoteFetch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl DataSource for RemoteFetch {
    fn poll(&mut self) -> Option<HistorianValues> {
        self.source.poll()
    }

    fn description(&self) -> &str {
        self.source.description()
    }

    fn error(&self) -> Option<&str> {
        self.source.error()
    }

    fn is_pending(&self) -> bool {
        self.source.is_pending()
    }
}

/// Opens a [`RemoteFetch`] per device selection.
#[derive(Debug, Clone)]
pub struct HistorianLoader {
    runtime: Handle,
    client: HistorianClient,
    catalog: DiagnosticCatalog,
    start: NaiveDateTime,
    end: NaiveDateTime,
    count: u64,
    order: Order,
}

impl HistorianLoader {
    pub fn new(
        runtime: Handle,
        client: HistorianClient,
        catalog: DiagnosticCatalog,
        (start, end): (NaiveDateTime, NaiveDateTime),
    ) -> Self {
        Self {
            runtime,
            client,
            catalog,
            start,
            end,
            count: afdd_historian::query::DEFAULT_COUNT,
            order: Order::default(),
        }
    }

    /// Override the value count and ordering of every query.
    pub fn with_limits(mut self, count: u64, order: Order) -> Self {
        self.count = count;
        self.order = order;
        self
    }

    /// The request for a selection, `None` for an unknown category.
    pub fn request(&self, selection: &DeviceSelection) -> Option<FetchRequest> {
        let category = self.catalog.get(&selection.category)?;
        let query = HistorianQuery::for_device(&selection.device, category, self.start, self.end)
            .with_count(self.count)
            .with_order(self.order);
        Some(FetchRequest {
            key: selection.cache_key(),
            query,
        })
    }
}

impl Loader for HistorianLoader {
    fn open(&self, selection: &DeviceSelection) -> Box<dyn DataSource> {
        match self.request(selection) {
            Some(request) => Box::new(RemoteFetch::spawn(
                &self.runtime,
                self.client.clone(),
                vec![request],
            )),
            None => Box::new(ChannelSource::failed(
                &selection.cache_key(),
                format!("Unknown diagnostic category '{}'", selection.category),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afdd_types::DevicePath;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn window() -> (NaiveDateTime, NaiveDateTime) {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (
            day.and_hms_opt(0, 0, 0).unwrap(),
            day.and_hms_opt(23, 59, 59).unwrap(),
        )
    }

    fn unreachable_client() -> HistorianClient {
        HistorianClient::builder()
            .endpoint("http://127.0.0.1:1")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap()
    }

    fn selection(category: &str) -> DeviceSelection {
        DeviceSelection::new(DevicePath::new("PNNL", "BUILDING1", "AHU1"), category)
    }

    #[tokio::test]
    async fn test_loader_request() {
        let loader = HistorianLoader::new(
            Handle::current(),
            unreachable_client(),
            DiagnosticCatalog::builtin(),
            window(),
        )
        .with_limits(100, Order::FirstToLast);

        let request = loader.request(&selection("Economizer_RCx")).unwrap();
        assert_eq!(request.key, "PNNL__BUILDING1__AHU1__Economizer_RCx");
        assert_eq!(request.query.count, 100);
        assert_eq!(request.query.order, Order::FirstToLast);
        assert_eq!(request.query.topics.len(), 10);

        assert!(loader.request(&selection("Chiller_RCx")).is_none());
    }

    #[tokio::test]
    async fn test_unknown_category_reports_error() {
        let loader = HistorianLoader::new(
            Handle::current(),
            unreachable_client(),
            DiagnosticCatalog::builtin(),
            window(),
        );
        let mut source = loader.open(&selection("Chiller_RCx"));
        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Chiller_RCx"));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_reported() {
        let loader = HistorianLoader::new(
            Handle::current(),
            unreachable_client(),
            DiagnosticCatalog::builtin(),
            window(),
        );
        let mut source = loader.open(&selection("Airside_RCx"));

        for _ in 0..100 {
            if !source.is_pending() {
                break;
            }
            assert!(source.poll().is_none());
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(source.error().is_some());
    }
}
