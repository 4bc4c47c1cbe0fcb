//! HTTP client for the historian JSON-RPC endpoint.
//!
//! ## Example
//!
//! ```rust,no_run
//! use afdd_historian::{HistorianClient, HistorianQuery};
//! use afdd_types::{DevicePath, DiagnosticCatalog};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = HistorianClient::builder()
//!         .endpoint("http://localhost:8080")
//!         .build()?;
//!     client.authenticate("admin", "admin").await?;
//!
//!     let catalog = DiagnosticCatalog::builtin();
//!     let device = DevicePath::new("PNNL", "BUILDING1", "AHU1");
//!     let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//!     let query = HistorianQuery::for_device(
//!         &device,
//!         catalog.get("Economizer_RCx").unwrap(),
//!         day.and_hms_opt(0, 0, 0).unwrap(),
//!         day.and_hms_opt(23, 59, 59).unwrap(),
//!     );
//!
//!     let values = client.query(&query).await?;
//!     for (topic, pairs) in &values {
//!         println!("{}: {} values", topic, pairs.len());
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::query::{parse_auth_response, parse_query_response, RpcRequest};
use crate::{HistorianError, HistorianQuery, HistorianValues};

/// Default platform endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the historian JSON-RPC API.
#[derive(Debug, Clone)]
pub struct HistorianClient {
    client: Client,
    endpoint: String,
    token: Option<String>,
    next_id: Arc<AtomicU64>,
}

impl HistorianClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> HistorianClientBuilder {
        HistorianClientBuilder::default()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether a token is available for queries.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Exchange credentials for a token and keep it for later queries.
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<(), HistorianError> {
        let request = RpcRequest::authenticate(username, password, self.request_id());
        let body = self.post(&request).await?;
        self.token = Some(parse_auth_response(&body)?);
        Ok(())
    }

    /// Run a historian query.
    pub async fn query(&self, query: &HistorianQuery) -> Result<HistorianValues, HistorianError> {
        let request = RpcRequest::query(query, self.token.as_deref(), self.request_id());
        let body = self.post(&request).await?;
        parse_query_response(&body)
    }

    async fn post(&self, request: &RpcRequest) -> Result<String, HistorianError> {
        let url = rpc_url(&self.endpoint);

        let response = self.client.post(&url).json(request).send().await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(HistorianError::Auth("Invalid credentials".to_string()));
        }

        if !response.status().is_success() {
            return Err(HistorianError::Http(format!(
                "Historian returned status {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }

    fn request_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

/// Builder for HistorianClient.
#[derive(Debug, Default)]
pub struct HistorianClientBuilder {
    endpoint: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl HistorianClientBuilder {
    /// Set the platform endpoint (e.g., "http://localhost:8080").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Use an existing authorization token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HistorianClient, HistorianError> {
        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        Ok(HistorianClient {
            client,
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            token: self.token.filter(|t| !t.is_empty()),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }
}

fn rpc_url(endpoint: &str) -> String {
    format!("{}/jsonrpc", endpoint.trim_end_matches('/'))
}
