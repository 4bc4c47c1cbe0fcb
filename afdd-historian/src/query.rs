//! Historian queries and the JSON-RPC envelope they travel in.
//!
//! A query asks for every `algorithm × point` topic of one device and
//! diagnostic category over a time range. The platform answers with a map of
//! topic to `[[timestamp, value], ...]` pairs:
//!
//! ```json
//! {"jsonrpc": "2.0", "id": "99352-4",
//!  "result": {"values": {"Economizer_RCx/.../diagnostic message": [["2024-01-01T10:15:00", 0.0]]}}}
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use afdd_types::{DevicePath, DiagnosticCategory, Topic};

use crate::HistorianError;

/// JSON-RPC method that returns historian series.
pub const QUERY_METHOD: &str = "platform.historian.query";

/// JSON-RPC method that exchanges credentials for a token.
pub const AUTH_METHOD: &str = "get_authorization";

/// Maximum number of values requested per topic.
pub const DEFAULT_COUNT: u64 = 2_000_000;

/// Timestamp format of the `start`/`end` parameters.
pub const WIRE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Raw historian result: topic string to its `[timestamp, value]` pairs.
pub type HistorianValues = BTreeMap<String, Vec<Value>>;

/// Order in which the historian returns values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Order {
    FirstToLast,
    #[default]
    LastToFirst,
}

/// A historian query over a set of topics.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorianQuery {
    pub topics: Vec<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub count: u64,
    pub order: Order,
}

impl HistorianQuery {
    /// Query every published point of every algorithm of `category` on `device`.
    pub fn for_device(
        device: &DevicePath,
        category: &DiagnosticCategory,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        let topics = category
            .algorithms
            .iter()
            .flat_map(|algorithm| {
                category.points.iter().map(move |point| {
                    Topic::new(category.name.as_str(), device.clone(), algorithm.as_str(), *point)
                        .to_string()
                })
            })
            .collect();

        Self {
            topics,
            start,
            end,
            count: DEFAULT_COUNT,
            order: Order::default(),
        }
    }

    /// Override the value count.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// Override the ordering direction.
    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// The `params` object of the RPC call.
    pub fn params(&self) -> Value {
        json!({
            "topic": self.topics,
            "start": self.start.format(WIRE_TIME_FORMAT).to_string(),
            "end": self.end.format(WIRE_TIME_FORMAT).to_string(),
            "count": self.count,
            "order": self.order,
        })
    }
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    pub id: String,
}

impl RpcRequest {
    /// A `platform.historian.query` call.
    pub fn query(query: &HistorianQuery, token: Option<&str>, id: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: QUERY_METHOD.to_string(),
            params: query.params(),
            authorization: token.map(str::to_string),
            id: id.into(),
        }
    }

    /// A `get_authorization` call.
    pub fn authenticate(username: &str, password: &str, id: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: AUTH_METHOD.to_string(),
            params: json!({ "username": username, "password": password }),
            authorization: None,
            id: id.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

fn parse_envelope(body: &str) -> Result<Option<Value>, HistorianError> {
    let response: RpcResponse = serde_json::from_str(body)?;
    if let Some(err) = response.error {
        return Err(HistorianError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    Ok(response.result)
}

/// Extract the values map from a query response body.
///
/// A result without `values` is an empty batch. Topics whose value is not an
/// array are dropped.
pub fn parse_query_response(body: &str) -> Result<HistorianValues, HistorianError> {
    match parse_envelope(body)? {
        Some(result) => Ok(values_from_result(&result)),
        None => Ok(HistorianValues::new()),
    }
}

/// Extract the values map from the `result` member of a response.
pub fn values_from_result(result: &Value) -> HistorianValues {
    let Some(values) = result.get("values").and_then(Value::as_object) else {
        return HistorianValues::new();
    };

    values
        .iter()
        .filter_map(|(topic, series)| {
            series
                .as_array()
                .map(|pairs| (topic.clone(), pairs.clone()))
        })
        .collect()
}

/// Extract the token from a `get_authorization` response body.
pub fn parse_auth_response(body: &str) -> Result<String, HistorianError> {
    match parse_envelope(body)? {
        Some(Value::String(token)) if !token.is_empty() => Ok(token),
        _ => Err(HistorianError::Auth("no token in response".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afdd_types::DiagnosticCatalog;
    use chrono::NaiveDate;

    fn range() -> (NaiveDateTime, NaiveDateTime) {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (
            day.and_hms_opt(0, 0, 0).unwrap(),
            day.and_hms_opt(23, 59, 59).unwrap(),
        )
    }

    #[test]
    fn test_for_device_fans_out_topics() {
        let catalog = DiagnosticCatalog::builtin();
        let device = DevicePath::new("PNNL", "BUILDING1", "AHU1");
        let (start, end) = range();

        let economizer = catalog.get("Economizer_RCx").unwrap();
        let query = HistorianQuery::for_device(&device, economizer, start, end);
        assert_eq!(query.topics.len(), 10);
        assert_eq!(
            query.topics[0],
            "Economizer_RCx/PNNL/BUILDING1/AHU1/Temperature Sensor Dx/diagnostic message"
        );
        assert_eq!(
            query.topics[1],
            "Economizer_RCx/PNNL/BUILDING1/AHU1/Temperature Sensor Dx/energy impact"
        );
        assert_eq!(query.count, DEFAULT_COUNT);
        assert_eq!(query.order, Order::LastToFirst);

        let airside = catalog.get("Airside_RCx").unwrap();
        let query = HistorianQuery::for_device(&device, airside, start, end);
        assert_eq!(query.topics.len(), 9);
        assert!(query.topics.iter().all(|t| t.ends_with("/diagnostic message")));
    }

    #[test]
    fn test_rpc_request_serialization() {
        let (start, end) = range();
        let query = HistorianQuery {
            topics: vec!["a/b/c/d/e/diagnostic message".to_string()],
            start,
            end,
            count: 10,
            order: Order::FirstToLast,
        };
        let request = RpcRequest::query(&query, Some("tok"), "1");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], QUERY_METHOD);
        assert_eq!(json["authorization"], "tok");
        assert_eq!(json["params"]["start"], "2024-01-01 00:00:00");
        assert_eq!(json["params"]["end"], "2024-01-01 23:59:59");
        assert_eq!(json["params"]["order"], "FIRST_TO_LAST");
        assert_eq!(json["params"]["count"], 10);

        let auth = serde_json::to_value(RpcRequest::authenticate("admin", "pw", "1")).unwrap();
        assert_eq!(auth["method"], AUTH_METHOD);
        assert_eq!(auth["params"]["username"], "admin");
        assert!(auth.get("authorization").is_none());
    }

    #[test]
    fn test_parse_query_response() {
        let body = r#"{"jsonrpc":"2.0","id":"1","result":{"values":{
            "t/1": [["2024-01-01T10:15:00", 0.0], null],
            "t/2": "garbage"
        }}}"#;
        let values = parse_query_response(body).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["t/1"].len(), 2);

        let empty = parse_query_response(r#"{"jsonrpc":"2.0","result":{}}"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        let body = r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"method not found"}}"#;
        assert!(matches!(
            parse_query_response(body),
            Err(HistorianError::Rpc { code: -32601, .. })
        ));
        assert!(matches!(
            parse_query_response("not json"),
            Err(HistorianError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_auth_response() {
        assert_eq!(
            parse_auth_response(r#"{"result":"abc123"}"#).unwrap(),
            "abc123"
        );
        assert!(matches!(
            parse_auth_response(r#"{"result":""}"#),
            Err(HistorianError::Auth(_))
        ));
    }
}
