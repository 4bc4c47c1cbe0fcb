//! Record normalization.
//!
//! Turns the raw historian series into [`NormalizedRecord`]s: every
//! diagnostic-message event gets its severity and message from the
//! category's error-code table, and the energy impact published by the same
//! algorithm in the same minute.
//!
//! Nothing here fails a batch. Malformed pairs, unparsable topics and codes
//! missing from the tables are skipped and reported in the outcome.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Timelike};
use serde_json::Value;
use tracing::{debug, info};

use afdd_historian::HistorianValues;
use afdd_types::{
    DevicePath, EnergyImpact, ErrorCodeTables, LookupError, NormalizedRecord, PointKind, Topic,
};

/// Formats accepted for timestamps without an offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// One raw `[timestamp, value]` pair of a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEvent {
    pub topic: Topic,
    pub timestamp: String,
    pub value: Value,
}

impl DiagnosticEvent {
    pub fn new(topic: Topic, timestamp: impl Into<String>, value: Value) -> Self {
        Self {
            topic,
            timestamp: timestamp.into(),
            value,
        }
    }
}

/// Historian values split by point kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitSeries {
    pub diagnostics: Vec<DiagnosticEvent>,
    pub energy: Vec<DiagnosticEvent>,
    /// Pairs dropped because the topic or the pair itself was malformed.
    pub malformed: usize,
}

/// Why a diagnostic event did not produce a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("unparsable timestamp '{0}'")]
    Timestamp(String),

    #[error("error code is not a number: {0}")]
    ErrorCode(Value),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// A diagnostic event that was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub topic: String,
    pub timestamp: String,
    pub reason: SkipReason,
}

/// Result of normalizing a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutcome {
    pub records: Vec<NormalizedRecord>,
    pub skipped: Vec<SkippedRecord>,
    /// Malformed pairs dropped before normalization.
    pub malformed: usize,
}

impl NormalizeOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Split a historian result into diagnostic-message and energy-impact events.
pub fn split_series(values: &HistorianValues) -> SplitSeries {
    let mut split = SplitSeries::default();

    for (topic_str, pairs) in values {
        let topic = match Topic::parse(topic_str) {
            Ok(topic) => topic,
            Err(e) => {
                debug!(topic = %topic_str, error = %e, "Skipping unparsable topic");
                split.malformed += pairs.len();
                continue;
            }
        };

        for pair in pairs {
            let Some((timestamp, value)) = parse_pair(pair) else {
                debug!(topic = %topic_str, "Skipping malformed pair");
                split.malformed += 1;
                continue;
            };

            let event = DiagnosticEvent::new(topic.clone(), timestamp, value.clone());
            match topic.point {
                PointKind::DiagnosticMessage => split.diagnostics.push(event),
                PointKind::EnergyImpact => split.energy.push(event),
            }
        }
    }

    split
}

fn parse_pair(pair: &Value) -> Option<(&str, &Value)> {
    match pair.as_array()?.as_slice() {
        [Value::String(ts), value, ..] if !value.is_null() => Some((ts.as_str(), value)),
        _ => None,
    }
}

/// Normalize diagnostic events, joining energy impact from the energy events.
pub fn normalize(
    diagnostics: &[DiagnosticEvent],
    energy: &[DiagnosticEvent],
    tables: &ErrorCodeTables,
) -> NormalizeOutcome {
    let energy_index = EnergyIndex::build(energy);
    let mut outcome = NormalizeOutcome::default();

    for event in diagnostics {
        match normalize_event(event, &energy_index, tables) {
            Ok(record) => outcome.records.push(record),
            Err(reason) => {
                debug!(
                    topic = %event.topic,
                    timestamp = %event.timestamp,
                    reason = %reason,
                    "Skipping diagnostic event"
                );
                outcome.skipped.push(SkippedRecord {
                    topic: event.topic.to_string(),
                    timestamp: event.timestamp.clone(),
                    reason,
                });
            }
        }
    }

    outcome
}

/// [`split_series`] followed by [`normalize`].
pub fn normalize_batch(values: &HistorianValues, tables: &ErrorCodeTables) -> NormalizeOutcome {
    let split = split_series(values);
    let mut outcome = normalize(&split.diagnostics, &split.energy, tables);
    outcome.malformed = split.malformed;

    info!(
        records = outcome.records.len(),
        skipped = outcome.skipped.len(),
        malformed = outcome.malformed,
        "Normalized historian batch"
    );
    outcome
}

fn normalize_event(
    event: &DiagnosticEvent,
    energy: &EnergyIndex<'_>,
    tables: &ErrorCodeTables,
) -> Result<NormalizedRecord, SkipReason> {
    let datetime = parse_timestamp(&event.timestamp)
        .ok_or_else(|| SkipReason::Timestamp(event.timestamp.clone()))?;
    let error_code =
        error_code_string(&event.value).ok_or_else(|| SkipReason::ErrorCode(event.value.clone()))?;
    let entry = tables.resolve(&event.topic.category, &error_code)?;

    Ok(NormalizedRecord {
        datetime,
        diagnostic_name: event.topic.algorithm.clone(),
        error_code,
        severity: entry.severity,
        diagnostic_message: entry.message.clone(),
        energy_impact: energy.find(&event.topic, datetime),
    })
}

/// Energy events keyed by source and minute. Later events overwrite earlier
/// ones, so the last match in input order wins.
struct EnergyIndex<'a> {
    by_minute: HashMap<(&'a str, &'a DevicePath, &'a str, NaiveDateTime), EnergyImpact>,
}

impl<'a> EnergyIndex<'a> {
    fn build(events: &'a [DiagnosticEvent]) -> Self {
        let mut by_minute = HashMap::new();
        for event in events {
            let Some(minute) = parse_timestamp(&event.timestamp).and_then(truncate_to_minute)
            else {
                debug!(topic = %event.topic, timestamp = %event.timestamp, "Skipping energy event");
                continue;
            };
            let topic = &event.topic;
            by_minute.insert(
                (
                    topic.category.as_str(),
                    &topic.device,
                    topic.algorithm.as_str(),
                    minute,
                ),
                energy_value(&event.value),
            );
        }
        Self { by_minute }
    }

    fn find(&self, topic: &Topic, datetime: NaiveDateTime) -> Option<EnergyImpact> {
        let minute = truncate_to_minute(datetime)?;
        self.by_minute
            .get(&(
                topic.category.as_str(),
                &topic.device,
                topic.algorithm.as_str(),
                minute,
            ))
            .copied()
    }
}

fn truncate_to_minute(datetime: NaiveDateTime) -> Option<NaiveDateTime> {
    datetime.with_second(0)?.with_nanosecond(0)
}

fn energy_value(value: &Value) -> EnergyImpact {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(EnergyImpact::Value)
            .unwrap_or(EnergyImpact::NotApplicable),
        Value::String(s) => EnergyImpact::from_text(s),
        _ => EnergyImpact::NotApplicable,
    }
}

/// Parse a historian timestamp, keeping its wall-clock fields.
///
/// A UTC offset, if present, is dropped without converting.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// String form of an error code as used by the lookup tables.
///
/// Integral numbers print without a fraction (`10`), others in their shortest
/// form (`21.1`).
pub fn error_code_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(|f| f.to_string())
            }
        }
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
