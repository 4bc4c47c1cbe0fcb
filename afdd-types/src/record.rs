//! Normalized records and aggregated heat-map cells.

use core::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::{Severity, HOURS_PER_DAY};

/// Estimated energy impact attached to a diagnostic result.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EnergyImpact {
    /// A numeric estimate.
    Value(f64),
    /// The sentinel "not applicable" (`NA`).
    #[default]
    NotApplicable,
}

impl EnergyImpact {
    /// Interpret a textual value: numbers parse, anything else is `NA`.
    pub fn from_text(s: &str) -> Self {
        match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => EnergyImpact::Value(v),
            _ => EnergyImpact::NotApplicable,
        }
    }

    /// The numeric value, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            EnergyImpact::Value(v) => Some(*v),
            EnergyImpact::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, EnergyImpact::Value(_))
    }
}

impl fmt::Display for EnergyImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnergyImpact::Value(v) => {
                let s = format!("{:.2}", v);
                let s = s.trim_end_matches('0').trim_end_matches('.');
                f.write_str(s)
            }
            EnergyImpact::NotApplicable => f.write_str("NA"),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for EnergyImpact {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EnergyImpact::Value(v) => serializer.serialize_f64(*v),
            EnergyImpact::NotApplicable => serializer.serialize_str("NA"),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for EnergyImpact {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum NumberOrText {
            Number(f64),
            Text(String),
        }

        Ok(match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(v) => EnergyImpact::Value(v),
            NumberOrText::Text(s) => EnergyImpact::from_text(&s),
        })
    }
}

/// One diagnostic-message event, enriched with its lookup results and the
/// joined energy impact.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizedRecord {
    /// Wall-clock instant of the event (no timezone conversion applied).
    pub datetime: NaiveDateTime,
    pub diagnostic_name: String,
    /// Key into the category's lookup table, e.g. `"21.1"`.
    pub error_code: String,
    pub severity: Severity,
    pub diagnostic_message: String,
    /// `None` when no energy-impact event matched this record's minute.
    pub energy_impact: Option<EnergyImpact>,
}

impl NormalizedRecord {
    /// Calendar day of the record.
    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }

    /// Hour of day, 0-23.
    pub fn hour(&self) -> u8 {
        self.datetime.hour() as u8
    }
}

/// The resolved state of one (date, diagnostic, hour) cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HourlyCell {
    pub date: NaiveDate,
    /// Hour of day, 0-23.
    pub hour: u8,
    /// Empty for gap-filled cells.
    pub diagnostic_name: String,
    pub severity: Severity,
    pub diagnostic_message: String,
    pub energy_impact: EnergyImpact,
}

impl HourlyCell {
    /// The default cell used when no record exists for the hour.
    pub fn missing(date: NaiveDate, hour: u8) -> Self {
        Self {
            date,
            hour,
            diagnostic_name: String::new(),
            severity: Severity::NoDiagnosis,
            diagnostic_message: Severity::NoDiagnosis.label().to_string(),
            energy_impact: EnergyImpact::NotApplicable,
        }
    }

    /// A cell backed by a record.
    pub fn from_record(
        record: &NormalizedRecord,
        date: NaiveDate,
        hour: u8,
        energy_impact: EnergyImpact,
    ) -> Self {
        Self {
            date,
            hour,
            diagnostic_name: record.diagnostic_name.clone(),
            severity: record.severity,
            diagnostic_message: record.diagnostic_message.clone(),
            energy_impact,
        }
    }

    /// Whether the cell was gap-filled rather than backed by a record.
    pub fn is_missing(&self) -> bool {
        self.diagnostic_name.is_empty()
    }
}

/// Daily roll-up of one diagnostic row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Index of the diagnostic in the row list it was aggregated with.
    pub row: usize,
    /// Name carried by the winning hourly cell; empty when nothing was reported.
    pub diagnostic_name: String,
    /// Worst severity among the hourly cells.
    pub severity: Severity,
    pub diagnostic_message: String,
    pub energy_impact: EnergyImpact,
    /// Exactly 24 cells, hour 0 first.
    pub hourly_result: Vec<HourlyCell>,
}

impl DailySummary {
    /// A summary with every hour gap-filled.
    pub fn missing(date: NaiveDate, row: usize) -> Self {
        Self {
            date,
            row,
            diagnostic_name: String::new(),
            severity: Severity::NoDiagnosis,
            diagnostic_message: Severity::NoDiagnosis.label().to_string(),
            energy_impact: EnergyImpact::NotApplicable,
            hourly_result: (0..HOURS_PER_DAY as u8)
                .map(|hour| HourlyCell::missing(date, hour))
                .collect(),
        }
    }

    /// Number of hours that carry a real result.
    pub fn reported_hours(&self) -> usize {
        self.hourly_result.iter().filter(|c| !c.is_missing()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_energy_impact_display() {
        assert_eq!(EnergyImpact::NotApplicable.to_string(), "NA");
        assert_eq!(EnergyImpact::Value(12.0).to_string(), "12");
        assert_eq!(EnergyImpact::Value(1.23456).to_string(), "1.23");
        assert_eq!(EnergyImpact::Value(0.5).to_string(), "0.5");
    }

    #[test]
    fn test_energy_impact_from_text() {
        assert_eq!(EnergyImpact::from_text("NA"), EnergyImpact::NotApplicable);
        assert_eq!(EnergyImpact::from_text(" 4.5 "), EnergyImpact::Value(4.5));
        assert_eq!(EnergyImpact::from_text("NaN"), EnergyImpact::NotApplicable);
    }

    #[test]
    fn test_missing_summary_has_24_default_hours() {
        let summary = DailySummary::missing(day(), 3);
        assert_eq!(summary.row, 3);
        assert_eq!(summary.hourly_result.len(), HOURS_PER_DAY);
        assert_eq!(summary.reported_hours(), 0);
        for (hour, cell) in summary.hourly_result.iter().enumerate() {
            assert_eq!(cell.hour as usize, hour);
            assert_eq!(cell.severity, Severity::NoDiagnosis);
            assert_eq!(cell.diagnostic_message, "No Diagnosis");
            assert_eq!(cell.energy_impact, EnergyImpact::NotApplicable);
        }
    }

    #[test]
    fn test_record_date_and_hour() {
        let record = NormalizedRecord {
            datetime: day().and_hms_opt(17, 45, 0).unwrap(),
            diagnostic_name: "Temperature Sensor Dx".to_string(),
            error_code: "0".to_string(),
            severity: Severity::Normal,
            diagnostic_message: "No problems detected.".to_string(),
            energy_impact: None,
        };
        assert_eq!(record.date(), day());
        assert_eq!(record.hour(), 17);

        let cell = HourlyCell::from_record(&record, day(), 17, EnergyImpact::Value(2.0));
        assert!(!cell.is_missing());
        assert_eq!(cell.severity, Severity::Normal);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_energy_impact_serde() {
        assert_eq!(
            serde_json::to_string(&EnergyImpact::NotApplicable).unwrap(),
            "\"NA\""
        );
        let v: EnergyImpact = serde_json::from_str("7.25").unwrap();
        assert_eq!(v, EnergyImpact::Value(7.25));
        let na: EnergyImpact = serde_json::from_str("\"NA\"").unwrap();
        assert_eq!(na, EnergyImpact::NotApplicable);
    }
}
