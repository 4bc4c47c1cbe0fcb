//! Renderer-facing view of an aggregation result.

use chrono::NaiveDate;
use serde::Serialize;

use afdd_types::{DailySummary, HourlyCell, NormalizedRecord, Severity};

use super::aggregate::{aggregate_groups, DayGroups};

/// Aggregated diagnostics of one device and category, laid out as a
/// `day × row` grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatMap {
    /// Row labels, top to bottom.
    pub rows: Vec<String>,
    /// First and last day of the grid, inclusive.
    pub domain: (NaiveDate, NaiveDate),
    /// Day-major: all rows of the first day, then the next day.
    pub summaries: Vec<DailySummary>,
}

impl HeatMap {
    /// Aggregate `records` over `rows`.
    ///
    /// Returns `None` when there are no records at all, which callers show
    /// as "No data in this period".
    pub fn build<S: AsRef<str>>(records: &[NormalizedRecord], rows: &[S]) -> Option<Self> {
        let groups = DayGroups::from_records(records);
        let domain = groups.date_range()?;
        Some(Self {
            rows: rows.iter().map(|r| r.as_ref().to_string()).collect(),
            domain,
            summaries: aggregate_groups(&groups, rows),
        })
    }

    pub fn domain(&self) -> (NaiveDate, NaiveDate) {
        self.domain
    }

    /// Number of days in the domain.
    pub fn day_count(&self) -> usize {
        let (first, last) = self.domain;
        (last - first).num_days() as usize + 1
    }

    /// Date of a column.
    pub fn day(&self, day_index: usize) -> Option<NaiveDate> {
        if day_index >= self.day_count() {
            return None;
        }
        self.domain
            .0
            .checked_add_days(chrono::Days::new(day_index as u64))
    }

    pub fn summary(&self, day_index: usize, row: usize) -> Option<&DailySummary> {
        if row >= self.rows.len() {
            return None;
        }
        self.summaries.get(day_index * self.rows.len() + row)
    }

    /// The 24 hourly cells behind a summary.
    pub fn hourly(&self, day_index: usize, row: usize) -> Option<&[HourlyCell]> {
        self.summary(day_index, row)
            .map(|s| s.hourly_result.as_slice())
    }

    /// Summaries of one row, oldest day first.
    pub fn row(&self, row: usize) -> impl Iterator<Item = &DailySummary> {
        self.summaries.iter().filter(move |s| s.row == row)
    }

    /// Number of daily summaries per severity, in legend order.
    pub fn severity_counts(&self) -> [(Severity, usize); 3] {
        Severity::ALL.map(|severity| {
            let count = self
                .summaries
                .iter()
                .filter(|s| s.severity == severity)
                .count();
            (severity, count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afdd_types::EnergyImpact;

    const ROWS: [&str; 2] = ["Temperature Sensor Dx", "Excess Outdoor-air Intake Dx"];

    fn rec(d: u32, hour: u32, row: usize, severity: Severity) -> NormalizedRecord {
        NormalizedRecord {
            datetime: NaiveDate::from_ymd_opt(2024, 2, d)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            diagnostic_name: ROWS[row].to_string(),
            error_code: "0".to_string(),
            severity,
            diagnostic_message: String::new(),
            energy_impact: Some(EnergyImpact::Value(1.5)),
        }
    }

    #[test]
    fn test_build_empty_is_none() {
        assert!(HeatMap::build(&[], &ROWS).is_none());
    }

    #[test]
    fn test_grid_access() {
        let records = vec![
            rec(28, 1, 0, Severity::Normal),
            rec(29, 5, 1, Severity::Fault),
            rec(29, 6, 1, Severity::Fault),
        ];
        let map = HeatMap::build(&records, &ROWS).unwrap();

        assert_eq!(map.day_count(), 2);
        assert_eq!(map.day(1), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert!(map.day(2).is_none());

        let summary = map.summary(1, 1).unwrap();
        assert_eq!(summary.severity, Severity::Fault);
        assert_eq!(map.hourly(1, 1).unwrap().len(), 24);
        assert!(map.summary(0, 2).is_none());
        assert!(map.summary(2, 0).is_none());
        assert_eq!(map.row(1).count(), 2);
    }

    #[test]
    fn test_severity_counts() {
        let records = vec![rec(1, 1, 0, Severity::Normal), rec(3, 1, 1, Severity::Fault)];
        let map = HeatMap::build(&records, &ROWS).unwrap();
        // Three days by two rows: one normal, one fault, the rest gap-filled.
        assert_eq!(
            map.severity_counts(),
            [
                (Severity::NoDiagnosis, 4),
                (Severity::Normal, 1),
                (Severity::Fault, 1)
            ]
        );
    }

    #[test]
    fn test_serializes_for_export() {
        let map = HeatMap::build(&[rec(1, 1, 0, Severity::Fault)], &ROWS).unwrap();
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["domain"][0], "2024-02-01");
        assert_eq!(json["summaries"][0]["severity"], "RED");
        assert_eq!(json["summaries"][0]["energy_impact"], 1.5);
        assert_eq!(json["rows"][1], "Excess Outdoor-air Intake Dx");
    }
}
