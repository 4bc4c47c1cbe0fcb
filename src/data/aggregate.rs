//! Temporal aggregation of normalized records into a gap-filled grid.
//!
//! The output has one [`DailySummary`] per (day, row) for every day between
//! the first and the last day seen, rows in caller order, and every summary
//! carries exactly 24 hourly cells. Missing input never leaves a hole: it
//! becomes a "No Diagnosis" cell.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use afdd_types::{DailySummary, EnergyImpact, HourlyCell, NormalizedRecord, HOURS_PER_DAY};

/// Hour of day to the record held for it.
pub type HourMap = BTreeMap<u8, NormalizedRecord>;

/// Records grouped by day, diagnostic name and hour.
///
/// Each (day, name, hour) slot holds a single record. When a second record
/// lands in an occupied slot it replaces the held one if its severity is
/// greater or equal, so among equals the later record wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayGroups {
    days: BTreeMap<NaiveDate, BTreeMap<String, HourMap>>,
}

impl DayGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group records in input order.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a NormalizedRecord>) -> Self {
        let mut groups = Self::new();
        for record in records {
            groups.insert(record.clone());
        }
        groups
    }

    /// Place a record in its slot, applying the tie rule.
    pub fn insert(&mut self, record: NormalizedRecord) {
        let hours = self
            .days
            .entry(record.date())
            .or_default()
            .entry(record.diagnostic_name.clone())
            .or_default();

        match hours.get(&record.hour()) {
            Some(held) if !record.severity.supersedes(held.severity) => {}
            _ => {
                hours.insert(record.hour(), record);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// First and last day with any record.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = *self.days.keys().next()?;
        let last = *self.days.keys().next_back()?;
        Some((first, last))
    }

    pub fn has_date(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    /// Hours recorded for one diagnostic on one day.
    pub fn get(&self, date: NaiveDate, diagnostic: &str) -> Option<&HourMap> {
        self.days.get(&date)?.get(diagnostic)
    }
}

/// Every day from `first` to `last`, inclusive.
pub fn days_between(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(first), |d| d.checked_add_days(Days::new(1)))
        .take_while(move |d| *d <= last)
}

/// Aggregate records into daily summaries.
///
/// Returns an empty vector when `records` is empty; otherwise
/// `days_in_range × rows.len()` summaries, ordered by day and then by row.
pub fn aggregate<S: AsRef<str>>(records: &[NormalizedRecord], rows: &[S]) -> Vec<DailySummary> {
    let groups = DayGroups::from_records(records);
    aggregate_groups(&groups, rows)
}

/// [`aggregate`] over records that are already grouped.
pub fn aggregate_groups<S: AsRef<str>>(groups: &DayGroups, rows: &[S]) -> Vec<DailySummary> {
    let Some((first, last)) = groups.date_range() else {
        return Vec::new();
    };

    let mut summaries = Vec::new();
    for date in days_between(first, last) {
        for (row, name) in rows.iter().enumerate() {
            let summary = match groups.get(date, name.as_ref()) {
                Some(hours) => summarize_day(date, row, hours),
                None => DailySummary::missing(date, row),
            };
            summaries.push(summary);
        }
    }
    summaries
}

/// Build the 24 hourly cells of one (day, row) and roll them up.
///
/// Energy impact chains forward: a present hour without a joined value shows
/// the last value seen earlier that day. The summary takes the worst cell,
/// later hours winning ties, with the energy impact carried at that hour.
fn summarize_day(date: NaiveDate, row: usize, hours: &HourMap) -> DailySummary {
    let mut summary = DailySummary::missing(date, row);
    let mut carried = EnergyImpact::NotApplicable;

    for hour in 0..HOURS_PER_DAY as u8 {
        let Some(record) = hours.get(&hour) else {
            continue;
        };

        if let Some(energy) = record.energy_impact {
            carried = energy;
        }

        if record.severity.supersedes(summary.severity) {
            summary.severity = record.severity;
            summary.diagnostic_name = record.diagnostic_name.clone();
            summary.diagnostic_message = record.diagnostic_message.clone();
            summary.energy_impact = carried;
        }

        summary.hourly_result[hour as usize] = HourlyCell::from_record(record, date, hour, carried);
    }

    summary
}
