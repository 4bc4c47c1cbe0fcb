//! Static lookup data: error-code tables and diagnostic row lists.
//!
//! Diagnostic algorithms publish a numeric error code per run. The code is
//! scoped by category (`Economizer_RCx`, `Airside_RCx`, ...) and resolves to a
//! severity and a human-readable message through an [`ErrorCodeTable`].

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{NormalizedRecord, PointKind, Severity};

/// Category name of the economizer retro-commissioning diagnostics.
pub const ECONOMIZER_RCX: &str = "Economizer_RCx";
/// Category name of the air-side retro-commissioning diagnostics.
pub const AIRSIDE_RCX: &str = "Airside_RCx";
/// Category name of the hot-water loop diagnostics.
pub const HOT_WATER_RCX: &str = "HotWater_RCx";

/// What an error code means.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorCodeEntry {
    pub severity: Severity,
    pub message: String,
}

impl ErrorCodeEntry {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Failure to resolve an error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No table is registered for the category.
    #[error("no error-code table for category '{0}'")]
    UnknownCategory(String),

    /// The table exists but does not contain the code.
    #[error("error code '{code}' is not mapped in category '{category}'")]
    UnmappedCode { category: String, code: String },
}

/// Error codes of one category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ErrorCodeTable {
    entries: BTreeMap<String, ErrorCodeEntry>,
}

impl ErrorCodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, code: impl Into<String>, entry: ErrorCodeEntry) {
        self.entries.insert(code.into(), entry);
    }

    /// Look up a code.
    ///
    /// Codes reach us as JSON numbers, so `10` and `10.0` name the same entry:
    /// the exact spelling is tried first, then the other integral spelling.
    pub fn get(&self, code: &str) -> Option<&ErrorCodeEntry> {
        let code = code.trim();
        self.entries
            .get(code)
            .or_else(|| alternate_spelling(code).and_then(|alt| self.entries.get(&alt)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ErrorCodeEntry)> {
        self.entries.iter()
    }

    fn from_rows(rows: &[(&str, Severity, &str)]) -> Self {
        let mut table = Self::new();
        for (code, severity, message) in rows {
            table.insert(*code, ErrorCodeEntry::new(*severity, *message));
        }
        table
    }
}

/// `"10"` <-> `"10.0"`; `None` for codes with a real fraction.
fn alternate_spelling(code: &str) -> Option<String> {
    if let Some(whole) = code.strip_suffix(".0") {
        return Some(whole.to_string());
    }
    if code.parse::<i64>().is_ok() {
        return Some(format!("{}.0", code));
    }
    None
}

/// Error-code tables for every known category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ErrorCodeTables {
    tables: BTreeMap<String, ErrorCodeTable>,
}

impl ErrorCodeTables {
    /// Empty set of tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// The tables shipped with the economizer and air-side diagnostics.
    pub fn builtin() -> Self {
        let mut tables = Self::new();
        tables.insert_table(ECONOMIZER_RCX, ErrorCodeTable::from_rows(ECONOMIZER_CODES));
        tables.insert_table(AIRSIDE_RCX, ErrorCodeTable::from_rows(AIRSIDE_CODES));
        tables
    }

    /// Register (or replace) the table of a category.
    pub fn insert_table(&mut self, category: impl Into<String>, table: ErrorCodeTable) {
        self.tables.insert(category.into(), table);
    }

    /// Add or replace a single entry, creating the category if needed.
    pub fn set(&mut self, category: &str, code: impl Into<String>, entry: ErrorCodeEntry) {
        self.tables
            .entry(category.to_string())
            .or_default()
            .insert(code, entry);
    }

    pub fn table(&self, category: &str) -> Option<&ErrorCodeTable> {
        self.tables.get(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Look up a code, `None` if the category or the code is unknown.
    pub fn lookup(&self, category: &str, code: &str) -> Option<&ErrorCodeEntry> {
        self.resolve(category, code).ok()
    }

    /// Look up a code, reporting why it could not be resolved.
    pub fn resolve(&self, category: &str, code: &str) -> Result<&ErrorCodeEntry, LookupError> {
        let table = self
            .tables
            .get(category)
            .ok_or_else(|| LookupError::UnknownCategory(category.to_string()))?;
        table.get(code).ok_or_else(|| LookupError::UnmappedCode {
            category: category.to_string(),
            code: code.to_string(),
        })
    }
}

/// One diagnostic category: what to fetch and how to lay out its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagnosticCategory {
    pub name: String,
    /// Row labels, top to bottom in the chart.
    pub rows: Vec<String>,
    /// Algorithm names to query from the historian.
    pub algorithms: Vec<String>,
    /// Older algorithm names that identify the category but have no row.
    pub aliases: Vec<String>,
    /// Points each algorithm publishes.
    pub points: Vec<PointKind>,
}

impl DiagnosticCategory {
    /// Whether a diagnostic name belongs to this category.
    pub fn knows(&self, diagnostic: &str) -> bool {
        self.rows.iter().any(|r| r == diagnostic) || self.aliases.iter().any(|a| a == diagnostic)
    }

    /// Whether the category publishes energy-impact points.
    pub fn has_energy_impact(&self) -> bool {
        self.points.contains(&PointKind::EnergyImpact)
    }
}

/// The set of known diagnostic categories.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagnosticCatalog {
    pub categories: Vec<DiagnosticCategory>,
}

impl DiagnosticCatalog {
    /// Economizer, air-side and hot-water loop categories.
    pub fn builtin() -> Self {
        Self {
            categories: vec![
                DiagnosticCategory {
                    name: ECONOMIZER_RCX.to_string(),
                    rows: strings(ECONOMIZER_ROWS),
                    algorithms: strings(ECONOMIZER_ROWS),
                    aliases: strings(&["Economizing When Unit Should Dx"]),
                    points: vec![PointKind::DiagnosticMessage, PointKind::EnergyImpact],
                },
                DiagnosticCategory {
                    name: HOT_WATER_RCX.to_string(),
                    rows: strings(HOT_WATER_ROWS),
                    algorithms: strings(HOT_WATER_ROWS),
                    aliases: Vec::new(),
                    points: vec![PointKind::DiagnosticMessage],
                },
                DiagnosticCategory {
                    name: AIRSIDE_RCX.to_string(),
                    rows: strings(AIRSIDE_ROWS),
                    algorithms: strings(AIRSIDE_ALGORITHMS),
                    aliases: Vec::new(),
                    points: vec![PointKind::DiagnosticMessage],
                },
            ],
        }
    }

    pub fn get(&self, category: &str) -> Option<&DiagnosticCategory> {
        self.categories.iter().find(|c| c.name == category)
    }

    /// Pick the category of the first record whose diagnostic name any
    /// category knows. `None` when no record matches.
    pub fn detect(&self, records: &[NormalizedRecord]) -> Option<&DiagnosticCategory> {
        records.iter().find_map(|record| {
            self.categories
                .iter()
                .find(|c| c.knows(&record.diagnostic_name))
        })
    }

    /// Row list of [`detect`](Self::detect).
    pub fn detect_rows(&self, records: &[NormalizedRecord]) -> Option<&[String]> {
        self.detect(records).map(|c| c.rows.as_slice())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const ECONOMIZER_ROWS: &[&str] = &[
    "Temperature Sensor Dx",
    "Not Economizing When Unit Should Dx",
    "Economizing When Unit Should Not Dx",
    "Excess Outdoor-air Intake Dx",
    "Insufficient Outdoor-air Intake Dx",
];

const AIRSIDE_ROWS: &[&str] = &[
    "Duct Static Pressure Set Point Control Loop Dx",
    "Low Duct Static Pressure Dx",
    "High Duct Static Pressure Dx",
    "No Static Pressure Reset Dx",
    "Supply-air Temperature Set Point Control Loop Dx",
    "Low Supply-air Temperature Dx",
    "High Supply-air Temperature Dx",
    "No Supply-air Temperature Reset Dx",
    "Operational Schedule Dx",
];

const AIRSIDE_ALGORITHMS: &[&str] = &[
    "Duct Static Pressure Set Point Control Loop Dx",
    "High Duct Static Pressure Dx",
    "High Supply-air Temperature Dx",
    "Low Duct Static Pressure Dx",
    "Low Supply-air Temperature Dx",
    "No Static Pressure Reset Dx",
    "No Supply-air Temperature Reset Dx",
    "Operational Schedule Dx",
    "Supply-air Temperature Set Point Control Loop Dx",
];

const HOT_WATER_ROWS: &[&str] = &[
    "HW Differential Pressure Control Loop Dx",
    "HW Supply Temperature Control Loop Dx",
    "HW loop High Differential Pressure Dx",
    "HW loop Differential Pressure Reset Dx",
    "HW loop High Supply Temperature Dx",
    "HW loop Supply Temperature Reset Dx",
    "HW loop Low Delta-T Dx",
];

const NO_PROBLEMS: &str = "No problems detected.";
const INCONCLUSIVE: &str = "The diagnostic resulted in an inconclusive result.";

use crate::Severity::{Fault as RED, NoDiagnosis as GREY, Normal as GREEN};

const ECONOMIZER_CODES: &[(&str, Severity, &str)] = &[
    ("-1", GREY, "No Diagnosis"),
    ("0", GREEN, NO_PROBLEMS),
    ("0.1", RED, "The OAT and MAT sensor readings are not consistent when the outdoor-air damper is fully open."),
    ("1.1", RED, "A temperature sensor problem was detected: the MAT sensor reading is less than the OAT and RAT sensor readings."),
    ("2.1", RED, "A temperature sensor problem was detected: the MAT sensor reading is greater than the OAT and RAT sensor readings."),
    ("3.2", GREY, INCONCLUSIVE),
    ("10.0", GREEN, NO_PROBLEMS),
    ("11.1", RED, "Conditions are favorable for economizing but the OAD is frequently below 100% open."),
    ("12.1", RED, "The OAD is open for economizing but the OAF indicates the unit is not bringing in near 100% OA."),
    ("13.2", GREY, INCONCLUSIVE),
    ("20.0", GREEN, NO_PROBLEMS),
    ("21.1", RED, "The OAD should be at the minimum position for ventilation but is significantly above that value."),
    ("23.2", GREY, INCONCLUSIVE),
    ("30.0", GREEN, NO_PROBLEMS),
    ("31.2", GREY, "Inconclusive result; the OAF calculation led to an unexpected result."),
    ("32.1", RED, "The OAD should be at the minimum for ventilation but is significantly above that value."),
    ("33.1", RED, "Excess outdoor air is being provided. This could significantly increase heating and cooling costs."),
    ("34.1", RED, "The OAD should be at the minimum for ventilation but is significantly above that value. Excess outdoor air is being provided; this could significantly increase heating and cooling costs."),
    ("35.2", GREY, INCONCLUSIVE),
    ("40.0", GREEN, NO_PROBLEMS),
    ("41.2", GREY, "Inconclusive result; the OAF calculation led to an unexpected result."),
    ("42.1", RED, "The OAD position is significantly below the minimum configured OAD position."),
    ("43.1", RED, "Insufficient OA for ventilation is being provided."),
    ("44.2", GREY, INCONCLUSIVE),
];

const AIRSIDE_CODES: &[(&str, Severity, &str)] = &[
    ("-1", GREY, "No Diagnosis"),
    ("0", GREEN, NO_PROBLEMS),
    ("1.1", RED, "The duct static pressure is significantly deviating from its set point."),
    ("2.2", GREY, "Duct static pressure set point data is not available. The Set Point Control Loop Diagnostic requires set point data."),
    ("10.0", GREEN, NO_PROBLEMS),
    ("11.1", RED, "The diagnostic has detected that the duct static pressure is too low."),
    ("12.1", GREY, "The duct static pressure set point was detected to be too low but it is at the minimum configured value."),
    ("13.1", RED, "The duct static pressure was detected to be too low."),
    ("14.1", RED, "The duct static pressure was detected to be too low but auto-correction is not enabled."),
    ("15.1", RED, "The duct static pressure was detected to be too low but the fan speed command or duct static pressure set point are in an override state."),
    ("16.2", GREY, "Low duct static pressure diagnostic was inconclusive."),
    ("20.0", GREEN, NO_PROBLEMS),
    ("21.1", RED, "The diagnostic has detected that the duct static pressure is too high."),
    ("22.1", GREY, "The duct static pressure was detected to be too high but its set point is at the maximum configured value."),
    ("23.1", RED, "The duct static pressure was detected to be too high."),
    ("24.1", RED, "The duct static pressure was detected to be too high but auto-correction is not enabled."),
    ("25.1", RED, "The duct static pressure was detected to be too high but the fan speed command or duct static pressure set point are in an override state."),
    ("26.2", GREY, "High duct static pressure diagnostic was inconclusive."),
    ("30.0", GREEN, NO_PROBLEMS),
    ("31.1", RED, "The SAT is significantly deviating from its set point."),
    ("32.2", GREY, "Supply-air temperature set point data is not available. The Set Point Control Loop Diagnostic requires set point data."),
    ("40.0", GREEN, NO_PROBLEMS),
    ("41.1", RED, "The diagnostic has detected that the SAT is too low."),
    ("42.1", GREY, "The SAT was detected to be too low but its set point is at the minimum configured value."),
    ("43.1", RED, "The SAT was detected to be too low."),
    ("44.1", RED, "The SAT was detected to be too low but auto-correction is not enabled."),
    ("45.1", RED, "The SAT was detected to be too low but the SAT set point is in an override state."),
    ("46.2", RED, "Low supply-air temperature diagnostic was inconclusive."),
    ("50.0", GREEN, NO_PROBLEMS),
    ("51.1", RED, "The diagnostic has detected that the SAT is too high."),
    ("52.1", GREY, "The SAT was detected to be too high but its set point is at the maximum configured value."),
    ("53.1", RED, "The SAT was detected to be too high."),
    ("54.1", RED, "The SAT was detected to be too high but auto-correction is not enabled."),
    ("55.1", RED, "The SAT was detected to be too high but the SAT set point is in an override state."),
    ("56.2", RED, "High supply-air temperature diagnostic was inconclusive."),
    ("60.0", GREEN, NO_PROBLEMS),
    ("61.2", GREY, "Insufficient data for diagnostic."),
    ("63.1", RED, "The unit is ON a significant amount of time during the unoccupied schedule."),
    ("64.2", GREY, "The fan status shows the unit is off but the static pressure reading is high; verify the functionality of the pressure sensor."),
    ("70.0", GREEN, NO_PROBLEMS),
    ("71.1", RED, "A duct static pressure reset was not detected. Static pressure reset can save significant energy/money."),
    ("80.0", GREEN, NO_PROBLEMS),
    ("81.1", RED, "A discharge-air temperature reset was not detected. Discharge-air temperature reset can save significant energy/money."),
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(name: &str) -> NormalizedRecord {
        NormalizedRecord {
            datetime: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            diagnostic_name: name.to_string(),
            error_code: "0".to_string(),
            severity: Severity::Normal,
            diagnostic_message: NO_PROBLEMS.to_string(),
            energy_impact: None,
        }
    }

    #[test]
    fn test_builtin_lookup() {
        let tables = ErrorCodeTables::builtin();
        let entry = tables.lookup(ECONOMIZER_RCX, "21.1").unwrap();
        assert_eq!(entry.severity, Severity::Fault);
        assert!(entry.message.contains("minimum position"));

        let entry = tables.lookup(AIRSIDE_RCX, "-1").unwrap();
        assert_eq!(entry.severity, Severity::NoDiagnosis);
    }

    #[test]
    fn test_integral_spellings_are_equivalent() {
        let tables = ErrorCodeTables::builtin();
        assert_eq!(
            tables.lookup(ECONOMIZER_RCX, "10"),
            tables.lookup(ECONOMIZER_RCX, "10.0")
        );
        assert_eq!(
            tables.lookup(ECONOMIZER_RCX, "0.0").map(|e| e.severity),
            Some(Severity::Normal)
        );
        assert!(tables.lookup(ECONOMIZER_RCX, "21").is_none());
    }

    #[test]
    fn test_resolve_errors() {
        let tables = ErrorCodeTables::builtin();
        assert_eq!(
            tables.resolve("Chiller_RCx", "0"),
            Err(LookupError::UnknownCategory("Chiller_RCx".to_string()))
        );
        assert!(matches!(
            tables.resolve(AIRSIDE_RCX, "99.9"),
            Err(LookupError::UnmappedCode { .. })
        ));
    }

    #[test]
    fn test_override_entry() {
        let mut tables = ErrorCodeTables::builtin();
        tables.set(
            AIRSIDE_RCX,
            "46.2",
            ErrorCodeEntry::new(Severity::NoDiagnosis, "Inconclusive."),
        );
        assert_eq!(
            tables.lookup(AIRSIDE_RCX, "46.2").unwrap().severity,
            Severity::NoDiagnosis
        );

        tables.set("Chiller_RCx", "1.1", ErrorCodeEntry::new(Severity::Fault, "x"));
        assert_eq!(tables.table("Chiller_RCx").map(|t| t.len()), Some(1));
    }

    #[test]
    fn test_detect_rows() {
        let catalog = DiagnosticCatalog::builtin();

        let records = vec![record("Unknown Dx"), record("Low Duct Static Pressure Dx")];
        let rows = catalog.detect_rows(&records).unwrap();
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0], "Duct Static Pressure Set Point Control Loop Dx");

        let legacy = vec![record("Economizing When Unit Should Dx")];
        let category = catalog.detect(&legacy).unwrap();
        assert_eq!(category.name, ECONOMIZER_RCX);
        assert!(category.has_energy_impact());

        assert!(catalog.detect(&[record("Unknown Dx")]).is_none());
        assert!(catalog.detect(&[]).is_none());
    }
}
