//! Runtime configuration.
//!
//! Settings come from an optional TOML file layered under environment
//! variables prefixed with `AFDD` (nested keys joined by `__`):
//!
//! ```toml
//! [historian]
//! endpoint = "http://volttron.local:8080"
//! username = "admin"
//!
//! [query]
//! lookback_days = 8
//!
//! [[sites]]
//! name = "PNNL"
//!
//! [[sites.buildings]]
//! name = "BUILDING1"
//! devices = [{ name = "AHU1", diagnostics = ["Economizer_RCx", "Airside_RCx"] }]
//!
//! [[tables]]
//! category = "Airside_RCx"
//! code = "46.2"
//! severity = "GREY"
//! message = "Low supply-air temperature diagnostic was inconclusive."
//! ```
//!
//! `AFDD_HISTORIAN__PASSWORD=secret` overrides `historian.password`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, NaiveDateTime};
use config::{Config, Environment, File};
use serde::Deserialize;

use afdd_historian::{query::DEFAULT_COUNT, Order};
use afdd_types::{DevicePath, ErrorCodeEntry, ErrorCodeTables, Severity};

use crate::data::DeviceSelection;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "AFDD";

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub historian: HistorianSettings,
    pub query: QuerySettings,
    pub sites: Vec<SiteConfig>,
    /// Additions to and replacements of the built-in error-code tables.
    pub tables: Vec<TableOverride>,
    pub log: LogSettings,
}

/// Connection to the historian platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistorianSettings {
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Pre-issued token; skips authentication when set.
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HistorianSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            username: None,
            password: None,
            token: None,
            timeout_secs: 30,
        }
    }
}

impl HistorianSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Username and password, when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.username.as_deref()?, self.password.as_deref()?))
    }
}

/// Historian query parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Days before the end date covered when no start date is given.
    pub lookback_days: u64,
    pub count: u64,
    pub order: Order,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            lookback_days: 8,
            count: DEFAULT_COUNT,
            order: Order::LastToFirst,
        }
    }
}

impl QuerySettings {
    /// Query window from optional start/end days.
    ///
    /// The end day defaults to `today` and is covered through its last
    /// second; the start day defaults to `lookback_days` before the end.
    pub fn window(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(NaiveDateTime, NaiveDateTime)> {
        let end = end.unwrap_or(today);
        let start = match start {
            Some(start) => start,
            None => end
                .checked_sub_days(Days::new(self.lookback_days))
                .context("lookback reaches before the supported date range")?,
        };
        if start > end {
            anyhow::bail!("start date {} is after end date {}", start, end);
        }

        let start = start.and_hms_opt(0, 0, 0).context("invalid start time")?;
        let end = end.and_hms_opt(23, 59, 59).context("invalid end time")?;
        Ok((start, end))
    }
}

/// A site and its buildings.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    #[serde(default)]
    pub buildings: Vec<BuildingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildingConfig {
    pub name: String,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    /// Diagnostic categories run on the device, e.g. `Economizer_RCx`.
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

/// One error-code table entry from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TableOverride {
    pub category: String,
    pub code: String,
    pub severity: Severity,
    pub message: String,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Log file used while the terminal UI is running.
    pub file: PathBuf,
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from("afdd-viz.log"),
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("failed to read configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Every configured (device, category) pair, in file order.
    pub fn selections(&self) -> Vec<DeviceSelection> {
        let mut selections = Vec::new();
        for site in &self.sites {
            for building in &site.buildings {
                for device in &building.devices {
                    let path = DevicePath::new(&site.name, &building.name, &device.name);
                    for category in &device.diagnostics {
                        selections.push(DeviceSelection::new(path.clone(), category.as_str()));
                    }
                }
            }
        }
        selections
    }

    /// Built-in error-code tables with the configured overrides applied.
    pub fn error_code_tables(&self) -> ErrorCodeTables {
        let mut tables = ErrorCodeTables::builtin();
        for entry in &self.tables {
            tables.set(
                &entry.category,
                entry.code.trim(),
                ErrorCodeEntry::new(entry.severity, entry.message.as_str()),
            );
        }
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.historian.endpoint, "http://localhost:8080");
        assert_eq!(settings.historian.timeout(), Duration::from_secs(30));
        assert_eq!(settings.query.lookback_days, 8);
        assert_eq!(settings.query.count, 2_000_000);
        assert_eq!(settings.query.order, Order::LastToFirst);
        assert_eq!(settings.log.filter, "info");
        assert!(settings.selections().is_empty());
        assert!(settings.historian.credentials().is_none());
    }

    #[test]
    fn test_load_file() {
        let file = write_config(
            r#"
            [historian]
            endpoint = "http://volttron.local:8080"
            username = "admin"
            password = "admin"

            [query]
            lookback_days = 3

            [[sites]]
            name = "PNNL"

            [[sites.buildings]]
            name = "BUILDING1"
            devices = [
                { name = "AHU1", diagnostics = ["Economizer_RCx", "Airside_RCx"] },
                { name = "AHU2", diagnostics = ["Airside_RCx"] },
            ]

            [[tables]]
            category = "Airside_RCx"
            code = "46.2"
            severity = "GREY"
            message = "Inconclusive."
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.historian.endpoint, "http://volttron.local:8080");
        assert_eq!(settings.historian.credentials(), Some(("admin", "admin")));
        assert_eq!(settings.query.lookback_days, 3);
        assert_eq!(settings.query.count, 2_000_000);

        let selections = settings.selections();
        assert_eq!(selections.len(), 3);
        assert_eq!(selections[0].cache_key(), "PNNL__BUILDING1__AHU1__Economizer_RCx");
        assert_eq!(selections[2].device.device, "AHU2");

        let tables = settings.error_code_tables();
        assert_eq!(
            tables.lookup("Airside_RCx", "46.2").unwrap().severity,
            Severity::NoDiagnosis
        );
        // Untouched entries keep their built-in values.
        assert_eq!(
            tables.lookup("Airside_RCx", "56.2").unwrap().severity,
            Severity::Fault
        );
    }

    #[test]
    fn test_invalid_severity_is_an_error() {
        let file = write_config(
            r#"
            [[tables]]
            category = "Airside_RCx"
            code = "1.1"
            severity = "PURPLE"
            message = "?"
            "#,
        );
        assert!(Settings::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/afdd.toml"))).is_err());
    }

    #[test]
    fn test_query_window() {
        let query = QuerySettings::default();

        let (start, end) = query.window(None, None, day(20)).unwrap();
        assert_eq!(start, day(12).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(end, day(20).and_hms_opt(23, 59, 59).unwrap());

        let (start, _) = query.window(Some(day(1)), Some(day(2)), day(20)).unwrap();
        assert_eq!(start.date(), day(1));

        assert!(query.window(Some(day(5)), Some(day(4)), day(20)).is_err());
    }

    #[test]
    fn test_example_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/afdd.example.toml");
        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.query.order, Order::LastToFirst);
        assert_eq!(settings.selections().len(), 3);
        let entry = settings
            .error_code_tables()
            .lookup("Airside_RCx", "46.2")
            .cloned()
            .unwrap();
        assert_eq!(entry.severity, Severity::NoDiagnosis);
    }
}
