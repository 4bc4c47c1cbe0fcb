//! The full pipeline from a historian batch to a [`HeatMap`].

use std::collections::BTreeSet;

use tracing::{debug, info};

use afdd_historian::HistorianValues;
use afdd_types::{DiagnosticCatalog, ErrorCodeTables, NormalizedRecord};

use super::heatmap::HeatMap;
use super::normalize::{normalize_batch, NormalizeOutcome};
use super::selection::DeviceSelection;

/// Lookup tables and row layouts used to turn a batch into a heat map.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub tables: ErrorCodeTables,
    pub catalog: DiagnosticCatalog,
    /// Category whose row list is used regardless of the selection.
    pub category: Option<String>,
}

impl Default for Analysis {
    fn default() -> Self {
        Self::new(ErrorCodeTables::builtin())
    }
}

impl Analysis {
    pub fn new(tables: ErrorCodeTables) -> Self {
        Self {
            tables,
            catalog: DiagnosticCatalog::builtin(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    /// Row labels for a heat map, top to bottom.
    ///
    /// A forced category wins, then the category of the selection, then the
    /// category detected from the records. Without any catalog match the
    /// distinct diagnostic names are used, sorted.
    pub fn rows_for(
        &self,
        selection: Option<&DeviceSelection>,
        records: &[NormalizedRecord],
    ) -> Vec<String> {
        let named = self
            .category
            .as_deref()
            .or(selection.map(|s| s.category.as_str()))
            .and_then(|name| self.catalog.get(name));
        if let Some(category) = named {
            return category.rows.clone();
        }
        if let Some(rows) = self.catalog.detect_rows(records) {
            return rows.to_vec();
        }

        debug!("No catalog entry matches, using diagnostic names as rows");
        records
            .iter()
            .map(|r| r.diagnostic_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Normalize and aggregate a batch.
    ///
    /// The heat map is `None` when no record survived normalization.
    pub fn build(
        &self,
        values: &HistorianValues,
        selection: Option<&DeviceSelection>,
    ) -> (Option<HeatMap>, NormalizeOutcome) {
        let outcome = normalize_batch(values, &self.tables);
        let rows = self.rows_for(selection, &outcome.records);
        let heatmap = HeatMap::build(&outcome.records, &rows);

        if let Some(ref map) = heatmap {
            let (first, last) = map.domain();
            info!(
                rows = rows.len(),
                days = map.day_count(),
                %first,
                %last,
                "Built heat map"
            );
        }
        (heatmap, outcome)
    }
}
