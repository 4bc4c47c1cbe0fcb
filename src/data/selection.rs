//! Device selections: which (device, category) pair a heat map shows.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use afdd_historian::HistorianValues;
use afdd_types::{DevicePath, Topic};

/// One device and diagnostic category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeviceSelection {
    pub device: DevicePath,
    pub category: String,
}

impl DeviceSelection {
    pub fn new(device: DevicePath, category: impl Into<String>) -> Self {
        Self {
            device,
            category: category.into(),
        }
    }

    /// Key of the historian request for this selection.
    pub fn cache_key(&self) -> String {
        self.device.cache_key(&self.category)
    }

    /// Whether a topic was published for this selection.
    pub fn matches(&self, topic: &Topic) -> bool {
        topic.category == self.category && topic.device == self.device
    }
}

impl fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} · {}", self.device, self.category)
    }
}

/// Every (device, category) pair present in a historian batch, sorted.
pub fn discover(values: &HistorianValues) -> Vec<DeviceSelection> {
    values
        .keys()
        .filter_map(|topic| Topic::parse(topic).ok())
        .map(|topic| DeviceSelection::new(topic.device, topic.category))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The part of a batch published for `selection`.
pub fn filter_values(values: &HistorianValues, selection: &DeviceSelection) -> HistorianValues {
    values
        .iter()
        .filter(|(topic, _)| {
            Topic::parse(topic)
                .map(|t| selection.matches(&t))
                .unwrap_or(false)
        })
        .map(|(topic, pairs)| (topic.clone(), pairs.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values() -> HistorianValues {
        let mut values = HistorianValues::new();
        for topic in [
            "Economizer_RCx/PNNL/BUILDING1/AHU1/Temperature Sensor Dx/diagnostic message",
            "Economizer_RCx/PNNL/BUILDING1/AHU1/Temperature Sensor Dx/energy impact",
            "Airside_RCx/PNNL/BUILDING1/AHU1/Low Duct Static Pressure Dx/diagnostic message",
            "Economizer_RCx/PNNL/BUILDING4/RTU3/Temperature Sensor Dx/diagnostic message",
            "not/a/topic",
        ] {
            values.insert(topic.to_string(), vec![json!(["2024-01-01T00:00:00", 0])]);
        }
        values
    }

    #[test]
    fn test_discover() {
        let found = discover(&values());
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].category, "Airside_RCx");
        assert_eq!(found[1].device.device, "AHU1");
        assert_eq!(found[2].device.device, "RTU3");
    }

    #[test]
    fn test_filter_values() {
        let selection = DeviceSelection::new(
            DevicePath::new("PNNL", "BUILDING1", "AHU1"),
            "Economizer_RCx",
        );
        let filtered = filter_values(&values(), &selection);
        assert_eq!(filtered.len(), 2);
        assert_eq!(selection.cache_key(), "PNNL__BUILDING1__AHU1__Economizer_RCx");
        assert_eq!(selection.to_string(), "PNNL/BUILDING1/AHU1 · Economizer_RCx");
    }
}
