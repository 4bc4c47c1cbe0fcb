//! Historian topic paths.
//!
//! Diagnostic output is published under
//! `category/site/building/device/algorithm/point`, for example
//! `Economizer_RCx/PNNL/BUILDING1/AHU1/Temperature Sensor Dx/diagnostic message`.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// Separator used when a device selection is turned into a cache key.
pub const CACHE_KEY_SEPARATOR: &str = "__";

/// Number of `/`-separated segments in a topic.
const TOPIC_SEGMENTS: usize = 6;

/// Kind of point an algorithm publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PointKind {
    /// Numeric error code of the diagnostic.
    #[cfg_attr(feature = "serde", serde(rename = "diagnostic message"))]
    DiagnosticMessage,
    /// Estimated energy cost associated with the diagnostic.
    #[cfg_attr(feature = "serde", serde(rename = "energy impact"))]
    EnergyImpact,
}

impl PointKind {
    /// The point name as it appears in a topic.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PointKind::DiagnosticMessage => "diagnostic message",
            PointKind::EnergyImpact => "energy impact",
        }
    }
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointKind {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diagnostic message" => Ok(PointKind::DiagnosticMessage),
            "energy impact" => Ok(PointKind::EnergyImpact),
            other => Err(TopicError::UnknownPoint(other.to_string())),
        }
    }
}

/// Errors produced when parsing a topic string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    /// The topic does not have exactly six segments.
    #[error("expected {expected} topic segments, found {found}")]
    SegmentCount { expected: usize, found: usize },

    /// One of the segments is empty.
    #[error("topic segment '{0}' is empty")]
    EmptySegment(&'static str),

    /// The last segment is not a known point kind.
    #[error("unknown point kind '{0}'")]
    UnknownPoint(String),
}

/// A piece of equipment: site, building and device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DevicePath {
    pub site: String,
    pub building: String,
    pub device: String,
}

impl DevicePath {
    /// Create a device path.
    pub fn new(
        site: impl Into<String>,
        building: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            building: building.into(),
            device: device.into(),
        }
    }

    /// Key identifying one (device, category) request, e.g.
    /// `PNNL__BUILDING1__AHU1__Economizer_RCx`.
    pub fn cache_key(&self, category: &str) -> String {
        [
            self.site.as_str(),
            self.building.as_str(),
            self.device.as_str(),
            category,
        ]
        .join(CACHE_KEY_SEPARATOR)
    }

    /// Topic prefix for a category: `category/site/building/device`.
    pub fn base_topic(&self, category: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            category, self.site, self.building, self.device
        )
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site, self.building, self.device)
    }
}

/// A fully qualified historian topic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topic {
    /// Diagnostic category, e.g. `Economizer_RCx`.
    pub category: String,
    pub device: DevicePath,
    /// Diagnostic algorithm, e.g. `Temperature Sensor Dx`.
    pub algorithm: String,
    pub point: PointKind,
}

impl Topic {
    /// Build a topic from its parts.
    pub fn new(
        category: impl Into<String>,
        device: DevicePath,
        algorithm: impl Into<String>,
        point: PointKind,
    ) -> Self {
        Self {
            category: category.into(),
            device,
            algorithm: algorithm.into(),
            point,
        }
    }

    /// Parse a `/`-separated topic string.
    pub fn parse(s: &str) -> Result<Self, TopicError> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != TOPIC_SEGMENTS {
            return Err(TopicError::SegmentCount {
                expected: TOPIC_SEGMENTS,
                found: parts.len(),
            });
        }

        const NAMES: [&str; TOPIC_SEGMENTS] =
            ["category", "site", "building", "device", "algorithm", "point"];
        for (part, name) in parts.iter().zip(NAMES) {
            if part.trim().is_empty() {
                return Err(TopicError::EmptySegment(name));
            }
        }

        Ok(Self {
            category: parts[0].to_string(),
            device: DevicePath::new(parts[1], parts[2], parts[3]),
            algorithm: parts[4].to_string(),
            point: parts[5].parse()?,
        })
    }

    /// The device this topic belongs to.
    pub fn device_path(&self) -> &DevicePath {
        &self.device
    }

    /// The topic of another point published by the same algorithm.
    pub fn sibling(&self, point: PointKind) -> Topic {
        Topic {
            point,
            ..self.clone()
        }
    }

    /// Whether both topics come from the same algorithm on the same device.
    pub fn same_source(&self, other: &Topic) -> bool {
        self.category == other.category
            && self.device == other.device
            && self.algorithm == other.algorithm
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.device.base_topic(&self.category),
            self.algorithm,
            self.point
        )
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = "Economizer_RCx/PNNL/BUILDING1/AHU1/Temperature Sensor Dx/diagnostic message";

    #[test]
    fn test_parse_topic() {
        let topic = Topic::parse(TOPIC).unwrap();
        assert_eq!(topic.category, "Economizer_RCx");
        assert_eq!(topic.device, DevicePath::new("PNNL", "BUILDING1", "AHU1"));
        assert_eq!(topic.algorithm, "Temperature Sensor Dx");
        assert_eq!(topic.point, PointKind::DiagnosticMessage);
        assert_eq!(topic.to_string(), TOPIC);
    }

    #[test]
    fn test_parse_rejects_bad_topics() {
        assert_eq!(
            Topic::parse("a/b/c"),
            Err(TopicError::SegmentCount {
                expected: 6,
                found: 3
            })
        );
        assert_eq!(
            Topic::parse("Economizer_RCx/PNNL//AHU1/Dx/energy impact"),
            Err(TopicError::EmptySegment("building"))
        );
        assert!(matches!(
            Topic::parse("Economizer_RCx/PNNL/B1/AHU1/Dx/temperature"),
            Err(TopicError::UnknownPoint(_))
        ));
    }

    #[test]
    fn test_sibling_and_same_source() {
        let topic = Topic::parse(TOPIC).unwrap();
        let energy = topic.sibling(PointKind::EnergyImpact);
        assert_eq!(energy.point, PointKind::EnergyImpact);
        assert!(topic.same_source(&energy));
        assert!(energy.to_string().ends_with("/energy impact"));

        let mut other = energy.clone();
        other.device.device = "AHU2".to_string();
        assert!(!topic.same_source(&other));
    }

    #[test]
    fn test_cache_key() {
        let device = DevicePath::new("PNNL", "BUILDING1", "AHU1");
        assert_eq!(
            device.cache_key("Airside_RCx"),
            "PNNL__BUILDING1__AHU1__Airside_RCx"
        );
        assert_eq!(device.base_topic("Airside_RCx"), "Airside_RCx/PNNL/BUILDING1/AHU1");
    }
}
