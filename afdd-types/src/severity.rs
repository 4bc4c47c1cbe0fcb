//! Severity model - the ordered set of diagnostic states.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// Outcome of a diagnostic for one cell of the heat map.
///
/// The order is total and fixed: `NoDiagnosis < Normal < Fault`. Aggregation
/// always keeps the higher state, and on equal states the one seen later.
///
/// On the wire a state is spelled with its legacy color code
/// (`GREY`, `GREEN`, `RED`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// No diagnosis was produced for the cell (also the gap-fill default).
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "GREY", alias = "grey"))]
    NoDiagnosis,
    /// The diagnostic ran and found no problem.
    #[cfg_attr(feature = "serde", serde(rename = "GREEN", alias = "green"))]
    Normal,
    /// The diagnostic detected a fault.
    #[cfg_attr(feature = "serde", serde(rename = "RED", alias = "red"))]
    Fault,
}

impl Severity {
    /// All states, lowest first. Legend order.
    pub const ALL: [Severity; 3] = [Severity::NoDiagnosis, Severity::Normal, Severity::Fault];

    /// Numeric state value (0, 1, 2).
    pub const fn rank(&self) -> u8 {
        match self {
            Severity::NoDiagnosis => 0,
            Severity::Normal => 1,
            Severity::Fault => 2,
        }
    }

    /// Legacy color code used by the lookup tables.
    pub const fn code(&self) -> &'static str {
        match self {
            Severity::NoDiagnosis => "GREY",
            Severity::Normal => "GREEN",
            Severity::Fault => "RED",
        }
    }

    /// Display color as a `#RRGGBB` hex string.
    pub const fn color(&self) -> &'static str {
        match self {
            Severity::NoDiagnosis => "#B3B3B3",
            Severity::Normal => "#509E7A",
            Severity::Fault => "#E22400",
        }
    }

    /// Display color as an RGB triple.
    pub const fn rgb(&self) -> (u8, u8, u8) {
        match self {
            Severity::NoDiagnosis => (0xB3, 0xB3, 0xB3),
            Severity::Normal => (0x50, 0x9E, 0x7A),
            Severity::Fault => (0xE2, 0x24, 0x00),
        }
    }

    /// Legend label.
    pub const fn label(&self) -> &'static str {
        match self {
            Severity::NoDiagnosis => "No Diagnosis",
            Severity::Normal => "Normal",
            Severity::Fault => "Fault",
        }
    }

    /// Parse a legacy color code (case-insensitive).
    pub fn from_code(code: &str) -> Option<Self> {
        Severity::ALL
            .into_iter()
            .find(|s| s.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Total order between two states.
    pub fn compare(a: Severity, b: Severity) -> Ordering {
        a.cmp(&b)
    }

    /// Whether `self` replaces `held` in a cell.
    ///
    /// This is `>=`: a later value of equal severity wins. Both the grouping
    /// step and the daily roll-up rely on it for deterministic output.
    pub fn supersedes(self, held: Severity) -> bool {
        self >= held
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a color code does not name a severity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity code '{0}' (expected GREY, GREEN or RED)")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::from_code(s).ok_or_else(|| UnknownSeverity(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_total() {
        assert!(Severity::NoDiagnosis < Severity::Normal);
        assert!(Severity::Normal < Severity::Fault);
        assert_eq!(
            Severity::compare(Severity::Fault, Severity::NoDiagnosis),
            Ordering::Greater
        );
        assert_eq!(Severity::ALL.iter().max(), Some(&Severity::Fault));
    }

    #[test]
    fn test_supersedes_on_ties() {
        assert!(Severity::Normal.supersedes(Severity::Normal));
        assert!(Severity::Fault.supersedes(Severity::Normal));
        assert!(!Severity::Normal.supersedes(Severity::Fault));
    }

    #[test]
    fn test_codes_round_trip() {
        for s in Severity::ALL {
            assert_eq!(Severity::from_code(s.code()), Some(s));
        }
        assert_eq!("red".parse::<Severity>(), Ok(Severity::Fault));
        assert!("BLUE".parse::<Severity>().is_err());
    }

    #[test]
    fn test_legend() {
        assert_eq!(Severity::default(), Severity::NoDiagnosis);
        assert_eq!(Severity::Fault.color(), "#E22400");
        assert_eq!(Severity::Normal.label(), "Normal");
        assert_eq!(Severity::Normal.rank(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_uses_color_codes() {
        let json = serde_json::to_string(&Severity::Fault).unwrap();
        assert_eq!(json, "\"RED\"");
        let parsed: Severity = serde_json::from_str("\"GREEN\"").unwrap();
        assert_eq!(parsed, Severity::Normal);
    }
}
