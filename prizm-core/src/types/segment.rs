//! The structured record scraped for one postal code.

use serde::{Deserialize, Serialize};

/// A PRIZM segment record for a postal code.
///
/// The segment number is the only field the site always shows; the rest
/// depend on which panels render for the segment and are kept as the raw
/// display strings (e.g. `"$87,388"`, `"Own & Rent | Single Detached"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// The PRIZM segment number, as displayed (e.g. `"62"`).
    pub segment_number: String,
    /// Average household income, as displayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_income: Option<String>,
    /// Residency and home type, joined with `" | "`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residency_home_type: Option<String>,
    /// Short description and "who" text, joined with `" | "`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_description: Option<String>,
}

impl SegmentRecord {
    /// Creates a record with only the segment number.
    pub fn new(segment_number: impl Into<String>) -> Self {
        Self {
            segment_number: segment_number.into(),
            household_income: None,
            residency_home_type: None,
            segment_description: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_omitted_from_json() {
        let record = SegmentRecord::new("62");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"segment_number":"62"}"#);
    }

    #[test]
    fn test_roundtrip_with_all_fields() {
        let record = SegmentRecord {
            segment_number: "62".into(),
            household_income: Some("$87,388".into()),
            residency_home_type: Some("Own & Rent | Single Detached / Low Rise Apt".into()),
            segment_description: Some("Suburban, lower-middle-income singles and couples".into()),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: SegmentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_deserialize_tolerates_missing_optionals() {
        let back: SegmentRecord = serde_json::from_str(r#"{"segment_number":"07"}"#).unwrap();
        assert_eq!(back.segment_number, "07");
        assert!(back.household_income.is_none());
    }
}
