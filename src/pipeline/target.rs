//! Label analysis and encoding
//!
//! Maps the source dataset's categorical label values onto the fixed binary
//! [`Label`] scheme, and decides what happens to records whose label cannot
//! be mapped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::records::{Label, RawRecord};

/// Mapping configuration for converting label values to binary 0/1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMapping {
    /// Value that maps to 1 (spam)
    pub event_value: String,
    /// Value that maps to 0 (ham)
    pub non_event_value: String,
}

impl LabelMapping {
    /// Create a new label mapping
    pub fn new(event_value: String, non_event_value: String) -> Self {
        Self {
            event_value,
            non_event_value,
        }
    }

    /// Encode a single label value.
    ///
    /// Values already encoded as `0`/`1` are accepted unchanged, so encoding
    /// the output of a previous run is a no-op. Matching ignores surrounding
    /// whitespace and ASCII case.
    pub fn encode(&self, value: &str) -> Option<Label> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(self.event_value.trim()) {
            Some(Label::Spam)
        } else if value.eq_ignore_ascii_case(self.non_event_value.trim()) {
            Some(Label::Ham)
        } else {
            Label::from_encoded(value)
        }
    }
}

impl Default for LabelMapping {
    fn default() -> Self {
        Self::new("spam".to_string(), "ham".to_string())
    }
}

/// What to do with a record whose label cannot be encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRecordPolicy {
    /// Abort the stage on the first invalid record
    #[default]
    Strict,
    /// Log and skip invalid records
    Lenient,
}

/// Result of analyzing the label values of a record collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelAnalysis {
    /// Exactly two distinct values, both covered by the mapping
    Binary,
    /// Some values are not covered by the mapping
    Unmapped { unknown_values: Vec<String> },
}

/// Analyze label values against a mapping
///
/// Returns `Binary` when every value encodes, otherwise the sorted list of
/// values that do not.
pub fn analyze_labels(records: &[RawRecord], mapping: &LabelMapping) -> LabelAnalysis {
    let mut unknown: Vec<String> = records
        .iter()
        .filter(|r| mapping.encode(&r.label).is_none())
        .map(|r| r.label.clone())
        .collect();

    if unknown.is_empty() {
        return LabelAnalysis::Binary;
    }

    // Sort for consistent ordering
    unknown.sort();
    unknown.dedup();
    LabelAnalysis::Unmapped {
        unknown_values: unknown,
    }
}

/// Count records per raw label value
pub fn label_distribution(records: &[RawRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.label.clone()).or_insert(0) += 1;
    }
    counts
}

/// Count how many records map to spam, ham, or neither
pub fn count_mapped_records(
    records: &[RawRecord],
    mapping: &LabelMapping,
) -> (usize, usize, usize) {
    let mask: Vec<Option<Label>> = records.iter().map(|r| mapping.encode(&r.label)).collect();

    let events = mask.iter().filter(|v| **v == Some(Label::Spam)).count();
    let non_events = mask.iter().filter(|v| **v == Some(Label::Ham)).count();
    let ignored = mask.iter().filter(|v| v.is_none()).count();

    (events, non_events, ignored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(labels: &[&str]) -> Vec<RawRecord> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| RawRecord::new(format!("text {}", i), *l))
            .collect()
    }

    #[test]
    fn test_encode_default_mapping() {
        let mapping = LabelMapping::default();
        assert_eq!(mapping.encode("spam"), Some(Label::Spam));
        assert_eq!(mapping.encode("ham"), Some(Label::Ham));
        assert_eq!(mapping.encode(" Spam "), Some(Label::Spam));
        assert_eq!(mapping.encode("eggs"), None);
    }

    #[test]
    fn test_encode_accepts_encoded_values() {
        let mapping = LabelMapping::default();
        assert_eq!(mapping.encode("1"), Some(Label::Spam));
        assert_eq!(mapping.encode("0"), Some(Label::Ham));
    }

    #[test]
    fn test_custom_mapping() {
        let mapping = LabelMapping::new("B".to_string(), "G".to_string());
        assert_eq!(mapping.encode("B"), Some(Label::Spam));
        assert_eq!(mapping.encode("G"), Some(Label::Ham));
        assert_eq!(mapping.encode("spam"), None);
    }

    #[test]
    fn test_analyze_binary_labels() {
        let recs = records(&["ham", "spam", "ham"]);
        assert_eq!(
            analyze_labels(&recs, &LabelMapping::default()),
            LabelAnalysis::Binary
        );
    }

    #[test]
    fn test_analyze_unmapped_labels() {
        let recs = records(&["ham", "unknown", "spam", "junk", "unknown"]);
        match analyze_labels(&recs, &LabelMapping::default()) {
            LabelAnalysis::Unmapped { unknown_values } => {
                assert_eq!(unknown_values, vec!["junk".to_string(), "unknown".to_string()]);
            }
            other => panic!("Expected Unmapped, got {:?}", other),
        }
    }

    #[test]
    fn test_count_mapped_records() {
        let recs = records(&["ham", "spam", "ham", "spam", "x", "x"]);
        let (events, non_events, ignored) = count_mapped_records(&recs, &LabelMapping::default());

        assert_eq!(events, 2);
        assert_eq!(non_events, 2);
        assert_eq!(ignored, 2);
    }

    #[test]
    fn test_label_distribution() {
        let recs = records(&["ham", "spam", "ham"]);
        let dist = label_distribution(&recs);
        assert_eq!(dist.get("ham"), Some(&2));
        assert_eq!(dist.get("spam"), Some(&1));
    }
}
