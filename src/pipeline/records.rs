//! Typed records flowing between the ingestion and preprocessing stages

use serde::{Deserialize, Serialize};

/// Binary class label. The integer encoding is fixed: ham = 0, spam = 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Ham,
    Spam,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Ham => 0,
            Label::Spam => 1,
        }
    }

    pub fn as_i32(self) -> i32 {
        self.as_u8() as i32
    }

    pub fn is_positive(self) -> bool {
        self == Label::Spam
    }

    /// Decode an already-encoded `0`/`1` value
    pub fn from_encoded(value: &str) -> Option<Self> {
        match value.trim() {
            "0" | "0.0" => Some(Label::Ham),
            "1" | "1.0" => Some(Label::Spam),
            _ => None,
        }
    }
}

/// Record as it leaves ingestion: text plus the label exactly as it appeared
/// in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawRecord {
    pub text: String,
    pub label: String,
}

impl RawRecord {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Train/test partition of the ingested records.
#[derive(Debug, Clone, Default)]
pub struct SplitDataset {
    pub train: Vec<RawRecord>,
    pub test: Vec<RawRecord>,
}

/// Record after text normalization and label encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanRecord {
    pub text: String,
    pub label: Label,
}

impl CleanRecord {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_encoding_is_fixed() {
        assert_eq!(Label::Ham.as_u8(), 0);
        assert_eq!(Label::Spam.as_u8(), 1);
        assert!(Label::Spam.is_positive());
        assert!(!Label::Ham.is_positive());
    }

    #[test]
    fn test_from_encoded() {
        assert_eq!(Label::from_encoded("0"), Some(Label::Ham));
        assert_eq!(Label::from_encoded(" 1 "), Some(Label::Spam));
        assert_eq!(Label::from_encoded("1.0"), Some(Label::Spam));
        assert_eq!(Label::from_encoded("2"), None);
        assert_eq!(Label::from_encoded("spam"), None);
    }
}
