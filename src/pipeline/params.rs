//! Pipeline parameters loaded from `params.yaml`
//!
//! The file is parsed once into an immutable [`Params`] document. Each stage
//! pulls only its own section, so a missing or invalid key fails the stage
//! that consumes it and no other.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::target::{InvalidRecordPolicy, LabelMapping};
use crate::error::{PipelineError, Result};

pub const INGESTION_SECTION: &str = "data_ingestion";
pub const PREPROCESSING_SECTION: &str = "preprocessing";
pub const FEATURE_SECTION: &str = "feature_engineering";
pub const MODEL_SECTION: &str = "model_building";

/// Parsed parameter document, passed by reference into every stage.
#[derive(Debug, Clone, Default)]
pub struct Params {
    doc: serde_yaml::Mapping,
}

impl Params {
    /// Load parameters from a YAML file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!(
                "Failed to read parameter file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse parameters from YAML text. An empty document yields no sections.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| PipelineError::config(format!("Invalid parameter file: {}", e)))?;

        let doc = match value {
            serde_yaml::Value::Null => serde_yaml::Mapping::new(),
            serde_yaml::Value::Mapping(map) => map,
            _ => {
                return Err(PipelineError::config(
                    "Parameter file must be a mapping of sections",
                ))
            }
        };

        Ok(Self { doc })
    }

    fn section<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.doc.get(name) {
            None | Some(serde_yaml::Value::Null) => Ok(None),
            Some(value) => serde_yaml::from_value(value.clone())
                .map(Some)
                .map_err(|e| PipelineError::config(format!("Invalid `{}` section: {}", name, e))),
        }
    }

    fn required_section<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.section(name)?
            .ok_or_else(|| PipelineError::config(format!("Missing `{}` section", name)))
    }

    pub fn ingestion(&self) -> Result<IngestionParams> {
        let params: IngestionParams = self.required_section(INGESTION_SECTION)?;
        params.validate()?;
        Ok(params)
    }

    /// Preprocessing has no required keys; an absent section means defaults.
    pub fn preprocessing(&self) -> Result<PreprocessParams> {
        Ok(self.section(PREPROCESSING_SECTION)?.unwrap_or_default())
    }

    pub fn feature_engineering(&self) -> Result<FeatureParams> {
        let raw: RawFeatureParams = self.required_section(FEATURE_SECTION)?;
        raw.validate()
    }

    pub fn model_building(&self) -> Result<ModelParams> {
        let raw: RawModelParams = self.required_section(MODEL_SECTION)?;
        raw.validate()
    }
}

/// `data_ingestion` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionParams {
    /// Local path (relative to the project root) or HTTP(S) URL
    pub source: String,
    /// Fraction of records assigned to the test split, in (0, 1)
    pub test_size: f64,
    /// Seed for the shuffle preceding the split
    pub random_state: u64,
    #[serde(default = "default_text_column")]
    pub text_column: String,
    #[serde(default = "default_label_column")]
    pub label_column: String,
}

fn default_text_column() -> String {
    "v2".to_string()
}

fn default_label_column() -> String {
    "v1".to_string()
}

impl IngestionParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::config(format!(
                "data_ingestion.test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.source.trim().is_empty() {
            return Err(PipelineError::config("data_ingestion.source is empty"));
        }
        Ok(())
    }
}

/// `preprocessing` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessParams {
    #[serde(default)]
    pub on_invalid_record: InvalidRecordPolicy,
    #[serde(default = "default_event_value")]
    pub event_value: String,
    #[serde(default = "default_non_event_value")]
    pub non_event_value: String,
}

fn default_event_value() -> String {
    "spam".to_string()
}

fn default_non_event_value() -> String {
    "ham".to_string()
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            on_invalid_record: InvalidRecordPolicy::default(),
            event_value: default_event_value(),
            non_event_value: default_non_event_value(),
        }
    }
}

impl PreprocessParams {
    pub fn label_mapping(&self) -> LabelMapping {
        LabelMapping::new(self.event_value.clone(), self.non_event_value.clone())
    }
}

#[derive(Debug, Deserialize)]
struct RawFeatureParams {
    max_features: i64,
}

impl RawFeatureParams {
    fn validate(self) -> Result<FeatureParams> {
        if self.max_features <= 0 {
            return Err(PipelineError::config(format!(
                "feature_engineering.max_features must be > 0, got {}",
                self.max_features
            )));
        }
        Ok(FeatureParams {
            max_features: self.max_features as usize,
        })
    }
}

/// `feature_engineering` section, validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureParams {
    pub max_features: usize,
}

#[derive(Debug, Deserialize)]
struct RawModelParams {
    n_estimators: i64,
    random_state: u64,
    #[serde(default)]
    max_depth: Option<i64>,
    #[serde(default = "default_min_samples_split")]
    min_samples_split: i64,
    #[serde(default = "default_min_samples_leaf")]
    min_samples_leaf: i64,
    #[serde(default = "default_bootstrap")]
    bootstrap: bool,
}

fn default_min_samples_split() -> i64 {
    2
}

fn default_min_samples_leaf() -> i64 {
    1
}

fn default_bootstrap() -> bool {
    true
}

impl RawModelParams {
    fn validate(self) -> Result<ModelParams> {
        if self.n_estimators <= 0 {
            return Err(PipelineError::config(format!(
                "model_building.n_estimators must be > 0, got {}",
                self.n_estimators
            )));
        }
        if let Some(depth) = self.max_depth {
            if depth <= 0 {
                return Err(PipelineError::config(format!(
                    "model_building.max_depth must be > 0, got {}",
                    depth
                )));
            }
        }
        if self.min_samples_split < 2 {
            return Err(PipelineError::config(format!(
                "model_building.min_samples_split must be >= 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(PipelineError::config(format!(
                "model_building.min_samples_leaf must be >= 1, got {}",
                self.min_samples_leaf
            )));
        }

        Ok(ModelParams {
            n_estimators: self.n_estimators as usize,
            random_state: self.random_state,
            max_depth: self.max_depth.map(|d| d as usize),
            min_samples_split: self.min_samples_split as usize,
            min_samples_leaf: self.min_samples_leaf as usize,
            bootstrap: self.bootstrap,
        })
    }
}

/// `model_building` section, validated. Stored verbatim inside the model artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelParams {
    pub n_estimators: usize,
    pub random_state: u64,
    /// `None` grows every tree until its leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
}

impl ModelParams {
    /// Defaults for everything except the two required keys
    pub fn new(n_estimators: usize, random_state: u64) -> Self {
        Self {
            n_estimators,
            random_state,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &str = r#"
data_ingestion:
  source: data/spam.csv
  test_size: 0.2
  random_state: 42
feature_engineering:
  max_features: 50
model_building:
  n_estimators: 10
  random_state: 2
unrelated:
  key: value
"#;

    #[test]
    fn test_parse_full_document() {
        let params = Params::from_yaml(PARAMS).unwrap();

        let ingestion = params.ingestion().unwrap();
        assert_eq!(ingestion.source, "data/spam.csv");
        assert_eq!(ingestion.text_column, "v2");
        assert_eq!(ingestion.label_column, "v1");

        assert_eq!(params.feature_engineering().unwrap().max_features, 50);

        let model = params.model_building().unwrap();
        assert_eq!(model, ModelParams::new(10, 2));

        let pre = params.preprocessing().unwrap();
        assert_eq!(pre.on_invalid_record, InvalidRecordPolicy::Strict);
        assert_eq!(pre.event_value, "spam");
    }

    #[test]
    fn test_missing_section_only_fails_consumer() {
        let params = Params::from_yaml("feature_engineering:\n  max_features: 5\n").unwrap();

        assert!(params.feature_engineering().is_ok());
        assert!(matches!(
            params.model_building(),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(params.ingestion(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_missing_required_key() {
        let params = Params::from_yaml("model_building:\n  n_estimators: 5\n").unwrap();
        let err = params.model_building().unwrap_err();
        assert!(err.to_string().contains("random_state"));
    }

    #[test]
    fn test_non_positive_max_features() {
        for value in ["0", "-3"] {
            let yaml = format!("feature_engineering:\n  max_features: {}\n", value);
            let params = Params::from_yaml(&yaml).unwrap();
            assert!(matches!(
                params.feature_engineering(),
                Err(PipelineError::Config(_))
            ));
        }
    }

    #[test]
    fn test_test_size_bounds() {
        for value in ["0.0", "1.0", "1.5", "-0.1"] {
            let yaml = format!(
                "data_ingestion:\n  source: a.csv\n  test_size: {}\n  random_state: 1\n",
                value
            );
            let params = Params::from_yaml(&yaml).unwrap();
            assert!(
                matches!(params.ingestion(), Err(PipelineError::Config(_))),
                "test_size {} should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_lenient_policy_parses() {
        let params =
            Params::from_yaml("preprocessing:\n  on_invalid_record: lenient\n").unwrap();
        assert_eq!(
            params.preprocessing().unwrap().on_invalid_record,
            InvalidRecordPolicy::Lenient
        );
    }
}
