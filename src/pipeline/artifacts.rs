//! Artifact locations and the per-stage input/output contracts
//!
//! Stages never hard-code paths: they resolve them through an
//! [`ArtifactLayout`] rooted at the project directory. The same contracts
//! produce the pipeline declaration consumed by the external tracking tool.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::params::{FEATURE_SECTION, INGESTION_SECTION, MODEL_SECTION, PREPROCESSING_SECTION};

pub const RAW_TRAIN: &str = "data/raw/train.csv";
pub const RAW_TEST: &str = "data/raw/test.csv";
pub const INTERIM_TRAIN: &str = "data/interim/train_processed.csv";
pub const INTERIM_TEST: &str = "data/interim/test_processed.csv";
pub const FEATURES_TRAIN: &str = "data/processed/train_tfidf.csv";
pub const FEATURES_TEST: &str = "data/processed/test_tfidf.csv";
pub const VECTORIZER: &str = "data/processed/vectorizer.json";
pub const MODEL: &str = "models/model.json";
pub const METRICS: &str = "reports/metrics.json";
pub const LOG_DIR: &str = "logs";

/// Resolves artifact paths under a project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn raw_train(&self) -> PathBuf {
        self.resolve(RAW_TRAIN)
    }

    pub fn raw_test(&self) -> PathBuf {
        self.resolve(RAW_TEST)
    }

    pub fn interim_train(&self) -> PathBuf {
        self.resolve(INTERIM_TRAIN)
    }

    pub fn interim_test(&self) -> PathBuf {
        self.resolve(INTERIM_TEST)
    }

    pub fn features_train(&self) -> PathBuf {
        self.resolve(FEATURES_TRAIN)
    }

    pub fn features_test(&self) -> PathBuf {
        self.resolve(FEATURES_TEST)
    }

    pub fn vectorizer(&self) -> PathBuf {
        self.resolve(VECTORIZER)
    }

    pub fn model(&self) -> PathBuf {
        self.resolve(MODEL)
    }

    pub fn metrics(&self) -> PathBuf {
        self.resolve(METRICS)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.resolve(LOG_DIR)
    }
}

/// The five pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion,
    Preprocessing,
    FeatureEngineering,
    ModelBuilding,
    ModelEvaluation,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Ingestion,
        Stage::Preprocessing,
        Stage::FeatureEngineering,
        Stage::ModelBuilding,
        Stage::ModelEvaluation,
    ];

    /// Stage name in the pipeline declaration
    pub fn name(self) -> &'static str {
        match self {
            Stage::Ingestion => "data_ingestion",
            Stage::Preprocessing => "data_preprocessing",
            Stage::FeatureEngineering => "feature_engineering",
            Stage::ModelBuilding => "model_building",
            Stage::ModelEvaluation => "model_evaluation",
        }
    }

    /// Human-readable title
    pub fn title(self) -> &'static str {
        match self {
            Stage::Ingestion => "Data Ingestion",
            Stage::Preprocessing => "Preprocessing",
            Stage::FeatureEngineering => "Feature Engineering",
            Stage::ModelBuilding => "Model Building",
            Stage::ModelEvaluation => "Model Evaluation",
        }
    }

    /// CLI subcommand that runs the stage
    pub fn command(self) -> &'static str {
        match self {
            Stage::Ingestion => "ingest",
            Stage::Preprocessing => "preprocess",
            Stage::FeatureEngineering => "featurize",
            Stage::ModelBuilding => "train",
            Stage::ModelEvaluation => "evaluate",
        }
    }

    /// Source file implementing the stage
    pub fn source_file(self) -> &'static str {
        match self {
            Stage::Ingestion => "src/pipeline/ingestion.rs",
            Stage::Preprocessing => "src/pipeline/preprocess.rs",
            Stage::FeatureEngineering => "src/pipeline/features.rs",
            Stage::ModelBuilding => "src/pipeline/training.rs",
            Stage::ModelEvaluation => "src/pipeline/evaluation.rs",
        }
    }

    /// Artifacts read by the stage
    pub fn inputs(self) -> &'static [&'static str] {
        match self {
            Stage::Ingestion => &[],
            Stage::Preprocessing => &[RAW_TRAIN, RAW_TEST],
            Stage::FeatureEngineering => &[INTERIM_TRAIN, INTERIM_TEST],
            Stage::ModelBuilding => &[FEATURES_TRAIN],
            Stage::ModelEvaluation => &[MODEL, FEATURES_TEST],
        }
    }

    /// Artifacts written by the stage
    pub fn outputs(self) -> &'static [&'static str] {
        match self {
            Stage::Ingestion => &[RAW_TRAIN, RAW_TEST],
            Stage::Preprocessing => &[INTERIM_TRAIN, INTERIM_TEST],
            Stage::FeatureEngineering => &[FEATURES_TRAIN, FEATURES_TEST, VECTORIZER],
            Stage::ModelBuilding => &[MODEL],
            Stage::ModelEvaluation => &[METRICS],
        }
    }

    /// Parameter keys that invalidate the stage when changed
    pub fn params(self) -> Vec<String> {
        let (section, keys): (&str, &[&str]) = match self {
            Stage::Ingestion => (
                INGESTION_SECTION,
                &["source", "test_size", "random_state", "text_column", "label_column"],
            ),
            Stage::Preprocessing => (
                PREPROCESSING_SECTION,
                &["on_invalid_record", "event_value", "non_event_value"],
            ),
            Stage::FeatureEngineering => (FEATURE_SECTION, &["max_features"]),
            Stage::ModelBuilding => (
                MODEL_SECTION,
                &[
                    "n_estimators",
                    "random_state",
                    "max_depth",
                    "min_samples_split",
                    "min_samples_leaf",
                    "bootstrap",
                ],
            ),
            Stage::ModelEvaluation => ("", &[]),
        };
        keys.iter().map(|k| format!("{}.{}", section, k)).collect()
    }

    /// Metrics files declared by the stage (not cached by the tracking tool)
    pub fn metrics(self) -> &'static [&'static str] {
        match self {
            Stage::ModelEvaluation => &[METRICS],
            _ => &[],
        }
    }

    pub fn contract(self) -> StageContract {
        let mut deps = vec![self.source_file().to_string()];
        deps.extend(self.inputs().iter().map(|s| s.to_string()));

        let metrics: Vec<String> = self.metrics().iter().map(|s| s.to_string()).collect();
        let outs = self
            .outputs()
            .iter()
            .filter(|o| !metrics.iter().any(|m| m == *o))
            .map(|s| s.to_string())
            .collect();

        StageContract {
            cmd: format!("spamflow {}", self.command()),
            deps,
            params: self.params(),
            outs,
            metrics: metrics
                .into_iter()
                .map(|path| MetricsDecl { path, cache: false })
                .collect(),
        }
    }
}

/// Declaration of one stage for the external tracking tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageContract {
    pub cmd: String,
    pub deps: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricsDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsDecl {
    pub path: String,
    pub cache: bool,
}

impl Serialize for MetricsDecl {
    // Rendered as `- path: {cache: false}`
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        #[derive(Serialize)]
        struct Options {
            cache: bool,
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.path, &Options { cache: self.cache })?;
        map.end()
    }
}

/// Render the whole pipeline as a `stages:` YAML document
pub fn render_pipeline_declaration() -> Result<String, serde_yaml::Error> {
    let mut stages = serde_yaml::Mapping::new();
    for stage in Stage::ALL {
        stages.insert(
            serde_yaml::Value::String(stage.name().to_string()),
            serde_yaml::to_value(stage.contract())?,
        );
    }

    let mut doc = serde_yaml::Mapping::new();
    doc.insert(
        serde_yaml::Value::String("stages".to_string()),
        serde_yaml::Value::Mapping(stages),
    );
    serde_yaml::to_string(&doc)
}
