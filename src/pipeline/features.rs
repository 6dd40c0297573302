//! Feature engineering stage: TF-IDF matrices with a trailing label column

use std::path::Path;

use polars::prelude::*;
use tracing::info;

use super::artifacts::ArtifactLayout;
use super::loader::{read_clean_records, ArtifactBatch};
use super::params::{FeatureParams, Params};
use super::records::{CleanRecord, Label};
use super::tfidf::TfidfVectorizer;
use crate::error::{PipelineError, Result};

/// Name of the trailing label column in feature files
pub const LABEL_COLUMN: &str = "label";

/// Dense feature table: one row per record, feature columns then the label
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Feature column names, in order (the label column is not included)
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<Label>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>, labels: Vec<Label>) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(PipelineError::feature(format!(
                "{} feature rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(PipelineError::feature(format!(
                "Row {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                columns.len()
            )));
        }
        Ok(Self {
            columns,
            rows,
            labels,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All column names including the trailing label column
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.columns.clone();
        names.push(LABEL_COLUMN.to_string());
        names
    }

    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len() + 1);
        for (j, name) in self.columns.iter().enumerate() {
            let values: Vec<f64> = self.rows.iter().map(|r| r[j]).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        let labels: Vec<i32> = self.labels.iter().map(|l| l.as_i32()).collect();
        columns.push(Column::new(LABEL_COLUMN.into(), labels));
        Ok(DataFrame::new(columns)?)
    }

    /// Rebuild a matrix from a frame whose last column is the label
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        match names.last() {
            Some(last) if last == LABEL_COLUMN => {}
            _ => {
                return Err(PipelineError::data_load(format!(
                    "Feature table must end with a '{}' column, got {:?}",
                    LABEL_COLUMN,
                    names.last()
                )))
            }
        }

        let height = df.height();
        let feature_names = names[..names.len() - 1].to_vec();
        let mut rows = vec![Vec::with_capacity(feature_names.len()); height];

        for name in &feature_names {
            let cast = df.column(name)?.cast(&DataType::Float64)?;
            for (row, value) in rows.iter_mut().zip(cast.f64()?.into_iter()) {
                row.push(value.unwrap_or(0.0));
            }
        }

        let label_col = df.column(LABEL_COLUMN)?.cast(&DataType::Float64)?;
        let labels = label_col
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| match v {
                Some(x) if x == 0.0 => Ok(Label::Ham),
                Some(x) if x == 1.0 => Ok(Label::Spam),
                other => Err(PipelineError::data_load(format!(
                    "Row {} has label {:?}, expected 0 or 1",
                    i + 1,
                    other
                ))),
            })
            .collect::<Result<Vec<Label>>>()?;

        Self::new(feature_names, rows, labels)
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(|e| {
                PipelineError::data_load(format!("Failed to read {}: {}", path.display(), e))
            })?;
        Self::from_frame(&df)
    }
}

/// Column names for a fitted vocabulary: positional indices `"0".."N-1"`
pub fn feature_column_names(n_features: usize) -> Vec<String> {
    (0..n_features).map(|i| i.to_string()).collect()
}

/// Train/test matrices sharing one column schema, plus the fitted vectorizer
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub vectorizer: TfidfVectorizer,
    pub train: FeatureMatrix,
    pub test: FeatureMatrix,
}

/// Fit the vectorizer on train text only and transform both splits
pub fn build_features(
    train: &[CleanRecord],
    test: &[CleanRecord],
    params: &FeatureParams,
) -> Result<FeatureSet> {
    if params.max_features == 0 {
        return Err(PipelineError::config("max_features must be > 0"));
    }
    if train.is_empty() || test.is_empty() {
        return Err(PipelineError::feature(format!(
            "Cannot build features from empty input (train: {} records, test: {} records)",
            train.len(),
            test.len()
        )));
    }

    let train_texts: Vec<&str> = train.iter().map(|r| r.text.as_str()).collect();
    let test_texts: Vec<&str> = test.iter().map(|r| r.text.as_str()).collect();

    let vectorizer = TfidfVectorizer::fit(&train_texts, params.max_features)?;
    let columns = feature_column_names(vectorizer.n_features());

    let train_matrix = FeatureMatrix::new(
        columns.clone(),
        vectorizer.transform(&train_texts),
        train.iter().map(|r| r.label).collect(),
    )?;
    let test_matrix = FeatureMatrix::new(
        columns,
        vectorizer.transform(&test_texts),
        test.iter().map(|r| r.label).collect(),
    )?;

    Ok(FeatureSet {
        vectorizer,
        train: train_matrix,
        test: test_matrix,
    })
}

/// Outcome of a feature engineering run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureReport {
    pub vocabulary_size: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Run the feature engineering stage end to end
pub fn run_feature_engineering(params: &Params, layout: &ArtifactLayout) -> Result<FeatureReport> {
    let params = params.feature_engineering()?;

    let train = read_clean_records(&layout.interim_train())?;
    let test = read_clean_records(&layout.interim_test())?;

    let features = build_features(&train, &test, &params)?;

    let mut batch = ArtifactBatch::new();
    batch.stage_csv(&mut features.train.to_frame()?, &layout.features_train())?;
    batch.stage_csv(&mut features.test.to_frame()?, &layout.features_test())?;
    batch.stage_json(&features.vectorizer, &layout.vectorizer())?;
    batch.commit()?;

    let report = FeatureReport {
        vocabulary_size: features.vectorizer.n_features(),
        train_rows: features.train.n_rows(),
        test_rows: features.test.n_rows(),
    };
    info!(
        vocabulary = report.vocabulary_size,
        max_features = params.max_features,
        train_rows = report.train_rows,
        test_rows = report.test_rows,
        "wrote TF-IDF feature matrices"
    );
    Ok(report)
}
