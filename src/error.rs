//! Error taxonomy shared by every pipeline stage.
//!
//! Each stage-specific variant maps to one declared failure mode; the
//! remaining variants wrap lower-level library errors so `?` works across
//! polars, serde and the filesystem.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by the pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid or missing parameter.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source dataset unreachable, unreadable or malformed.
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// Malformed record during cleaning (strict policy only).
    #[error("Preprocessing error: {0}")]
    Preprocess(String),

    /// Empty input to vectorization.
    #[error("Feature engineering error: {0}")]
    Feature(String),

    /// Degenerate training data.
    #[error("Training error: {0}")]
    Training(String),

    /// Schema mismatch or empty test data.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data frame error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn data_load(msg: impl Into<String>) -> Self {
        Self::DataLoad(msg.into())
    }

    pub fn preprocess(msg: impl Into<String>) -> Self {
        Self::Preprocess(msg.into())
    }

    pub fn feature(msg: impl Into<String>) -> Self {
        Self::Feature(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
