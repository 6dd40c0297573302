//! Ingestion stage: load the raw dataset and split it into train/test

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use super::artifacts::ArtifactLayout;
use super::loader::{load_raw_records, raw_records_to_frame, ArtifactBatch};
use super::params::{IngestionParams, Params};
use super::records::{RawRecord, SplitDataset};
use super::target::label_distribution;
use crate::error::{PipelineError, Result};

/// Outcome of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub total: usize,
    pub train: usize,
    pub test: usize,
}

/// Number of test records for a split: `ceil(test_size * n)`
pub fn test_count(n: usize, test_size: f64) -> usize {
    (test_size * n as f64).ceil() as usize
}

/// Partition records into train/test with a seeded shuffle.
///
/// The shuffled order is kept inside each split. Both splits must end up
/// non-empty.
pub fn split_records(records: Vec<RawRecord>, test_size: f64, seed: u64) -> Result<SplitDataset> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::config(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    if records.is_empty() {
        return Err(PipelineError::data_load("Cannot split an empty dataset"));
    }

    let n = records.len();
    let n_test = test_count(n, test_size);
    if n_test >= n {
        return Err(PipelineError::config(format!(
            "test_size {} leaves no training records out of {}",
            test_size, n
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut slots: Vec<Option<RawRecord>> = records.into_iter().map(Some).collect();
    let mut take = |idx: &usize| slots[*idx].take();

    let n_train = n - n_test;
    let train: Vec<RawRecord> = order[..n_train].iter().filter_map(&mut take).collect();
    let test: Vec<RawRecord> = order[n_train..].iter().filter_map(&mut take).collect();

    Ok(SplitDataset { train, test })
}

/// Load the configured source and split it
pub fn ingest(params: &IngestionParams, layout: &ArtifactLayout) -> Result<SplitDataset> {
    let records = load_raw_records(
        &params.source,
        layout.root(),
        &params.text_column,
        &params.label_column,
    )?;
    info!(source = %params.source, records = records.len(), "loaded source dataset");

    let distribution = label_distribution(&records);
    if distribution.len() != 2 {
        warn!(
            classes = distribution.len(),
            "expected exactly two label values in source, found {:?}",
            distribution.keys().collect::<Vec<_>>()
        );
    }

    split_records(records, params.test_size, params.random_state)
}

/// Run the ingestion stage end to end: load, split, write both splits
pub fn run_ingestion(params: &Params, layout: &ArtifactLayout) -> Result<IngestionReport> {
    let params = params.ingestion()?;
    let split = ingest(&params, layout)?;

    let mut batch = ArtifactBatch::new();
    batch.stage_csv(&mut raw_records_to_frame(&split.train)?, &layout.raw_train())?;
    batch.stage_csv(&mut raw_records_to_frame(&split.test)?, &layout.raw_test())?;
    batch.commit()?;

    let report = IngestionReport {
        total: split.train.len() + split.test.len(),
        train: split.train.len(),
        test: split.test.len(),
    };
    info!(train = report.train, test = report.test, "wrote train/test splits");
    Ok(report)
}
