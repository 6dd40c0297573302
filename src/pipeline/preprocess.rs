//! Preprocessing stage: label encoding, text normalization, deduplication

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::artifacts::ArtifactLayout;
use super::loader::{clean_records_to_frame, read_raw_records, ArtifactBatch};
use super::params::{Params, PreprocessParams};
use super::records::{CleanRecord, RawRecord};
use super::target::{analyze_labels, count_mapped_records, InvalidRecordPolicy, LabelAnalysis};
use super::text::clean_text;
use crate::error::{PipelineError, Result};

/// Cleaned records of one split plus what was removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessOutcome {
    pub records: Vec<CleanRecord>,
    /// Records skipped under the lenient policy
    pub skipped: usize,
    /// Records removed as duplicates of an earlier cleaned text
    pub duplicates: usize,
}

/// Row counts for both splits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessReport {
    pub train: PreprocessOutcome,
    pub test: PreprocessOutcome,
}

/// Encode labels and normalize text, one record at a time.
///
/// A record whose label cannot be encoded aborts under
/// [`InvalidRecordPolicy::Strict`] and is skipped under
/// [`InvalidRecordPolicy::Lenient`].
pub fn clean_records(
    records: &[RawRecord],
    params: &PreprocessParams,
) -> Result<(Vec<CleanRecord>, usize)> {
    let mapping = params.label_mapping();
    let mut cleaned = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for (row, record) in records.iter().enumerate() {
        let label = match mapping.encode(&record.label) {
            Some(label) => label,
            None => match params.on_invalid_record {
                InvalidRecordPolicy::Strict => {
                    return Err(PipelineError::preprocess(format!(
                        "Record {} has unmappable label {:?} (expected {:?} or {:?})",
                        row + 1,
                        record.label,
                        mapping.event_value,
                        mapping.non_event_value
                    )));
                }
                InvalidRecordPolicy::Lenient => {
                    warn!(
                        row = row + 1,
                        label = %record.label,
                        "skipping record with unmappable label"
                    );
                    skipped += 1;
                    continue;
                }
            },
        };
        cleaned.push(CleanRecord::new(clean_text(&record.text), label));
    }

    Ok((cleaned, skipped))
}

/// Drop records whose cleaned text already appeared, keeping the first.
///
/// Returns the surviving records and the number removed.
pub fn deduplicate(records: Vec<CleanRecord>) -> (Vec<CleanRecord>, usize) {
    let before = records.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(before);
    let kept: Vec<CleanRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.text.clone()))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Clean and deduplicate one split
pub fn preprocess(records: &[RawRecord], params: &PreprocessParams) -> Result<PreprocessOutcome> {
    let mapping = params.label_mapping();
    if let LabelAnalysis::Unmapped { unknown_values } = analyze_labels(records, &mapping) {
        warn!(
            policy = ?params.on_invalid_record,
            "label values outside the mapping: {:?}",
            unknown_values
        );
    }
    let (spam, ham, unmapped) = count_mapped_records(records, &mapping);
    debug!(spam, ham, unmapped, "label counts before cleaning");

    let (cleaned, skipped) = clean_records(records, params)?;
    let (records, duplicates) = deduplicate(cleaned);
    Ok(PreprocessOutcome {
        records,
        skipped,
        duplicates,
    })
}

/// Run the preprocessing stage end to end. Train and test are deduplicated
/// independently of each other.
pub fn run_preprocessing(params: &Params, layout: &ArtifactLayout) -> Result<PreprocessReport> {
    let params = params.preprocessing()?;

    let train_raw = read_raw_records(&layout.raw_train())?;
    let test_raw = read_raw_records(&layout.raw_test())?;

    // Both splits are cleaned before anything is written
    let train = preprocess(&train_raw, &params)?;
    let test = preprocess(&test_raw, &params)?;

    let mut batch = ArtifactBatch::new();
    batch.stage_csv(&mut clean_records_to_frame(&train.records)?, &layout.interim_train())?;
    batch.stage_csv(&mut clean_records_to_frame(&test.records)?, &layout.interim_test())?;
    batch.commit()?;

    info!(
        train = train.records.len(),
        train_duplicates = train.duplicates,
        test = test.records.len(),
        test_duplicates = test.duplicates,
        skipped = train.skipped + test.skipped,
        "wrote cleaned splits"
    );

    Ok(PreprocessReport { train, test })
}
