//! Tests for the ingestion stage

#[path = "common/mod.rs"]
mod common;

use std::collections::HashMap;

use common::{Project, HAM_COUNT, SPAM_COUNT, SPAM_CSV};
use spamflow::error::PipelineError;
use spamflow::pipeline::loader::{load_raw_records, read_raw_records};
use spamflow::pipeline::run_ingestion;

fn label_counts(records: &[spamflow::pipeline::RawRecord]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for r in records {
        *counts.entry(r.label.clone()).or_insert(0) += 1;
    }
    counts
}

#[test]
fn test_ingestion_writes_split_files() {
    let project = Project::new();
    let report = run_ingestion(&project.params(), &project.layout()).unwrap();

    assert_eq!(report.total, 10);
    assert_eq!(report.train, 8);
    assert_eq!(report.test, 2);

    let train = read_raw_records(&project.layout().raw_train()).unwrap();
    let test = read_raw_records(&project.layout().raw_test()).unwrap();
    assert_eq!(train.len(), 8);
    assert_eq!(test.len(), 2);

    // Canonical column names only
    let header = common::read_text(&project.layout().raw_train());
    assert!(header.starts_with("text,target"));
}

#[test]
fn test_split_is_a_partition_of_the_source() {
    let project = Project::new();
    run_ingestion(&project.params(), &project.layout()).unwrap();

    let mut all = read_raw_records(&project.layout().raw_train()).unwrap();
    all.extend(read_raw_records(&project.layout().raw_test()).unwrap());

    let mut source = load_raw_records(common::SOURCE, project.root(), "v2", "v1").unwrap();
    let key = |r: &spamflow::pipeline::RawRecord| (r.text.clone(), r.label.clone());
    all.sort_by_key(key);
    source.sort_by_key(key);
    assert_eq!(all, source);

    let counts = label_counts(&all);
    assert_eq!(counts["ham"], HAM_COUNT);
    assert_eq!(counts["spam"], SPAM_COUNT);
}

#[test]
fn test_same_seed_gives_identical_files() {
    let a = Project::new();
    let b = Project::new();
    run_ingestion(&a.params(), &a.layout()).unwrap();
    run_ingestion(&b.params(), &b.layout()).unwrap();

    assert_eq!(
        common::read_text(&a.layout().raw_test()),
        common::read_text(&b.layout().raw_test())
    );
    assert_eq!(
        common::read_text(&a.layout().raw_train()),
        common::read_text(&b.layout().raw_train())
    );
}

#[test]
fn test_missing_source_is_data_load_error() {
    let project = Project::new();
    std::fs::remove_file(project.root().join(common::SOURCE)).unwrap();

    let err = run_ingestion(&project.params(), &project.layout()).unwrap_err();
    assert!(matches!(err, PipelineError::DataLoad(_)), "got {:?}", err);
    assert!(!project.layout().raw_train().exists());
}

#[test]
fn test_missing_label_column_is_data_load_error() {
    let csv = SPAM_CSV.replacen("v1,v2", "label,v2", 1);
    let project = Project::with_dataset(csv.as_bytes());

    let err = run_ingestion(&project.params(), &project.layout()).unwrap_err();
    match err {
        PipelineError::DataLoad(msg) => assert!(msg.contains("v1")),
        other => panic!("expected DataLoad, got {:?}", other),
    }
}

#[test]
fn test_custom_column_mapping() {
    let csv = SPAM_CSV.replacen("v1,v2", "category,message", 1);
    let project = Project::with_dataset(csv.as_bytes());
    project.write_params(
        "data_ingestion:\n  source: data/spam.csv\n  test_size: 0.3\n  random_state: 1\n  text_column: message\n  label_column: category\n",
    );

    let report = run_ingestion(&project.params(), &project.layout()).unwrap();
    assert_eq!(report.test, 3);
    assert_eq!(report.train, 7);
}

#[test]
fn test_latin1_source_is_decoded() {
    let mut bytes = b"v1,v2\nham,see you later\nspam,Win \xa3100 now\nham,ok\n".to_vec();
    bytes.extend_from_slice(b"spam,free prize\n");
    let project = Project::with_dataset(&bytes);

    let records = load_raw_records(common::SOURCE, project.root(), "v2", "v1").unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records[1].text, "Win £100 now");
}

#[test]
fn test_invalid_test_size_is_config_error() {
    let project = Project::new();
    project.write_params(
        "data_ingestion:\n  source: data/spam.csv\n  test_size: 1.5\n  random_state: 1\n",
    );

    let err = run_ingestion(&project.params(), &project.layout()).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn test_header_only_source_is_data_load_error() {
    let project = Project::with_dataset(b"v1,v2\n");
    let err = run_ingestion(&project.params(), &project.layout()).unwrap_err();
    assert!(matches!(err, PipelineError::DataLoad(_)));
}

#[test]
fn test_failed_write_leaves_no_split_behind() {
    let project = Project::new();
    let layout = project.layout();
    // A directory where the test split belongs blocks the final rename
    std::fs::create_dir_all(layout.raw_test()).unwrap();

    assert!(run_ingestion(&project.params(), &layout).is_err());
    assert!(!layout.raw_train().exists());
}
