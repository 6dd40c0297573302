//! Tests for random forest training

#[path = "common/mod.rs"]
mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::Project;
use rand::{Rng, SeedableRng};
use spamflow::error::PipelineError;
use spamflow::pipeline::features::feature_column_names;
use spamflow::pipeline::training::load_model;
use spamflow::pipeline::{
    run_feature_engineering, run_ingestion, run_model_building, run_model_building_with_progress,
    run_preprocessing, FeatureMatrix, Label, ModelParams, RandomForestModel,
};

fn prepare(project: &Project) {
    run_ingestion(&project.params(), &project.layout()).unwrap();
    run_preprocessing(&project.params(), &project.layout()).unwrap();
    run_feature_engineering(&project.params(), &project.layout()).unwrap();
}

/// Two noisy Gaussian-ish blobs in `n_features` dimensions
fn synthetic_matrix(n_rows: usize, n_features: usize, seed: u64) -> FeatureMatrix {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n_rows);
    let mut labels = Vec::with_capacity(n_rows);
    for i in 0..n_rows {
        let spam = i % 3 == 0;
        let shift = if spam { 0.6 } else { 0.0 };
        rows.push(
            (0..n_features)
                .map(|j| {
                    let signal = if j < 3 { shift } else { 0.0 };
                    signal + rng.gen::<f64>() * 0.5
                })
                .collect(),
        );
        labels.push(if spam { Label::Spam } else { Label::Ham });
    }
    FeatureMatrix::new(feature_column_names(n_features), rows, labels).unwrap()
}

#[test]
fn test_stage_saves_model() {
    let project = Project::new();
    prepare(&project);

    let report = run_model_building(&project.params(), &project.layout()).unwrap();
    assert_eq!(report.n_trees, 10);
    assert_eq!(report.train_rows, 8);

    let model = load_model(&project.layout()).unwrap();
    assert_eq!(model.trees().len(), 10);
    assert_eq!(model.params().random_state, 2);
    assert_eq!(model.n_features(), report.n_features);
}

#[test]
fn test_stage_reports_each_tree_to_caller() {
    let project = Project::new();
    prepare(&project);

    let fitted = AtomicUsize::new(0);
    let report = run_model_building_with_progress(&project.params(), &project.layout(), || {
        fitted.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    assert_eq!(fitted.load(Ordering::SeqCst), report.n_trees);
    assert_eq!(report.n_trees, 10);
}

#[test]
fn test_training_is_reproducible() {
    let a = Project::new();
    let b = Project::new();
    for project in [&a, &b] {
        prepare(project);
        run_model_building(&project.params(), &project.layout()).unwrap();
    }

    assert_eq!(
        common::read_text(&a.layout().model()),
        common::read_text(&b.layout().model())
    );
}

#[test]
fn test_seed_changes_model() {
    let matrix = synthetic_matrix(90, 9, 3);
    let a = RandomForestModel::fit(&matrix, &ModelParams::new(10, 1)).unwrap();
    let b = RandomForestModel::fit(&matrix, &ModelParams::new(10, 2)).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_forest_generalizes_on_synthetic_data() {
    let train = synthetic_matrix(300, 9, 11);
    let test = synthetic_matrix(150, 9, 12);
    let model = RandomForestModel::fit(&train, &ModelParams::new(25, 5)).unwrap();

    let (predicted, probs) = model.predict_batch(&test.rows);
    let correct = predicted.iter().zip(&test.labels).filter(|(p, a)| p == a).count();
    assert!(correct as f64 / test.n_rows() as f64 > 0.85);
    assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_hyperparameters_are_honored() {
    let matrix = synthetic_matrix(120, 6, 4);
    let params = ModelParams {
        max_depth: Some(2),
        bootstrap: false,
        ..ModelParams::new(5, 0)
    };
    let model = RandomForestModel::fit(&matrix, &params).unwrap();
    assert!(model.trees().iter().all(|t| t.depth() <= 3));
    assert_eq!(model.params(), &params);
}

#[test]
fn test_single_class_train_is_training_error() {
    let matrix = FeatureMatrix::new(
        feature_column_names(2),
        vec![vec![0.1, 0.2], vec![0.3, 0.4]],
        vec![Label::Spam, Label::Spam],
    )
    .unwrap();
    let err = RandomForestModel::fit(&matrix, &ModelParams::new(3, 0)).unwrap_err();
    assert!(matches!(err, PipelineError::Training(_)));
}

#[test]
fn test_missing_section_is_config_error() {
    let project = Project::new();
    prepare(&project);
    project.write_params("feature_engineering:\n  max_features: 50\n");

    let err = run_model_building(&project.params(), &project.layout()).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert!(!project.layout().model().exists());
}

#[test]
fn test_zero_estimators_is_config_error() {
    let project = Project::new();
    prepare(&project);
    let yaml = common::params_yaml(common::SOURCE).replace("n_estimators: 10", "n_estimators: 0");
    project.write_params(&yaml);

    let err = run_model_building(&project.params(), &project.layout()).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}
