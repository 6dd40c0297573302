//! Model building stage: fit the random forest on the train feature matrix

use tracing::{debug, info};

use super::artifacts::ArtifactLayout;
use super::features::FeatureMatrix;
use super::forest::RandomForestModel;
use super::loader::{read_json, write_json};
use super::params::Params;
use crate::error::Result;

/// Outcome of a model building run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub n_trees: usize,
    pub n_features: usize,
    pub train_rows: usize,
    /// Mean depth over all trees
    pub mean_depth: f64,
}

/// Run the model building stage end to end
pub fn run_model_building(params: &Params, layout: &ArtifactLayout) -> Result<TrainingReport> {
    run_model_building_with_progress(params, layout, || {})
}

/// Run the model building stage, reporting each fitted tree to `on_tree`
pub fn run_model_building_with_progress<F>(
    params: &Params,
    layout: &ArtifactLayout,
    on_tree: F,
) -> Result<TrainingReport>
where
    F: Fn() + Sync,
{
    let params = params.model_building()?;
    let matrix = FeatureMatrix::read_csv(&layout.features_train())?;

    info!(
        rows = matrix.n_rows(),
        features = matrix.n_features(),
        n_estimators = params.n_estimators,
        random_state = params.random_state,
        "training random forest"
    );
    let model = RandomForestModel::fit_with_progress(&matrix, &params, on_tree)?;
    write_json(&model, &layout.model())?;

    let depths: Vec<usize> = model.trees().iter().map(|t| t.depth()).collect();
    let mean_depth = depths.iter().sum::<usize>() as f64 / depths.len().max(1) as f64;

    let mut ranked: Vec<(usize, f64)> =
        model.feature_importances().into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(5);
    debug!(top_features = ?ranked, "feature importances");

    let report = TrainingReport {
        n_trees: model.trees().len(),
        n_features: model.n_features(),
        train_rows: matrix.n_rows(),
        mean_depth,
    };
    info!(trees = report.n_trees, mean_depth = report.mean_depth, "saved model");
    Ok(report)
}

/// Load a model written by [`run_model_building`]
pub fn load_model(layout: &ArtifactLayout) -> Result<RandomForestModel> {
    read_json(&layout.model())
}
