//! Pipeline module - the five stages and the plumbing between them

pub mod artifacts;
pub mod evaluation;
pub mod features;
pub mod forest;
pub mod ingestion;
pub mod loader;
pub mod params;
pub mod preprocess;
pub mod records;
pub mod stemmer;
pub mod target;
pub mod text;
pub mod tfidf;
pub mod training;

pub use artifacts::{render_pipeline_declaration, ArtifactLayout, Stage, StageContract};
pub use evaluation::{evaluate, run_model_evaluation, ConfusionMatrix, Metrics};
pub use features::{build_features, run_feature_engineering, FeatureMatrix, FeatureReport};
pub use forest::RandomForestModel;
pub use ingestion::{run_ingestion, split_records, IngestionReport};
pub use params::{FeatureParams, IngestionParams, ModelParams, Params, PreprocessParams};
pub use preprocess::{preprocess, run_preprocessing, PreprocessReport};
pub use records::{CleanRecord, Label, RawRecord, SplitDataset};
pub use target::{InvalidRecordPolicy, LabelMapping};
pub use tfidf::TfidfVectorizer;
pub use training::{run_model_building, run_model_building_with_progress, TrainingReport};

use crate::error::Result;

/// What a single stage reported when it finished
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Ingestion(IngestionReport),
    Preprocessing(PreprocessReport),
    FeatureEngineering(FeatureReport),
    ModelBuilding(TrainingReport),
    ModelEvaluation(Metrics),
}

/// Run one stage against the artifacts under `layout`
pub fn run_stage(stage: Stage, params: &Params, layout: &ArtifactLayout) -> Result<StageOutcome> {
    run_stage_with_progress(stage, params, layout, || {})
}

/// Run one stage; model building calls `on_tree` after each fitted tree
pub fn run_stage_with_progress<F>(
    stage: Stage,
    params: &Params,
    layout: &ArtifactLayout,
    on_tree: F,
) -> Result<StageOutcome>
where
    F: Fn() + Sync,
{
    Ok(match stage {
        Stage::Ingestion => StageOutcome::Ingestion(run_ingestion(params, layout)?),
        Stage::Preprocessing => StageOutcome::Preprocessing(run_preprocessing(params, layout)?),
        Stage::FeatureEngineering => {
            StageOutcome::FeatureEngineering(run_feature_engineering(params, layout)?)
        }
        Stage::ModelBuilding => {
            StageOutcome::ModelBuilding(run_model_building_with_progress(params, layout, on_tree)?)
        }
        Stage::ModelEvaluation => StageOutcome::ModelEvaluation(run_model_evaluation(layout)?),
    })
}

/// Run every stage in order, stopping at the first failure
pub fn run_all(params: &Params, layout: &ArtifactLayout) -> Result<Vec<StageOutcome>> {
    Stage::ALL
        .iter()
        .map(|&stage| run_stage(stage, params, layout))
        .collect()
}
